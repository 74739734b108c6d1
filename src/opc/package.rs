//! OPC Package implementation
//!
//! Handles reading and writing OOXML files as ZIP packages

use crate::error::{Error, Result};
use crate::opc::container::{Container, ContainerWriter};
use crate::opc::part_uri::{normalize, rels_path_for, source_of_rels, well_known};
use crate::opc::relationships::rel_types;
use crate::opc::{
    AddMode, ContentTypes, Part, PartStore, PartUri, Relationship, RelationshipGraph,
    Relationships, TargetMode,
};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

static NO_RELATIONSHIPS: Relationships = Relationships::new();

const OCTET_STREAM: &str = "application/octet-stream";

/// An OPC package (ZIP-based container for DOCX, XLSX, PPTX, etc.)
#[derive(Debug)]
pub struct Package {
    /// All non-meta parts
    parts: PartStore,
    /// Content types ([Content_Types].xml)
    content_types: ContentTypes,
    /// Relationships of the package and every part
    relationships: RelationshipGraph,
    /// Parts were added or removed, or relationships edited, since loading
    modified: bool,
    closed: bool,
}

impl Package {
    /// Create a new empty package
    pub fn new() -> Self {
        Self {
            parts: PartStore::new(),
            content_types: ContentTypes::new(),
            relationships: RelationshipGraph::new(),
            modified: true,
            closed: false,
        }
    }

    /// Open a package from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut container = Container::open(path)?;
        Self::load(&mut container)
    }

    /// Open a package from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Open a package from a reader
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut container = Container::from_reader(reader)?;
        Self::load(&mut container)
    }

    fn load<R: Read + Seek>(container: &mut Container<R>) -> Result<Self> {
        let names = container.entry_names()?;
        let mut package = Self::new();

        // Step 1: [Content_Types].xml is mandatory
        let ct_name = names
            .iter()
            .find(|n| n.trim_start_matches('/').eq_ignore_ascii_case(well_known::CONTENT_TYPES))
            .ok_or_else(|| Error::Corrupted("missing [Content_Types].xml".into()))?
            .clone();
        package.content_types = ContentTypes::from_xml(&container.read(&ct_name)?)?;

        // Step 2: relationships and ordinary parts
        for name in names.iter().filter(|n| **n != ct_name) {
            let path = match normalize(name) {
                Ok(path) if !path.is_empty() => path,
                _ => {
                    log::warn!("skipping entry with unusable name '{}'", name);
                    continue;
                }
            };
            let data = container.read(name)?;

            if crate::opc::part_uri::is_rels_path(&path) {
                match source_of_rels(&path) {
                    Some(source) => {
                        let rels = Relationships::from_xml(&data, &source)?;
                        package.relationships.insert(&source, rels);
                    }
                    None => log::warn!("cannot infer source of '{}'", path),
                }
                continue;
            }

            let uri = PartUri::from_string_unchecked(path);
            let content_type = match package.content_types.content_type_of(&uri) {
                Some(ct) => ct.to_string(),
                None => {
                    log::warn!("no content type for '{}', using {}", uri, OCTET_STREAM);
                    package.content_types.add_override(&uri, OCTET_STREAM);
                    OCTET_STREAM.to_string()
                }
            };
            package.parts.insert_loaded(Part::new(uri, content_type, data));
        }
        package.modified = false;

        log::debug!(
            "opened package with {} parts and {} entries",
            package.parts.len(),
            names.len()
        );
        Ok(package)
    }

    /// Save the package to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.ensure_open()?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Save the package to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the package to a writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        self.ensure_open()?;
        let mut zip = ContainerWriter::new(writer);

        let mut content_types = self.content_types.clone();
        for part in self.parts.iter() {
            let ct = if part.content_type().is_empty() {
                OCTET_STREAM
            } else {
                part.content_type()
            };
            content_types.ensure(part.uri(), ct);
        }
        zip.write_entry(well_known::CONTENT_TYPES, &content_types.to_xml_bytes()?)?;

        // The package-level sidecar is always written
        let package_rels = self.relationships.get("").unwrap_or(&NO_RELATIONSHIPS);
        zip.write_entry(well_known::PACKAGE_RELS, &package_rels.to_xml_bytes("")?)?;

        for (source, rels) in self.relationships.iter() {
            if source.is_empty() || rels.is_empty() {
                continue;
            }
            zip.write_entry(&rels_path_for(source), &rels.to_xml_bytes(source)?)?;
        }

        for part in self.parts.iter() {
            zip.write_entry(part.uri().as_str(), part.data())?;
        }

        zip.finish()?;
        log::debug!("saved package with {} parts", self.parts.len());
        Ok(())
    }

    /// Close the package. Idempotent; later operations fail with [`Error::Closed`]
    pub fn close(&mut self) {
        if !self.closed {
            self.parts.clear();
            self.relationships.clear();
            self.closed = true;
            log::debug!("package closed");
        }
    }

    /// Whether anything changed since the package was read; always true for a new package
    pub fn is_modified(&self) -> bool {
        self.modified || self.parts.iter().any(Part::is_modified)
    }

    /// Whether the package was closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Fail with [`Error::Closed`] once closed
    pub fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    // === Parts ===

    /// Get a part by URI
    pub fn get_part(&self, uri: &str) -> Result<&Part> {
        self.ensure_open()?;
        let uri = PartUri::new(uri)?;
        self.parts
            .get(&uri)
            .ok_or_else(|| Error::PartNotFound(uri.to_string()))
    }

    /// Get a mutable part by URI
    pub fn get_part_mut(&mut self, uri: &str) -> Result<&mut Part> {
        self.ensure_open()?;
        let uri = PartUri::new(uri)?;
        self.parts
            .get_mut(&uri)
            .ok_or_else(|| Error::PartNotFound(uri.to_string()))
    }

    /// Check whether a part exists
    pub fn part_exists(&self, uri: &str) -> bool {
        match PartUri::new(uri) {
            Ok(uri) => !self.closed && self.parts.exists(&uri),
            Err(_) => false,
        }
    }

    /// Add a part and register its content type
    pub fn add_part(
        &mut self,
        uri: &str,
        content_type: &str,
        data: Vec<u8>,
        mode: AddMode,
    ) -> Result<PartUri> {
        self.ensure_open()?;
        if content_type.is_empty() {
            return Err(Error::InvalidValue(format!("empty content type for '{}'", uri)));
        }
        let uri = PartUri::new(uri)?;
        self.parts.add(uri.clone(), content_type, data, mode)?;
        self.content_types.ensure(&uri, content_type);
        self.modified = true;
        log::debug!("added part {} ({})", uri, content_type);
        Ok(uri)
    }

    /// Replace the payload of an existing part
    pub fn set_part_data(&mut self, uri: &str, data: Vec<u8>) -> Result<()> {
        self.get_part_mut(uri)?.set_data(data);
        Ok(())
    }

    /// Delete a part with its override, its own relationships and every edge to it
    pub fn delete_part(&mut self, uri: &str) -> Result<Part> {
        self.ensure_open()?;
        let uri = PartUri::new(uri)?;
        let part = self
            .parts
            .delete(&uri)
            .ok_or_else(|| Error::PartNotFound(uri.to_string()))?;
        self.content_types.remove_override(&uri);
        self.relationships.forget_part(uri.as_str());
        self.modified = true;
        log::debug!("deleted part {}", uri);
        Ok(part)
    }

    /// Delete a part and, recursively, every internal target no other part still references
    pub fn delete_part_tree(&mut self, uri: &str) -> Result<()> {
        if !self.part_exists(uri) {
            return Ok(());
        }
        let targets: Vec<String> = self
            .relationships_of(uri)?
            .iter()
            .filter(|r| !r.is_external())
            .map(|r| r.target.clone())
            .collect();
        self.delete_part(uri)?;
        for target in targets {
            let referenced = self
                .relationships
                .iter()
                .any(|(_, rels)| rels.iter().any(|r| !r.is_external() && r.target == target));
            if !referenced {
                self.delete_part_tree(&target)?;
            }
        }
        Ok(())
    }

    /// Iterate over all parts in URI order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    /// Next free part name of the form `<prefix><N>.<ext>`, N one past the largest in use
    pub fn next_part_name(&self, prefix: &str, ext: &str) -> String {
        let suffix = format!(".{}", ext);
        let max = self
            .parts
            .iter()
            .filter_map(|p| {
                p.uri()
                    .as_str()
                    .strip_prefix(prefix)?
                    .strip_suffix(suffix.as_str())?
                    .parse::<u32>()
                    .ok()
            })
            .max()
            .unwrap_or(0);
        format!("{}{}{}", prefix, max.saturating_add(1), suffix)
    }

    /// Get content types
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Get mutable content types
    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    /// Content type of a part, from the registry
    pub fn content_type_of(&self, uri: &str) -> Option<&str> {
        let uri = PartUri::new(uri).ok()?;
        self.content_types.content_type_of(&uri)
    }

    // === Relationships ===

    /// Relationships of a source ("" = package)
    pub fn relationships_of(&self, source: &str) -> Result<&Relationships> {
        self.ensure_open()?;
        Ok(self.relationships.get(source).unwrap_or(&NO_RELATIONSHIPS))
    }

    /// Mutable relationships of a source, created on demand
    pub fn relationships_of_mut(&mut self, source: &str) -> Result<&mut Relationships> {
        self.ensure_open()?;
        Ok(self.relationships.get_or_create(source))
    }

    /// The whole relationship graph
    pub fn relationship_graph(&self) -> &RelationshipGraph {
        &self.relationships
    }

    /// Add a relationship; internal targets must name an existing part
    pub fn add_relationship(
        &mut self,
        source: &str,
        rel_type: &str,
        target: &str,
        mode: TargetMode,
    ) -> Result<String> {
        self.ensure_open()?;
        let target = self.check_target(target, mode)?;
        let id = self.relationships.add(source, rel_type, &target, mode);
        self.modified = true;
        log::debug!("added relationship {} from '{}' to {}", id, source, target);
        Ok(id)
    }

    /// Add a relationship with a fixed ID, replacing on collision
    pub fn add_relationship_with_id(
        &mut self,
        source: &str,
        id: &str,
        rel_type: &str,
        target: &str,
        mode: TargetMode,
    ) -> Result<()> {
        self.ensure_open()?;
        if id.is_empty() {
            return Err(Error::InvalidValue("empty relationship id".into()));
        }
        let target = self.check_target(target, mode)?;
        self.relationships
            .add_with_id(source, id, rel_type, &target, mode);
        self.modified = true;
        Ok(())
    }

    fn check_target(&self, target: &str, mode: TargetMode) -> Result<String> {
        if mode == TargetMode::External {
            return Ok(target.to_string());
        }
        let uri = PartUri::new(target)?;
        if !self.parts.exists(&uri) {
            return Err(Error::PartNotFound(uri.to_string()));
        }
        Ok(uri.as_str().to_string())
    }

    /// Remove a relationship
    pub fn remove_relationship(&mut self, source: &str, id: &str) -> Result<Relationship> {
        self.ensure_open()?;
        let rel = self
            .relationships
            .remove(source, id)
            .ok_or_else(|| Error::InvalidReference(format!("no relationship '{}' on '{}'", id, source)))?;
        self.modified = true;
        Ok(rel)
    }

    /// Remove a relationship and delete its target tree once nothing else points at it
    pub fn release_relationship(&mut self, source: &str, id: &str) -> Result<()> {
        let rel = self.remove_relationship(source, id)?;
        if rel.is_external() {
            return Ok(());
        }
        let referenced = self
            .relationships
            .iter()
            .any(|(_, rels)| rels.iter().any(|r| !r.is_external() && r.target == rel.target));
        if !referenced {
            self.delete_part_tree(&rel.target)?;
        }
        Ok(())
    }

    /// Relationships of a type from a source
    pub fn relationships_by_type(&self, source: &str, rel_type: &str) -> Result<Vec<&Relationship>> {
        self.ensure_open()?;
        Ok(self.relationships.find_by_type(source, rel_type))
    }

    /// Resolve an internal relationship to the part URI it targets
    pub fn related_part(&self, source: &str, id: &str) -> Result<PartUri> {
        self.ensure_open()?;
        let rel = self
            .relationships
            .find_by_id(source, id)
            .ok_or_else(|| Error::InvalidReference(format!("no relationship '{}' on '{}'", id, source)))?;
        if rel.is_external() {
            return Err(Error::InvalidReference(format!("relationship '{}' is external", id)));
        }
        PartUri::new(&rel.target)
    }

    /// First part reachable from `source` by a relationship of `rel_type`
    pub fn related_part_by_type(&self, source: &str, rel_type: &str) -> Option<PartUri> {
        self.relationships
            .find_by_type(source, rel_type)
            .into_iter()
            .filter(|r| !r.is_external())
            .find_map(|r| PartUri::new(&r.target).ok())
    }

    /// URI of the office document root
    pub fn main_document_uri(&self) -> Result<PartUri> {
        self.ensure_open()?;
        let uri = self
            .related_part_by_type("", rel_types::OFFICE_DOCUMENT)
            .ok_or_else(|| Error::Corrupted("missing officeDocument relationship".into()))?;
        if !self.parts.exists(&uri) {
            return Err(Error::Corrupted(format!("office document '{}' is missing", uri)));
        }
        Ok(uri)
    }

    /// Replace a part's payload, creating the part when absent
    pub fn put_part(&mut self, uri: &str, content_type: &str, data: Vec<u8>) -> Result<()> {
        if self.part_exists(uri) {
            self.set_part_data(uri, data)
        } else {
            self.add_part(uri, content_type, data, AddMode::Create).map(|_| ())
        }
    }

    /// Relationship ID from `source` to `target`, adding one when no edge of the type exists
    pub fn link_part(&mut self, source: &str, rel_type: &str, target: &str) -> Result<String> {
        let existing = self
            .relationships_of(source)?
            .by_type_and_target(rel_type, target)
            .map(|r| r.id.clone());
        match existing {
            Some(id) => Ok(id),
            None => self.add_relationship(source, rel_type, target, TargetMode::Internal),
        }
    }

    /// Parse the part `source` reaches by `rel_type`.
    ///
    /// A missing target or a parse failure is logged and reported as `None`.
    pub fn load_related<T>(
        &self,
        source: &str,
        rel_type: &str,
        parse: impl Fn(&[u8]) -> Result<T>,
    ) -> Option<T> {
        let uri = self.related_part_by_type(source, rel_type)?;
        let part = match self.get_part(uri.as_str()) {
            Ok(part) => part,
            Err(_) => {
                log::warn!("relationship target '{}' is missing", uri);
                return None;
            }
        };
        match parse(part.data()) {
            Ok(model) => Some(model),
            Err(e) => {
                log::warn!("ignoring unparseable part '{}': {}", uri, e);
                None
            }
        }
    }

    /// Check package-level invariants; the first violation is reported as `Corrupted`
    pub fn verify(&self) -> Result<()> {
        self.ensure_open()?;
        for (source, rels) in self.relationships.iter() {
            let mut seen = HashSet::new();
            for rel in rels.iter() {
                if !seen.insert(rel.id.as_str()) {
                    return Err(Error::Corrupted(format!(
                        "duplicate relationship id '{}' on '{}'",
                        rel.id, source
                    )));
                }
                if rel.is_external() {
                    continue;
                }
                let exists = PartUri::new(&rel.target)
                    .map(|uri| self.parts.exists(&uri))
                    .unwrap_or(false);
                if !exists {
                    return Err(Error::Corrupted(format!(
                        "relationship '{}' on '{}' targets missing part '{}'",
                        rel.id, source, rel.target
                    )));
                }
            }
        }
        for part in self.parts.iter() {
            if self.content_types.content_type_of(part.uri()).is_none() {
                return Err(Error::Corrupted(format!("no content type for '{}'", part.uri())));
            }
        }
        Ok(())
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::content_types;
    use pretty_assertions::assert_eq;

    fn sample() -> Package {
        let mut pkg = Package::new();
        pkg.add_part(
            "/word/document.xml",
            content_types::WORD_DOCUMENT,
            b"<?xml version=\"1.0\"?><document/>".to_vec(),
            AddMode::Create,
        )
        .unwrap();
        pkg.add_relationship("", rel_types::OFFICE_DOCUMENT, "word/document.xml", TargetMode::Internal)
            .unwrap();
        pkg
    }

    #[test]
    fn test_new_package() {
        let pkg = Package::new();
        assert_eq!(pkg.parts().count(), 0);
        assert!(pkg.relationships_of("").unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_empty() {
        let pkg = Package::new();
        let bytes = pkg.to_bytes().unwrap();

        let pkg2 = Package::from_bytes(&bytes).unwrap();
        assert_eq!(pkg2.parts().count(), 0);
    }

    #[test]
    fn test_roundtrip_with_parts() {
        let pkg = sample();
        let bytes = pkg.to_bytes().unwrap();
        let pkg2 = Package::from_bytes(&bytes).unwrap();

        assert!(pkg2.part_exists("word/document.xml"));
        assert_eq!(pkg2.main_document_uri().unwrap().as_str(), "word/document.xml");
        assert_eq!(
            pkg2.content_type_of("/word/document.xml"),
            Some(content_types::WORD_DOCUMENT)
        );
        pkg2.verify().unwrap();
    }

    #[test]
    fn test_relationship_to_missing_part_rejected() {
        let mut pkg = Package::new();
        let err = pkg
            .add_relationship("", rel_types::OFFICE_DOCUMENT, "word/document.xml", TargetMode::Internal)
            .unwrap_err();
        assert_eq!(err.code(), "part-not-found");
    }

    #[test]
    fn test_delete_part_removes_edges() {
        let mut pkg = sample();
        pkg.delete_part("word/document.xml").unwrap();
        assert!(pkg.relationships_of("").unwrap().is_empty());
        assert_eq!(pkg.content_type_of("word/document.xml"), Some(content_types::XML));
    }

    #[test]
    fn test_missing_content_types_is_corrupted() {
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()));
        writer.write_entry("word/document.xml", b"<a/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = Package::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.code(), "corrupted");
    }

    #[test]
    fn test_closed_package() {
        let mut pkg = sample();
        pkg.close();
        pkg.close();
        assert_eq!(pkg.get_part("word/document.xml").unwrap_err().code(), "closed");
        assert_eq!(pkg.to_bytes().unwrap_err().code(), "closed");
    }

    #[test]
    fn test_next_part_name() {
        let mut pkg = Package::new();
        assert_eq!(pkg.next_part_name("word/header", "xml"), "word/header1.xml");
        pkg.add_part("word/header3.xml", content_types::WORD_HEADER, Vec::new(), AddMode::Create)
            .unwrap();
        assert_eq!(pkg.next_part_name("word/header", "xml"), "word/header4.xml");
    }
}
