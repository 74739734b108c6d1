//! Relationships handling for OPC packages
//!
//! Parses and generates `.rels` files. In memory, internal targets are
//! package-rooted; the wire form is relative to the source part.

use crate::error::Result;
use crate::opc::part_uri::{relative_target, resolve_target};
use crate::xml;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;

/// A single relationship
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target: package-rooted for internal targets, verbatim for external ones
    pub target: String,
    /// Target mode
    pub target_mode: TargetMode,
}

impl Relationship {
    /// Whether the target is outside the package
    pub fn is_external(&self) -> bool {
        self.target_mode == TargetMode::External
    }
}

/// Target mode for relationships
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Internal target (part within the package)
    #[default]
    Internal,
    /// External target (hyperlink, etc.)
    External,
}

/// Relationships of one source, in document order
#[derive(Clone, Debug, Default)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    /// Create empty relationships
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Parse a `.rels` payload, resolving internal targets against `source`
    pub fn from_xml(data: &[u8], source: &str) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut rels = Self::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) => {
                    if e.name().local_name().as_ref() == b"Relationship" {
                        if let Some(mut rel) = parse_relationship(&e) {
                            if !rel.is_external() {
                                match resolve_target(source, &rel.target) {
                                    Ok(target) => rel.target = target,
                                    Err(_) => log::warn!(
                                        "cannot resolve target '{}' of {} from '{}'",
                                        rel.target,
                                        rel.id,
                                        source
                                    ),
                                }
                            }
                            rels.add_relationship(rel);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Serialize to `.rels` bytes with targets relative to `source`
    pub fn to_xml_bytes(&self, source: &str) -> Result<Vec<u8>> {
        xml::write_part(|w| self.write_to(w, source))
    }

    /// Write the `Relationships` element
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>, source: &str) -> Result<()> {
        let mut rels_elem = BytesStart::new("Relationships");
        rels_elem.push_attribute(("xmlns", xml::PR));
        writer.write_event(Event::Start(rels_elem))?;

        for rel in &self.items {
            let target = if rel.is_external() {
                rel.target.clone()
            } else {
                relative_target(source, &rel.target)
            };

            let mut rel_elem = BytesStart::new("Relationship");
            rel_elem.push_attribute(("Id", rel.id.as_str()));
            rel_elem.push_attribute(("Type", rel.rel_type.as_str()));
            rel_elem.push_attribute(("Target", target.as_str()));
            if rel.is_external() {
                rel_elem.push_attribute(("TargetMode", "External"));
            }
            writer.write_event(Event::Empty(rel_elem))?;
        }

        writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
        Ok(())
    }

    /// Get a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Get a relationship by type (returns first match)
    pub fn by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// Get all relationships of a given type
    pub fn all_by_type(&self, rel_type: &str) -> Vec<&Relationship> {
        self.items.iter().filter(|r| r.rel_type == rel_type).collect()
    }

    /// First relationship of a type pointing at an internal target
    pub fn by_type_and_target(&self, rel_type: &str, target: &str) -> Option<&Relationship> {
        self.items
            .iter()
            .find(|r| r.rel_type == rel_type && r.target == target)
    }

    /// Add a relationship (auto-generates ID)
    pub fn add(&mut self, rel_type: &str, target: &str, mode: TargetMode) -> String {
        let id = self.next_id();
        self.add_with_id(&id, rel_type, target, mode);
        id
    }

    /// Add a relationship with a specific ID, replacing any relationship with that ID
    pub fn add_with_id(&mut self, id: &str, rel_type: &str, target: &str, mode: TargetMode) {
        self.add_relationship(Relationship {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            target_mode: mode,
        });
    }

    fn add_relationship(&mut self, rel: Relationship) {
        match self.items.iter_mut().find(|r| r.id == rel.id) {
            Some(existing) => *existing = rel,
            None => self.items.push(rel),
        }
    }

    /// Remove a relationship by ID
    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let pos = self.items.iter().position(|r| r.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Remove every relationship whose internal target is `target`
    pub fn remove_targeting(&mut self, target: &str) -> usize {
        let before = self.items.len();
        self.items
            .retain(|r| r.is_external() || r.target != target);
        before - self.items.len()
    }

    /// Next unused ID of the form `rId<n>`: one past the largest numeric suffix
    pub fn next_id(&self) -> String {
        let max_id = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max_id.saturating_add(1))
    }

    /// Iterate over all relationships
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// All relationship collections of a package, keyed by source URI ("" = package)
#[derive(Clone, Debug, Default)]
pub struct RelationshipGraph {
    sources: BTreeMap<String, Relationships>,
}

impl RelationshipGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Relationships of a source, if any were ever recorded
    pub fn get(&self, source: &str) -> Option<&Relationships> {
        self.sources.get(source)
    }

    /// Relationships of a source, created on demand
    pub fn get_or_create(&mut self, source: &str) -> &mut Relationships {
        self.sources.entry(source.to_string()).or_default()
    }

    /// Install a parsed collection for a source
    pub fn insert(&mut self, source: &str, rels: Relationships) {
        self.sources.insert(source.to_string(), rels);
    }

    /// Add a relationship with the next unused ID
    pub fn add(&mut self, source: &str, rel_type: &str, target: &str, mode: TargetMode) -> String {
        self.get_or_create(source).add(rel_type, target, mode)
    }

    /// Add a relationship with a fixed ID (replaces on collision)
    pub fn add_with_id(
        &mut self,
        source: &str,
        id: &str,
        rel_type: &str,
        target: &str,
        mode: TargetMode,
    ) {
        self.get_or_create(source)
            .add_with_id(id, rel_type, target, mode);
    }

    /// Remove a relationship
    pub fn remove(&mut self, source: &str, id: &str) -> Option<Relationship> {
        self.sources.get_mut(source)?.remove(id)
    }

    /// Find all relationships of a type from a source
    pub fn find_by_type(&self, source: &str, rel_type: &str) -> Vec<&Relationship> {
        self.sources
            .get(source)
            .map(|rels| rels.all_by_type(rel_type))
            .unwrap_or_default()
    }

    /// Find a relationship by ID
    pub fn find_by_id(&self, source: &str, id: &str) -> Option<&Relationship> {
        self.sources.get(source)?.get(id)
    }

    /// Drop the collection owned by a source and every edge pointing at it
    pub fn forget_part(&mut self, uri: &str) {
        self.sources.remove(uri);
        for rels in self.sources.values_mut() {
            rels.remove_targeting(uri);
        }
    }

    /// Iterate over (source, relationships) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Relationships)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drop every collection
    pub(crate) fn clear(&mut self) {
        self.sources.clear();
    }
}

fn parse_relationship(element: &BytesStart) -> Option<Relationship> {
    let mut id = None;
    let mut rel_type = None;
    let mut target = None;
    let mut target_mode = TargetMode::Internal;

    for attr in element.attributes().flatten() {
        let value = xml::attr_value(&attr);
        match attr.key.local_name().as_ref() {
            b"Id" => id = Some(value),
            b"Type" => rel_type = Some(value),
            b"Target" => target = Some(value),
            b"TargetMode" => {
                if value.eq_ignore_ascii_case("External") {
                    target_mode = TargetMode::External;
                }
            }
            _ => {}
        }
    }

    match (id, rel_type, target) {
        (Some(id), Some(rel_type), Some(target)) => Some(Relationship {
            id,
            rel_type,
            target,
            target_mode,
        }),
        _ => {
            log::warn!("skipping relationship without Id, Type or Target");
            None
        }
    }
}

/// Well-known relationship types
pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const SETTINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
    pub const NUMBERING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    pub const FONT_TABLE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/fontTable";
    pub const WEB_SETTINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/webSettings";
    pub const FOOTNOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footnotes";
    pub const ENDNOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/endnotes";
    pub const HEADER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
    pub const FOOTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
    pub const COMMENTS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
    pub const COMMENTS_EXTENDED: &str =
        "http://schemas.microsoft.com/office/2011/relationships/commentsExtended";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const HYPERLINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const CHART: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
    pub const DRAWING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
    pub const VML_DRAWING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing";
    pub const DIAGRAM_DATA: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramData";
    pub const DIAGRAM_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramLayout";
    pub const DIAGRAM_STYLE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramQuickStyle";
    pub const DIAGRAM_COLORS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramColors";
    pub const DIAGRAM_DRAWING: &str =
        "http://schemas.microsoft.com/office/2007/relationships/diagramDrawing";

    // SpreadsheetML
    pub const WORKSHEET: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
    pub const SHARED_STRINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
    pub const TABLE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/table";

    // PresentationML
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const NOTES_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    pub const NOTES_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
    pub const PRES_PROPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
    pub const VIEW_PROPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps";
    pub const MODERN_COMMENTS: &str =
        "http://schemas.microsoft.com/office/2018/10/relationships/comments";
    pub const AUTHORS: &str = "http://schemas.microsoft.com/office/2018/10/relationships/authors";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PKG_RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = Relationships::from_xml(PKG_RELS, "").unwrap();
        assert_eq!(rels.len(), 2);

        let r1 = rels.get("rId1").unwrap();
        assert_eq!(r1.target, "word/document.xml");
        assert_eq!(r1.target_mode, TargetMode::Internal);

        let r2 = rels.get("rId2").unwrap();
        assert_eq!(r2.target, "https://example.com/?a=1&b=2");
        assert_eq!(r2.target_mode, TargetMode::External);
    }

    #[test]
    fn test_targets_resolved_against_source() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table1.xml"/>
</Relationships>"#;
        let rels = Relationships::from_xml(xml, "xl/worksheets/sheet1.xml").unwrap();
        assert_eq!(rels.get("rId1").unwrap().target, "xl/tables/table1.xml");

        let out = String::from_utf8(rels.to_xml_bytes("xl/worksheets/sheet1.xml").unwrap()).unwrap();
        assert!(out.contains(r#"Target="../tables/table1.xml""#));
    }

    #[test]
    fn test_by_type() {
        let rels = Relationships::from_xml(PKG_RELS, "").unwrap();
        let doc = rels.by_type(rel_types::OFFICE_DOCUMENT).unwrap();
        assert_eq!(doc.target, "word/document.xml");
        assert_eq!(rels.all_by_type(rel_types::STYLES).len(), 0);
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let mut rels = Relationships::new();
        rels.add(rel_types::STYLES, "word/styles.xml", TargetMode::Internal);
        rels.add(rel_types::HYPERLINK, "https://example.com", TargetMode::External);

        let xml = rels.to_xml_bytes("word/document.xml").unwrap();
        let rels2 = Relationships::from_xml(&xml, "word/document.xml").unwrap();

        let ids: Vec<_> = rels2.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rId1", "rId2"]);
        assert_eq!(rels2.by_type(rel_types::STYLES).unwrap().target, "word/styles.xml");
    }

    #[test]
    fn test_auto_id_skips_loaded() {
        let mut rels = Relationships::new();
        rels.add_with_id("rId7", rel_types::STYLES, "word/styles.xml", TargetMode::Internal);
        rels.add_with_id("custom", rel_types::THEME, "word/theme/theme1.xml", TargetMode::Internal);

        assert_eq!(rels.add(rel_types::NUMBERING, "word/numbering.xml", TargetMode::Internal), "rId8");
    }

    #[test]
    fn test_add_with_id_replaces() {
        let mut rels = Relationships::new();
        rels.add_with_id("rId1", rel_types::STYLES, "a.xml", TargetMode::Internal);
        rels.add_with_id("rId1", rel_types::THEME, "b.xml", TargetMode::Internal);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels.get("rId1").unwrap().target, "b.xml");
    }

    #[test]
    fn test_graph_operations() {
        let mut graph = RelationshipGraph::new();
        let id = graph.add("", rel_types::OFFICE_DOCUMENT, "word/document.xml", TargetMode::Internal);
        graph.add("word/document.xml", rel_types::STYLES, "word/styles.xml", TargetMode::Internal);

        assert_eq!(graph.find_by_id("", &id).unwrap().target, "word/document.xml");
        assert_eq!(graph.find_by_type("word/document.xml", rel_types::STYLES).len(), 1);
        assert!(graph.find_by_type("missing.xml", rel_types::STYLES).is_empty());

        graph.forget_part("word/styles.xml");
        assert!(graph.find_by_type("word/document.xml", rel_types::STYLES).is_empty());
        assert!(graph.remove("", &id).is_some());
    }
}
