//! Presentation model - high-level API for PPTX decks

mod comments;
mod notes;
mod shape;
mod slide;
mod table;
mod template;
mod text;

pub use comments::SlideComment;
pub use shape::{Bounds, ShapeKind, SlideShape};
pub use slide::{Slide, SlideMut};
pub use table::{SlideTable, SlideTableMut, TableCell, TableCellMut};
pub use template::{DEFAULT_SLIDE_HEIGHT, DEFAULT_SLIDE_WIDTH};
pub use text::{
    Alignment, Bullet, ParagraphProperties, RunProperties, TextBody, TextContent, TextParagraph,
    TextRun,
};

use crate::drawing as dml;
use crate::error::{Error, Result};
use crate::opc::{
    content_types, rel_types, well_known, AddMode, CoreProperties, Package, Relationship, TargetMode,
};
use crate::xml::{self, RawXmlElement};
use comments::{AuthorList, CommentList};
use notes::NotesSlide;
use slide::SlidePart;
use std::path::Path;

/// Schema order of `p:presentation` children
const PRESENTATION_ORDER: &[&str] = &[
    "sldMasterIdLst",
    "notesMasterIdLst",
    "handoutMasterIdLst",
    "sldIdLst",
    "sldSz",
    "notesSz",
    "smartTags",
    "embeddedFontLst",
    "custShowLst",
    "photoAlbum",
    "custDataLst",
    "kinsoku",
    "defaultTextStyle",
    "modifyVerifier",
    "extLst",
];

/// Slide IDs below this are reserved
const FIRST_SLIDE_ID: u32 = 256;

const MIN_SLIDE_SIDE: i64 = 914_400;
const MAX_SLIDE_SIDE: i64 = 51_206_400;

/// Named slide sizes written as `sldSz type`
const SLIDE_SIZE_TYPES: &[(i64, i64, &str)] = &[
    (9_144_000, 6_858_000, "screen4x3"),
    (9_144_000, 5_143_500, "screen16x9"),
    (9_144_000, 5_715_000, "screen16x10"),
];

/// A slide master
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlideMaster {
    pub name: String,
    pub uri: String,
}

/// A slide layout and the master it belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlideLayout {
    pub name: String,
    pub uri: String,
    pub master: String,
}

/// `r:id` of `elem`, whatever prefix binds the relationships namespace
fn rel_id_of<'a>(elem: &'a RawXmlElement, root_prefix: &str) -> Option<&'a str> {
    let prefix = elem.declared_prefix(xml::R).unwrap_or(root_prefix);
    elem.attr(&format!("{}:id", prefix))
}

/// `p:cSld name` of a slide-like part
fn common_slide_name(root: &RawXmlElement) -> String {
    root.child("cSld")
        .and_then(|c| c.attr("name"))
        .unwrap_or("")
        .to_string()
}

/// A PPTX presentation
#[derive(Debug)]
pub struct Presentation {
    package: Package,
    /// Presentation part name
    uri: String,
    /// Presentation element; `sldIdLst` is rebuilt on save
    root: RawXmlElement,
    slides: Vec<SlidePart>,
    authors: Option<AuthorList>,
    /// `None` once the ID space is used up
    next_slide_id: Option<u32>,
    /// Write core properties on first save
    seed_core_properties: bool,
}

impl Presentation {
    /// An empty 16:9 deck with one master, one layout and a theme
    pub fn new() -> Result<Self> {
        let mut package = Package::new();
        let uri = well_known::PRESENTATION.to_string();
        let master = "ppt/slideMasters/slideMaster1.xml";
        let layout = "ppt/slideLayouts/slideLayout1.xml";
        let theme = "ppt/theme/theme1.xml";

        package.add_part(&uri, content_types::PRESENTATION, Vec::new(), AddMode::Create)?;
        package.add_relationship("", rel_types::OFFICE_DOCUMENT, &uri, TargetMode::Internal)?;

        package.add_part(theme, content_types::THEME, dml::theme_part("Office Theme")?, AddMode::Create)?;
        package.add_part(layout, content_types::SLIDE_LAYOUT, template::slide_layout()?, AddMode::Create)?;
        package.add_part(master, content_types::SLIDE_MASTER, Vec::new(), AddMode::Create)?;
        let layout_rel = package.add_relationship(master, rel_types::SLIDE_LAYOUT, layout, TargetMode::Internal)?;
        package.add_relationship(master, rel_types::THEME, theme, TargetMode::Internal)?;
        package.set_part_data(master, template::slide_master(&layout_rel)?)?;
        package.add_relationship(layout, rel_types::SLIDE_MASTER, master, TargetMode::Internal)?;

        let master_rel = package.add_relationship(&uri, rel_types::SLIDE_MASTER, master, TargetMode::Internal)?;
        for (part, content_type, rel_type, data) in [
            (
                "ppt/presProps.xml",
                content_types::PRES_PROPS,
                rel_types::PRES_PROPS,
                template::presentation_properties()?,
            ),
            (
                "ppt/viewProps.xml",
                content_types::VIEW_PROPS,
                rel_types::VIEW_PROPS,
                template::view_properties()?,
            ),
        ] {
            package.add_part(part, content_type, data, AddMode::Create)?;
            package.add_relationship(&uri, rel_type, part, TargetMode::Internal)?;
        }
        package.add_relationship(&uri, rel_types::THEME, theme, TargetMode::Internal)?;

        let root = template::presentation(&master_rel);
        package.set_part_data(&uri, root.to_xml_bytes()?)?;

        Ok(Presentation {
            package,
            uri,
            root,
            slides: Vec::new(),
            authors: None,
            next_slide_id: Some(FIRST_SLIDE_ID),
            seed_core_properties: true,
        })
    }

    /// Open a presentation from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let package = Package::open(path)?;
        Self::from_package(package)
    }

    /// Open a presentation from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        Self::from_package(package)
    }

    /// Create a presentation from an OPC package
    pub fn from_package(package: Package) -> Result<Self> {
        let uri = package.main_document_uri()?.as_str().to_string();
        let root = RawXmlElement::parse(package.get_part(&uri)?.data())?;
        if root.local_name() != "presentation" {
            return Err(Error::InvalidFormat(format!("expected presentation, found {}", root.name)));
        }
        let r = root.declared_prefix(xml::R).unwrap_or("r").to_string();

        let mut slides = Vec::new();
        for entry in root.child("sldIdLst").into_iter().flat_map(|l| l.elements()) {
            if entry.local_name() != "sldId" {
                continue;
            }
            let id = entry
                .attr("id")
                .and_then(|v| v.parse::<u32>().ok())
                .ok_or_else(|| Error::InvalidFormat("sldId without a numeric id".into()))?;
            let rel_id = rel_id_of(entry, &r)
                .ok_or_else(|| Error::Corrupted(format!("slide {} has no relationship id", id)))?;
            slides.push(load_slide(&package, &uri, id, rel_id)?);
        }

        let authors = match package.related_part_by_type(&uri, rel_types::AUTHORS) {
            Some(target) => package.load_related(&uri, rel_types::AUTHORS, |d| {
                AuthorList::parse(target.as_str(), d)
            }),
            None => None,
        };

        let next_slide_id = match slides.iter().map(|s| s.id).max() {
            Some(max) => max.checked_add(1).map(|id| id.max(FIRST_SLIDE_ID)),
            None => Some(FIRST_SLIDE_ID),
        };

        let deck = Presentation {
            package,
            uri,
            root,
            slides,
            authors,
            next_slide_id,
            seed_core_properties: false,
        };
        log::debug!("opened presentation '{}' with {} slides", deck.uri, deck.slides.len());
        Ok(deck)
    }

    /// Save to a file path
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.update_package()?;
        self.package.save(path)
    }

    /// Save to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.update_package()?;
        self.package.to_bytes()
    }

    /// Write every model back into its part
    fn update_package(&mut self) -> Result<()> {
        self.package.ensure_open()?;
        let uri = self.uri.clone();

        let notes_master = if self.slides.iter().any(|s| s.notes.is_some()) {
            Some(self.ensure_notes_master()?)
        } else {
            None
        };

        for slide in &self.slides {
            self.package
                .put_part(&slide.uri, content_types::SLIDE, slide.to_bytes()?)?;
            if let Some(notes) = &slide.notes {
                self.package
                    .put_part(notes.uri(), content_types::NOTES_SLIDE, notes.to_bytes()?)?;
                if let Some(master) = &notes_master {
                    self.package
                        .link_part(notes.uri(), rel_types::NOTES_MASTER, master)?;
                }
            }
            if let Some(comments) = &slide.comments {
                self.package
                    .put_part(comments.uri(), content_types::MODERN_COMMENTS, comments.to_bytes()?)?;
            }
        }
        if let Some(authors) = &self.authors {
            self.package
                .put_part(authors.uri(), content_types::AUTHORS, authors.to_bytes()?)?;
            self.package.link_part(&uri, rel_types::AUTHORS, authors.uri())?;
        }

        let data = self.presentation_bytes()?;
        self.package.put_part(&uri, content_types::PRESENTATION, data)?;
        if self.package.related_part_by_type("", rel_types::OFFICE_DOCUMENT).is_none() {
            self.package
                .add_relationship("", rel_types::OFFICE_DOCUMENT, &uri, TargetMode::Internal)?;
        }

        if self.seed_core_properties {
            if self
                .package
                .related_part_by_type("", rel_types::CORE_PROPERTIES)
                .is_none()
            {
                self.package
                    .set_core_properties(&CoreProperties::created_now(""))?;
            }
            self.seed_core_properties = false;
        }
        Ok(())
    }

    fn presentation_bytes(&self) -> Result<Vec<u8>> {
        let mut root = self.root.clone();
        let r = self.r_prefix();
        root.remove_children("sldIdLst");
        if !self.slides.is_empty() {
            let tag = self.tag("sldId");
            let mut list = RawXmlElement::new(self.tag("sldIdLst"));
            for slide in &self.slides {
                list.push_child(
                    RawXmlElement::new(tag.as_str())
                        .with_attr("id", slide.id.to_string())
                        .with_attr(format!("{}:id", r), slide.rel_id.as_str()),
                );
            }
            root.insert_child_ordered(list, PRESENTATION_ORDER);
        }
        root.to_xml_bytes()
    }

    /// Qualified name for a presentation element
    fn tag(&self, local: &str) -> String {
        match self.root.name.split_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    /// Prefix bound to the relationships namespace on the presentation element
    fn r_prefix(&self) -> String {
        self.root.declared_prefix(xml::R).unwrap_or("r").to_string()
    }

    /// Existing notes master, found through `notesMasterIdLst` or the relationship type
    fn notes_master_uri(&self) -> Option<String> {
        let r = self.r_prefix();
        self.root
            .descendant(&["notesMasterIdLst", "notesMasterId"])
            .and_then(|e| rel_id_of(e, &r))
            .and_then(|id| self.package.related_part(&self.uri, id).ok())
            .or_else(|| self.package.related_part_by_type(&self.uri, rel_types::NOTES_MASTER))
            .filter(|u| self.package.part_exists(u.as_str()))
            .map(|u| u.as_str().to_string())
    }

    /// Notes master part name, creating the master and its theme when missing
    fn ensure_notes_master(&mut self) -> Result<String> {
        if let Some(found) = self.notes_master_uri() {
            return Ok(found);
        }
        let master = self.package.next_part_name("ppt/notesMasters/notesMaster", "xml");
        self.package
            .add_part(&master, content_types::NOTES_MASTER, template::notes_master()?, AddMode::Create)?;
        let theme = self.package.next_part_name("ppt/theme/theme", "xml");
        self.package
            .add_part(&theme, content_types::THEME, dml::theme_part("Office Theme")?, AddMode::Create)?;
        self.package
            .add_relationship(&master, rel_types::THEME, &theme, TargetMode::Internal)?;
        let rel_id = self
            .package
            .add_relationship(&self.uri, rel_types::NOTES_MASTER, &master, TargetMode::Internal)?;

        let r = self.root.prefix_for(xml::R, "r");
        let list = RawXmlElement::new(self.tag("notesMasterIdLst")).with_child(
            RawXmlElement::new(self.tag("notesMasterId")).with_attr(format!("{}:id", r), rel_id),
        );
        self.root.remove_children("notesMasterIdLst");
        self.root.insert_child_ordered(list, PRESENTATION_ORDER);
        log::debug!("created notes master {}", master);
        Ok(master)
    }

    /// Close the presentation; later mutating and saving calls fail with [`Error::Closed`]
    pub fn close(&mut self) {
        self.package.close();
    }

    pub fn is_closed(&self) -> bool {
        self.package.is_closed()
    }

    /// Get the underlying package
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Read core properties
    pub fn core_properties(&self) -> Result<CoreProperties> {
        self.package.core_properties()
    }

    /// Replace core properties
    pub fn set_core_properties(&mut self, props: &CoreProperties) -> Result<()> {
        self.package.set_core_properties(props)?;
        self.seed_core_properties = false;
        Ok(())
    }

    // === Slides ===

    /// Fail unless `index` is a 1-based slide position
    fn check_index(&self, index: usize) -> Result<()> {
        if index == 0 || index > self.slides.len() {
            return Err(Error::InvalidIndex(format!(
                "slide {} out of range (have {})",
                index,
                self.slides.len()
            )));
        }
        Ok(())
    }

    fn take_slide_id(&mut self) -> Result<u32> {
        let id = self
            .next_slide_id
            .ok_or_else(|| Error::InvalidValue("no slide IDs left in presentation".into()))?;
        self.next_slide_id = id.checked_add(1);
        Ok(id)
    }

    fn handle(&mut self, position: usize) -> SlideMut<'_> {
        SlideMut::new(
            &mut self.slides[position],
            &mut self.package,
            &mut self.authors,
            &self.uri,
            position + 1,
        )
    }

    /// Slide at a 1-based position
    pub fn slide(&self, index: usize) -> Result<Slide<'_>> {
        self.check_index(index)?;
        Ok(Slide::new(&self.slides[index - 1], index, self.authors.as_ref()))
    }

    pub fn slide_mut(&mut self, index: usize) -> Result<SlideMut<'_>> {
        self.package.ensure_open()?;
        self.check_index(index)?;
        Ok(self.handle(index - 1))
    }

    pub fn slides(&self) -> Vec<Slide<'_>> {
        self.slides
            .iter()
            .enumerate()
            .map(|(i, s)| Slide::new(s, i + 1, self.authors.as_ref()))
            .collect()
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Append a slide using the layout at a zero-based position in [`Presentation::layouts`]
    pub fn add_slide(&mut self, layout_index: usize) -> Result<SlideMut<'_>> {
        let end = self.slides.len() + 1;
        self.insert_slide(end, layout_index)
    }

    /// Insert a slide at a 1-based position, clamped to the end of the deck
    pub fn insert_slide(&mut self, index: usize, layout_index: usize) -> Result<SlideMut<'_>> {
        self.package.ensure_open()?;
        let layouts = self.layouts();
        let layout = if layouts.is_empty() {
            None
        } else {
            let chosen = layouts.get(layout_index).ok_or_else(|| {
                Error::InvalidIndex(format!(
                    "layout {} out of range (have {})",
                    layout_index,
                    layouts.len()
                ))
            })?;
            Some(chosen.uri.clone())
        };
        let position = index.clamp(1, self.slides.len() + 1) - 1;
        let id = self.take_slide_id()?;

        let slide_uri = self.package.next_part_name("ppt/slides/slide", "xml");
        let root = template::slide();
        self.package
            .add_part(&slide_uri, content_types::SLIDE, root.to_xml_bytes()?, AddMode::Create)?;
        if let Some(layout) = &layout {
            self.package
                .add_relationship(&slide_uri, rel_types::SLIDE_LAYOUT, layout, TargetMode::Internal)?;
        }
        let rel_id = self
            .package
            .add_relationship(&self.uri, rel_types::SLIDE, &slide_uri, TargetMode::Internal)?;
        self.root.prefix_for(xml::R, "r");

        let mut part = SlidePart::new(id, rel_id, slide_uri, root)?;
        part.layout = layout;
        log::debug!("inserted slide {} ({}) at {}", id, part.uri, position + 1);
        self.slides.insert(position, part);
        Ok(self.handle(position))
    }

    /// Delete a slide with its notes, comments and any media only it used
    pub fn delete_slide(&mut self, index: usize) -> Result<()> {
        self.package.ensure_open()?;
        self.check_index(index)?;
        let part = self.slides.remove(index - 1);
        self.package.remove_relationship(&self.uri, &part.rel_id)?;
        // notes slides point back at their slide, so the tree goes unconditionally
        self.package.delete_part_tree(&part.uri)?;
        log::debug!("deleted slide {} ({})", part.id, part.uri);
        Ok(())
    }

    /// Copy a slide to the position after it; notes text is copied, comments are not
    pub fn duplicate_slide(&mut self, index: usize) -> Result<SlideMut<'_>> {
        self.package.ensure_open()?;
        self.check_index(index)?;
        let id = self.take_slide_id()?;
        let source = &self.slides[index - 1];
        let source_uri = source.uri.clone();
        let notes = source.notes.as_ref().map(NotesSlide::text);

        let copy_uri = self.package.next_part_name("ppt/slides/slide", "xml");
        self.package
            .add_part(&copy_uri, content_types::SLIDE, Vec::new(), AddMode::Create)?;
        let rels: Vec<Relationship> = self
            .package
            .relationships_of(&source_uri)?
            .iter()
            .filter(|r| r.rel_type != rel_types::NOTES_SLIDE && r.rel_type != rel_types::MODERN_COMMENTS)
            .cloned()
            .collect();
        for rel in rels {
            self.package
                .add_relationship_with_id(&copy_uri, &rel.id, &rel.rel_type, &rel.target, rel.target_mode)?;
        }
        let rel_id = self
            .package
            .add_relationship(&self.uri, rel_types::SLIDE, &copy_uri, TargetMode::Internal)?;

        let copy = self.slides[index - 1].duplicate(id, rel_id, copy_uri);
        self.package.set_part_data(&copy.uri, copy.to_bytes()?)?;
        self.slides.insert(index, copy);

        let mut handle = self.handle(index);
        if let Some(text) = notes {
            handle.set_notes(&text)?;
        }
        Ok(handle)
    }

    /// Move a slide between 1-based positions; part names are left as they are
    pub fn reorder_slide(&mut self, from: usize, to: usize) -> Result<()> {
        self.package.ensure_open()?;
        self.check_index(from)?;
        self.check_index(to)?;
        let part = self.slides.remove(from - 1);
        self.slides.insert(to - 1, part);
        Ok(())
    }

    // === Size, masters and layouts ===

    /// Slide width and height in EMU
    pub fn slide_size(&self) -> (i64, i64) {
        let size = self.root.child("sldSz");
        let side = |name: &str, default: i64| {
            size.and_then(|s| s.attr(name))
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        (side("cx", DEFAULT_SLIDE_WIDTH), side("cy", DEFAULT_SLIDE_HEIGHT))
    }

    /// Set the slide size in EMU; each side must lie in 1 to 56 inches
    pub fn set_slide_size(&mut self, cx: i64, cy: i64) -> Result<()> {
        self.package.ensure_open()?;
        let valid = MIN_SLIDE_SIDE..=MAX_SLIDE_SIDE;
        if !valid.contains(&cx) || !valid.contains(&cy) {
            return Err(Error::validation(
                "slide size",
                format!("each side must be {} to {} EMU", MIN_SLIDE_SIDE, MAX_SLIDE_SIDE),
                format!("{}x{}", cx, cy),
            ));
        }
        if self.root.child("sldSz").is_none() {
            let size = RawXmlElement::new(self.tag("sldSz"));
            self.root.insert_child_ordered(size, PRESENTATION_ORDER);
        }
        let Some(size) = self.root.child_mut("sldSz") else {
            unreachable!()
        };
        size.set_attr("cx", cx.to_string());
        size.set_attr("cy", cy.to_string());
        match SLIDE_SIZE_TYPES.iter().find(|(w, h, _)| *w == cx && *h == cy) {
            Some((_, _, kind)) => size.set_attr("type", *kind),
            None => {
                size.remove_attr("type");
            }
        }
        Ok(())
    }

    /// Parse a part, logging and skipping it when unreadable
    fn part_root(&self, uri: &str) -> Option<RawXmlElement> {
        let part = self.package.get_part(uri).ok()?;
        match RawXmlElement::parse(part.data()) {
            Ok(root) => Some(root),
            Err(e) => {
                log::warn!("ignoring unparseable part '{}': {}", uri, e);
                None
            }
        }
    }

    /// Slide masters in `sldMasterIdLst` order
    pub fn masters(&self) -> Vec<SlideMaster> {
        let r = self.r_prefix();
        self.root
            .child("sldMasterIdLst")
            .into_iter()
            .flat_map(|l| l.elements())
            .filter(|e| e.local_name() == "sldMasterId")
            .filter_map(|e| rel_id_of(e, &r))
            .filter_map(|id| self.package.related_part(&self.uri, id).ok())
            .map(|uri| SlideMaster {
                name: self
                    .part_root(uri.as_str())
                    .map(|root| common_slide_name(&root))
                    .unwrap_or_default(),
                uri: uri.as_str().to_string(),
            })
            .collect()
    }

    /// Layouts of every master, master by master in `sldLayoutIdLst` order
    pub fn layouts(&self) -> Vec<SlideLayout> {
        let mut layouts = Vec::new();
        for master in self.masters() {
            let Some(root) = self.part_root(&master.uri) else {
                continue;
            };
            let r = root.declared_prefix(xml::R).unwrap_or("r");
            let entries = root
                .child("sldLayoutIdLst")
                .into_iter()
                .flat_map(|l| l.elements())
                .filter(|e| e.local_name() == "sldLayoutId");
            for entry in entries {
                let Some(uri) = rel_id_of(entry, r)
                    .and_then(|id| self.package.related_part(&master.uri, id).ok())
                else {
                    continue;
                };
                layouts.push(SlideLayout {
                    name: self
                        .part_root(uri.as_str())
                        .map(|root| common_slide_name(&root))
                        .unwrap_or_default(),
                    uri: uri.as_str().to_string(),
                    master: master.uri.clone(),
                });
            }
        }
        layouts
    }
}

/// Load a slide with its layout link, notes and comments
fn load_slide(package: &Package, deck: &str, id: u32, rel_id: &str) -> Result<SlidePart> {
    let target = package
        .related_part(deck, rel_id)
        .map_err(|_| Error::Corrupted(format!("slide relationship '{}' does not resolve", rel_id)))?;
    let part = package
        .get_part(target.as_str())
        .map_err(|_| Error::Corrupted(format!("slide part '{}' is missing", target)))?;
    let root = RawXmlElement::parse(part.data())?;
    let mut slide = SlidePart::new(id, rel_id.to_string(), target.as_str().to_string(), root)?;

    slide.layout = package
        .related_part_by_type(&slide.uri, rel_types::SLIDE_LAYOUT)
        .map(|u| u.as_str().to_string());
    if let Some(notes) = package.related_part_by_type(&slide.uri, rel_types::NOTES_SLIDE) {
        slide.notes = package.load_related(&slide.uri, rel_types::NOTES_SLIDE, |d| {
            NotesSlide::parse(notes.as_str(), d)
        });
    }
    if let Some(list) = package.related_part_by_type(&slide.uri, rel_types::MODERN_COMMENTS) {
        slide.comments = package.load_related(&slide.uri, rel_types::MODERN_COMMENTS, |d| {
            CommentList::parse(list.as_str(), d)
        });
    }
    Ok(slide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reopen(deck: &mut Presentation) -> Presentation {
        Presentation::from_bytes(&deck.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_new_deck_layouts() {
        let deck = Presentation::new().unwrap();
        assert_eq!(deck.slide_count(), 0);
        assert_eq!(deck.slide_size(), (DEFAULT_SLIDE_WIDTH, DEFAULT_SLIDE_HEIGHT));
        let masters = deck.masters();
        assert_eq!(masters.len(), 1);
        assert_eq!(masters[0].uri, "ppt/slideMasters/slideMaster1.xml");
        let layouts = deck.layouts();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].name, "Title Only");
        assert_eq!(layouts[0].master, masters[0].uri);
    }

    #[test]
    fn test_slide_ids_and_order() {
        let mut deck = Presentation::new().unwrap();
        deck.add_slide(0).unwrap();
        deck.add_slide(0).unwrap();
        deck.insert_slide(1, 0).unwrap();
        let ids: Vec<u32> = deck.slides().iter().map(Slide::id).collect();
        assert_eq!(ids, vec![258, 256, 257]);
        assert_eq!(deck.slide(1).unwrap().uri(), "ppt/slides/slide3.xml");
        assert_eq!(
            deck.slide(1).unwrap().layout(),
            Some("ppt/slideLayouts/slideLayout1.xml")
        );

        deck.reorder_slide(1, 3).unwrap();
        let mut reopened = reopen(&mut deck);
        let ids: Vec<u32> = reopened.slides().iter().map(Slide::id).collect();
        assert_eq!(ids, vec![256, 257, 258]);
        assert_eq!(reopened.add_slide(0).unwrap().view().id(), 259);

        assert_eq!(deck.slide(0).unwrap_err().code(), "invalid-index");
        assert_eq!(deck.slide(4).unwrap_err().code(), "invalid-index");
        assert_eq!(deck.add_slide(5).err().unwrap().code(), "invalid-index");
    }

    #[test]
    fn test_slide_size_types() {
        let mut deck = Presentation::new().unwrap();
        deck.set_slide_size(9_144_000, 6_858_000).unwrap();
        assert_eq!(deck.root.child("sldSz").unwrap().attr("type"), Some("screen4x3"));
        deck.set_slide_size(10_000_000, 5_000_000).unwrap();
        assert_eq!(deck.root.child("sldSz").unwrap().attr("type"), None);
        assert_eq!(deck.slide_size(), (10_000_000, 5_000_000));
        let err = deck.set_slide_size(100, 5_000_000).unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn test_notes_create_master_on_save() {
        let mut deck = Presentation::new().unwrap();
        deck.add_slide(0).unwrap().set_notes("Say hello").unwrap();
        let reopened = reopen(&mut deck);
        assert_eq!(reopened.slide(1).unwrap().notes().as_deref(), Some("Say hello"));
        let master = reopened.notes_master_uri().unwrap();
        assert_eq!(master, "ppt/notesMasters/notesMaster1.xml");
        let notes_uri = "ppt/notesSlides/notesSlide1.xml";
        assert!(reopened
            .package
            .related_part_by_type(notes_uri, rel_types::NOTES_MASTER)
            .is_some());
    }

    #[test]
    fn test_notes_master_found_under_any_prefix() {
        let mut deck = Presentation::new().unwrap();
        deck.add_slide(0).unwrap().set_notes("x").unwrap();
        deck.to_bytes().unwrap();

        let rel_id = deck
            .package
            .relationships_of(&deck.uri)
            .unwrap()
            .by_type(rel_types::NOTES_MASTER)
            .unwrap()
            .id
            .clone();
        let list = deck.root.child_mut("notesMasterIdLst").unwrap();
        list.remove_children("notesMasterId");
        list.push_child(
            RawXmlElement::new("p:notesMasterId")
                .with_attr("xmlns:rel", xml::R)
                .with_attr("rel:id", rel_id),
        );
        assert_eq!(
            deck.notes_master_uri().as_deref(),
            Some("ppt/notesMasters/notesMaster1.xml")
        );
    }

    #[test]
    fn test_closed_deck_rejects_edits() {
        let mut deck = Presentation::new().unwrap();
        deck.add_slide(0).unwrap();
        deck.close();
        assert!(deck.is_closed());
        assert_eq!(deck.add_slide(0).err().unwrap().code(), "closed");
        assert_eq!(deck.slide_mut(1).err().unwrap().code(), "closed");
        assert_eq!(deck.to_bytes().unwrap_err().code(), "closed");
    }
}
