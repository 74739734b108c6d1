//! Slides and their shape trees

use crate::drawing as dml;
use crate::error::{Error, Result};
use crate::opc::{content_types, rel_types, AddMode, Package, TargetMode};
use crate::presentation::comments::{self, AuthorList, CommentList, SlideComment};
use crate::presentation::notes::NotesSlide;
use crate::presentation::shape::{self, collect_rel_ids, Bounds, SlideShape};
use crate::presentation::table::new_table;
use crate::presentation::text::TextBody;
use crate::xml::{self, RawXmlElement, RawXmlNode};
use std::collections::HashSet;

/// Schema order of `p:sld` children
const SLD_ORDER: &[&str] = &["cSld", "clrMapOvr", "transition", "timing", "extLst"];

/// Children of `p:spTree` that are not shapes
const TREE_PROPERTIES: &[&str] = &["nvGrpSpPr", "grpSpPr", "extLst"];

/// A slide part with its notes and comments
#[derive(Clone, Debug)]
pub(crate) struct SlidePart {
    /// `sldId id`
    pub(crate) id: u32,
    /// Relationship from the presentation part
    pub(crate) rel_id: String,
    pub(crate) uri: String,
    /// Slide element; the shape-tree entries live in `shapes`
    root: RawXmlElement,
    shapes: Vec<SlideShape>,
    pub(crate) layout: Option<String>,
    pub(crate) notes: Option<NotesSlide>,
    pub(crate) comments: Option<CommentList>,
}

impl SlidePart {
    pub(crate) fn new(id: u32, rel_id: String, uri: String, mut root: RawXmlElement) -> Result<Self> {
        if root.local_name() != "sld" {
            return Err(Error::InvalidFormat(format!("expected sld in '{}', found {}", uri, root.name)));
        }
        let mut shapes = Vec::new();
        if let Some(tree) = root.descendant_mut(&["cSld", "spTree"]) {
            let children = std::mem::take(&mut tree.children);
            for child in children {
                match child {
                    RawXmlNode::Element(e) if !TREE_PROPERTIES.contains(&e.local_name()) => {
                        shapes.push(SlideShape::from_element(e));
                    }
                    RawXmlNode::Element(e) => tree.children.push(RawXmlNode::Element(e)),
                    _ => {}
                }
            }
        }
        Ok(SlidePart {
            id,
            rel_id,
            uri,
            root,
            shapes,
            layout: None,
            notes: None,
            comments: None,
        })
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut root = self.root.clone();
        if let Some(tree) = root.descendant_mut(&["cSld", "spTree"]) {
            let at = tree
                .children
                .iter()
                .position(|c| c.as_element().map(|e| e.local_name() == "extLst").unwrap_or(false))
                .unwrap_or(tree.children.len());
            let entries = self.shapes.iter().map(|s| RawXmlNode::Element(s.to_element()));
            tree.children.splice(at..at, entries);
            tree.self_closing = false;
        }
        root.to_xml_bytes()
    }

    /// A copy for a new part: same shapes and layout, no notes or comments
    pub(crate) fn duplicate(&self, id: u32, rel_id: String, uri: String) -> SlidePart {
        let mut copy = SlidePart {
            id,
            rel_id,
            uri,
            root: self.root.clone(),
            shapes: self.shapes.clone(),
            layout: self.layout.clone(),
            notes: None,
            comments: None,
        };
        copy.remove_comment_ext();
        copy
    }

    fn hidden(&self) -> bool {
        self.root
            .attr("show")
            .map(|v| !xml::parse_bool_str(v))
            .unwrap_or(false)
    }

    fn next_shape_id(&self) -> Result<u32> {
        let mut ids = Vec::new();
        self.root.find_all("cNvPr", &mut ids);
        let tree_max = ids
            .iter()
            .filter_map(|c| c.attr("id")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        let shape_max = self.shapes.iter().map(SlideShape::max_id).max().unwrap_or(0);
        tree_max
            .max(shape_max)
            .max(1)
            .checked_add(1)
            .ok_or_else(|| Error::InvalidValue(format!("slide '{}' has no shape IDs left", self.uri)))
    }

    /// Relationship IDs referenced from the slide XML
    fn referenced_rel_ids(&self) -> HashSet<String> {
        let mut ids = Vec::new();
        collect_rel_ids(&self.root, &mut ids);
        for shape in &self.shapes {
            ids.extend(shape.rel_ids());
        }
        ids.into_iter().collect()
    }

    fn set_comment_ext(&mut self, rel_id: &str) {
        let r = self.root.prefix_for(xml::R, "r");
        self.remove_comment_ext();
        if self.root.child("extLst").is_none() {
            self.root.insert_child_ordered(RawXmlElement::new("p:extLst"), SLD_ORDER);
        }
        if let Some(ext_lst) = self.root.child_mut("extLst") {
            ext_lst.push_child(comments::comment_rel_ext(rel_id, &r));
        }
    }

    fn remove_comment_ext(&mut self) {
        let Some(ext_lst) = self.root.child_mut("extLst") else {
            return;
        };
        ext_lst.children.retain(|c| match c.as_element() {
            Some(e) => e.attr("uri") != Some(comments::COMMENT_REL_EXT),
            None => true,
        });
        if ext_lst.elements().next().is_none() {
            self.root.remove_children("extLst");
        }
    }
}

/// Read access to a slide
#[derive(Clone, Copy, Debug)]
pub struct Slide<'a> {
    part: &'a SlidePart,
    index: usize,
    authors: Option<&'a AuthorList>,
}

impl<'a> Slide<'a> {
    pub(crate) fn new(part: &'a SlidePart, index: usize, authors: Option<&'a AuthorList>) -> Self {
        Slide { part, index, authors }
    }

    /// 1-based position in the deck
    pub fn index(&self) -> usize {
        self.index
    }

    /// Slide ID from the presentation's slide list
    pub fn id(&self) -> u32 {
        self.part.id
    }

    /// Part name, e.g. `ppt/slides/slide1.xml`
    pub fn uri(&self) -> &'a str {
        &self.part.uri
    }

    /// Whether the slide is hidden in slide shows (`show="0"`)
    pub fn hidden(&self) -> bool {
        self.part.hidden()
    }

    /// Slide name (`p:cSld name`)
    pub fn name(&self) -> &'a str {
        self.part.root.child("cSld").and_then(|c| c.attr("name")).unwrap_or("")
    }

    /// Part name of the slide's layout
    pub fn layout(&self) -> Option<&'a str> {
        self.part.layout.as_deref()
    }

    pub fn shapes(&self) -> &'a [SlideShape] {
        &self.part.shapes
    }

    pub fn shape_by_name(&self, name: &str) -> Option<&'a SlideShape> {
        self.part.shapes.iter().find(|s| s.name() == name)
    }

    pub fn shape_by_id(&self, id: u32) -> Option<&'a SlideShape> {
        self.part.shapes.iter().find(|s| s.id() == id)
    }

    /// Texts of the shapes that carry text, in tree order
    pub fn texts(&self) -> Vec<String> {
        self.part
            .shapes
            .iter()
            .filter(|s| s.text_body().is_some())
            .map(SlideShape::text)
            .collect()
    }

    /// Speaker notes, `None` without a notes slide
    pub fn notes(&self) -> Option<String> {
        self.part.notes.as_ref().map(NotesSlide::text)
    }

    pub fn comments(&self) -> Vec<SlideComment> {
        self.part
            .comments
            .as_ref()
            .map(|c| c.comments(self.authors))
            .unwrap_or_default()
    }
}

/// Write access to a slide
#[derive(Debug)]
pub struct SlideMut<'a> {
    part: &'a mut SlidePart,
    package: &'a mut Package,
    authors: &'a mut Option<AuthorList>,
    /// Presentation part name
    deck: &'a str,
    index: usize,
}

impl<'a> SlideMut<'a> {
    pub(crate) fn new(
        part: &'a mut SlidePart,
        package: &'a mut Package,
        authors: &'a mut Option<AuthorList>,
        deck: &'a str,
        index: usize,
    ) -> Self {
        SlideMut {
            part,
            package,
            authors,
            deck,
            index,
        }
    }

    pub fn view(&self) -> Slide<'_> {
        Slide::new(self.part, self.index, self.authors.as_ref())
    }

    pub fn hidden(&self) -> bool {
        self.part.hidden()
    }

    pub fn set_hidden(&mut self, hidden: bool) -> Result<()> {
        self.package.ensure_open()?;
        if hidden {
            self.part.root.set_attr("show", "0");
        } else {
            self.part.root.remove_attr("show");
        }
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.package.ensure_open()?;
        let csld = self
            .part
            .root
            .child_mut("cSld")
            .ok_or_else(|| Error::InvalidFormat(format!("slide '{}' has no cSld", self.part.uri)))?;
        csld.set_attr("name", name);
        Ok(())
    }

    pub fn shapes_mut(&mut self) -> &mut [SlideShape] {
        &mut self.part.shapes
    }

    pub fn shape_mut(&mut self, id: u32) -> Option<&mut SlideShape> {
        self.part.shapes.iter_mut().find(|s| s.id() == id)
    }

    pub fn shape_by_name_mut(&mut self, name: &str) -> Option<&mut SlideShape> {
        self.part.shapes.iter_mut().find(|s| s.name() == name)
    }

    fn push(&mut self, shape: SlideShape) -> u32 {
        let id = shape.id();
        self.part.shapes.push(shape);
        id
    }

    /// Add a text box; returns its shape ID
    pub fn add_text_box(&mut self, text: &str, bounds: Bounds) -> Result<u32> {
        self.package.ensure_open()?;
        bounds.check()?;
        let id = self.part.next_shape_id()?;
        let mut sp = shape::new_shape(id, &format!("TextBox {}", id - 1), "rect", &bounds, true);
        sp.set_text(text)?;
        Ok(self.push(sp))
    }

    /// Add a preset-geometry shape such as `rect`, `ellipse` or `rightArrow`
    pub fn add_shape(&mut self, preset: &str, bounds: Bounds) -> Result<u32> {
        self.package.ensure_open()?;
        shape::check_preset(preset)?;
        bounds.check()?;
        let id = self.part.next_shape_id()?;
        let sp = shape::new_shape(id, &format!("Shape {}", id - 1), preset, &bounds, false);
        Ok(self.push(sp))
    }

    /// Add a `rows` × `cols` table frame
    pub fn add_table(&mut self, rows: usize, cols: usize, bounds: Bounds) -> Result<u32> {
        self.package.ensure_open()?;
        bounds.check()?;
        let tbl = new_table(rows, cols, bounds.cx, bounds.cy)?;
        let id = self.part.next_shape_id()?;
        let frame = shape::new_graphic_frame(
            id,
            &format!("Table {}", id - 1),
            dml::graphic(dml::uri::TABLE, tbl),
            &bounds,
        );
        Ok(self.push(frame))
    }

    /// Add a picture; `ext` picks the media content type
    pub fn add_picture(&mut self, data: &[u8], ext: &str, bounds: Bounds) -> Result<u32> {
        self.package.ensure_open()?;
        bounds.check()?;
        if data.is_empty() {
            return Err(Error::InvalidValue("image data cannot be empty".into()));
        }
        let (content_type, ext) = dml::image_type(ext)?;
        let media = self.package.next_part_name("ppt/media/image", &ext);
        self.package
            .add_part(&media, content_type, data.to_vec(), AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&self.part.uri, rel_types::IMAGE, &media, TargetMode::Internal)?;
        self.part.root.prefix_for(xml::R, "r");

        let id = self.part.next_shape_id()?;
        let pic = shape::new_picture(id, &format!("Picture {}", id - 1), &rel_id, &bounds);
        Ok(self.push(pic))
    }

    /// Add a bar chart titled `title`
    pub fn add_chart(&mut self, title: &str, bounds: Bounds) -> Result<u32> {
        self.package.ensure_open()?;
        bounds.check()?;
        let chart = self.package.next_part_name("ppt/charts/chart", "xml");
        self.package
            .add_part(&chart, content_types::CHART, dml::chart_part(title)?, AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&self.part.uri, rel_types::CHART, &chart, TargetMode::Internal)?;

        let id = self.part.next_shape_id()?;
        let name = if title.is_empty() {
            format!("Chart {}", id - 1)
        } else {
            title.to_string()
        };
        let frame = shape::new_graphic_frame(
            id,
            &name,
            dml::graphic(dml::uri::CHART, dml::chart_reference(&rel_id)),
            &bounds,
        );
        Ok(self.push(frame))
    }

    /// Add a one-node diagram
    pub fn add_diagram(&mut self, bounds: Bounds) -> Result<u32> {
        self.package.ensure_open()?;
        bounds.check()?;
        let parts = dml::diagram_parts()?;
        let package = &mut *self.package;
        let slide_uri = self.part.uri.as_str();
        let mut add = |name: &str, content_type: &str, rel_type: &str, data: Vec<u8>| -> Result<String> {
            let uri = package.next_part_name(&format!("ppt/diagrams/{}", name), "xml");
            package.add_part(&uri, content_type, data, AddMode::Create)?;
            package.add_relationship(slide_uri, rel_type, &uri, TargetMode::Internal)
        };
        let ids = dml::DiagramRelIds {
            data: add("data", content_types::DIAGRAM_DATA, rel_types::DIAGRAM_DATA, parts.data)?,
            layout: add("layout", content_types::DIAGRAM_LAYOUT, rel_types::DIAGRAM_LAYOUT, parts.layout)?,
            style: add("quickStyle", content_types::DIAGRAM_STYLE, rel_types::DIAGRAM_STYLE, parts.style)?,
            colors: add("colors", content_types::DIAGRAM_COLORS, rel_types::DIAGRAM_COLORS, parts.colors)?,
        };

        let id = self.part.next_shape_id()?;
        let frame = shape::new_graphic_frame(
            id,
            &format!("Diagram {}", id - 1),
            dml::graphic(dml::uri::DIAGRAM, dml::diagram_reference(&ids)),
            &bounds,
        );
        Ok(self.push(frame))
    }

    /// Remove a shape; parts only it referenced (media, charts) go with it
    pub fn delete_shape(&mut self, id: u32) -> Result<()> {
        self.package.ensure_open()?;
        let pos = self
            .part
            .shapes
            .iter()
            .position(|s| s.id() == id)
            .ok_or_else(|| Error::InvalidReference(format!("no shape with id {} on slide {}", id, self.index)))?;
        let removed = self.part.shapes.remove(pos);

        let still_used = self.part.referenced_rel_ids();
        let mut released = HashSet::new();
        for rel_id in removed.rel_ids() {
            if still_used.contains(&rel_id) || !released.insert(rel_id.clone()) {
                continue;
            }
            if self.package.relationships_of(&self.part.uri)?.get(&rel_id).is_some() {
                self.package.release_relationship(&self.part.uri, &rel_id)?;
            }
        }
        log::debug!("deleted shape {} from {}", id, self.part.uri);
        Ok(())
    }

    /// Speaker notes, `None` without a notes slide
    pub fn notes(&self) -> Option<String> {
        self.view().notes()
    }

    /// Replace the speaker notes, creating the notes slide on first use
    pub fn set_notes(&mut self, text: &str) -> Result<()> {
        self.package.ensure_open()?;
        if let Some(notes) = self.part.notes.as_mut() {
            return notes.set_text(text);
        }

        let uri = self.package.next_part_name("ppt/notesSlides/notesSlide", "xml");
        let mut notes = NotesSlide::new(uri.as_str());
        notes.set_text(text)?;
        self.package
            .add_part(&uri, content_types::NOTES_SLIDE, notes.to_bytes()?, AddMode::Create)?;
        self.package.link_part(&self.part.uri, rel_types::NOTES_SLIDE, &uri)?;
        self.package.link_part(&uri, rel_types::SLIDE, &self.part.uri)?;
        if let Some(master) = self.package.related_part_by_type(self.deck, rel_types::NOTES_MASTER) {
            self.package
                .link_part(&uri, rel_types::NOTES_MASTER, master.as_str())?;
        }
        self.part.notes = Some(notes);
        Ok(())
    }

    pub fn comments(&self) -> Vec<SlideComment> {
        self.view().comments()
    }

    /// Add a comment at (`x`, `y`); returns the comment ID
    pub fn add_comment(&mut self, text: &str, author: &str, x: i64, y: i64) -> Result<String> {
        self.package.ensure_open()?;
        if author.trim().is_empty() {
            return Err(Error::InvalidValue("comment author cannot be empty".into()));
        }
        if text.is_empty() {
            return Err(Error::InvalidValue("comment text cannot be empty".into()));
        }

        if self.authors.is_none() {
            let list = AuthorList::new(crate::opc::well_known::PPT_AUTHORS);
            self.package
                .put_part(list.uri(), content_types::AUTHORS, list.to_bytes()?)?;
            self.package
                .link_part(self.deck, rel_types::AUTHORS, list.uri())?;
            *self.authors = Some(list);
        }
        let author_id = match self.authors.as_mut() {
            Some(list) => list.ensure(author),
            None => unreachable!(),
        };

        if self.part.comments.is_none() {
            let uri = self.package.next_part_name("ppt/comments/modernComment_", "xml");
            let list = CommentList::new(uri.as_str());
            self.package
                .add_part(&uri, content_types::MODERN_COMMENTS, list.to_bytes()?, AddMode::Create)?;
            let rel_id = self
                .package
                .link_part(&self.part.uri, rel_types::MODERN_COMMENTS, &uri)?;
            self.part.set_comment_ext(&rel_id);
            self.part.comments = Some(list);
        }
        match self.part.comments.as_mut() {
            Some(list) => Ok(list.add(&author_id, text, x, y)),
            None => unreachable!(),
        }
    }

    /// Delete a comment; the comment part goes with the last one
    pub fn delete_comment(&mut self, id: &str) -> Result<()> {
        self.package.ensure_open()?;
        let list = self
            .part
            .comments
            .as_mut()
            .ok_or_else(|| Error::InvalidReference(format!("no comment '{}'", id)))?;
        if !list.remove(id) {
            return Err(Error::InvalidReference(format!("no comment '{}'", id)));
        }
        if list.len() > 0 {
            return Ok(());
        }

        let uri = list.uri().to_string();
        let rel_id = self
            .package
            .relationships_of(&self.part.uri)?
            .by_type_and_target(rel_types::MODERN_COMMENTS, &uri)
            .map(|r| r.id.clone());
        if let Some(rel_id) = rel_id {
            self.package.release_relationship(&self.part.uri, &rel_id)?;
        }
        self.part.remove_comment_ext();
        self.part.comments = None;
        Ok(())
    }

    /// Replace the text of the first shape named `name`
    pub fn set_shape_text(&mut self, name: &str, text: &str) -> Result<()> {
        self.package.ensure_open()?;
        let shape = self
            .shape_by_name_mut(name)
            .ok_or_else(|| Error::InvalidReference(format!("no shape named '{}'", name)))?;
        shape.set_text(text)
    }

    /// Replace a shape's text body
    pub fn set_text_body(&mut self, id: u32, body: TextBody) -> Result<()> {
        self.package.ensure_open()?;
        let shape = self
            .shape_mut(id)
            .ok_or_else(|| Error::InvalidReference(format!("no shape with id {}", id)))?;
        match shape.text_body_mut() {
            Some(slot) => *slot = body,
            None => {
                shape.set_text("")?;
                if let Some(slot) = shape.text_body_mut() {
                    *slot = body;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::shape::ShapeKind;
    use crate::presentation::template;
    use pretty_assertions::assert_eq;

    fn blank() -> SlidePart {
        SlidePart::new(256, "rId2".into(), "ppt/slides/slide1.xml".into(), template::slide()).unwrap()
    }

    #[test]
    fn test_shapes_split_from_tree_and_rejoined() {
        let xml = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
            <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>
            <p:sp><p:nvSpPr><p:cNvPr id="7" name="Title"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>
            <p:extLst><p:ext uri="x"/></p:extLst>
            </p:spTree></p:cSld></p:sld>"#;
        let root = RawXmlElement::parse(xml.as_bytes()).unwrap();
        let mut part = SlidePart::new(256, "rId2".into(), "s.xml".into(), root).unwrap();
        assert_eq!(part.shapes.len(), 1);
        assert_eq!(part.next_shape_id().unwrap(), 8);

        part.shapes.push(shape::new_shape(8, "Box", "rect", &Bounds::new(0, 0, 1, 1), false));
        let out = RawXmlElement::parse(&part.to_bytes().unwrap()).unwrap();
        let names: Vec<&str> = out
            .descendant(&["cSld", "spTree"])
            .unwrap()
            .elements()
            .map(|e| e.local_name())
            .collect();
        assert_eq!(names, vec!["nvGrpSpPr", "grpSpPr", "sp", "sp", "extLst"]);
    }

    #[test]
    fn test_shape_ids_run_out() {
        let xml = r#"<p:sld xmlns:p="p"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr>
            <p:sp><p:nvSpPr><p:cNvPr id="4294967295" name="Last"/></p:nvSpPr></p:sp></p:spTree></p:cSld></p:sld>"#;
        let root = RawXmlElement::parse(xml.as_bytes()).unwrap();
        let part = SlidePart::new(256, "rId2".into(), "s.xml".into(), root).unwrap();
        assert_eq!(part.next_shape_id().unwrap_err().code(), "invalid-value");
    }

    #[test]
    fn test_blank_slide_ids_start_at_two() {
        let part = blank();
        assert_eq!(part.next_shape_id().unwrap(), 2);
        assert!(!part.hidden());
        let rejected = RawXmlElement::new("p:notes");
        assert!(SlidePart::new(1, "rId1".into(), "x.xml".into(), rejected).is_err());
    }

    #[test]
    fn test_shapes_through_handle() {
        let mut package = Package::new();
        package
            .add_part("ppt/slides/slide1.xml", content_types::SLIDE, Vec::new(), AddMode::Create)
            .unwrap();
        let mut part = blank();
        let mut authors = None;
        let mut slide = SlideMut::new(&mut part, &mut package, &mut authors, "ppt/presentation.xml", 1);

        let text = slide.add_text_box("Hello", Bounds::new(0, 0, 100, 100)).unwrap();
        let rect = slide.add_shape("ellipse", Bounds::new(10, 10, 50, 50)).unwrap();
        let table = slide.add_table(2, 2, Bounds::new(0, 0, 200, 200)).unwrap();
        assert_eq!((text, rect, table), (2, 3, 4));
        assert!(slide.add_shape("", Bounds::new(0, 0, 1, 1)).is_err());
        assert!(slide.add_text_box("x", Bounds::new(0, 0, 0, 1)).is_err());

        let view = slide.view();
        assert_eq!(view.shape_by_id(2).unwrap().text(), "Hello");
        assert_eq!(view.shape_by_id(3).unwrap().geometry(), Some("ellipse"));
        assert_eq!(
            view.shape_by_id(4).unwrap().kind(),
            ShapeKind::Graphic(dml::GraphicKind::Table)
        );
        assert_eq!(view.texts(), vec!["Hello".to_string()]);

        slide.delete_shape(3).unwrap();
        assert!(slide.view().shape_by_id(3).is_none());
        assert_eq!(slide.delete_shape(3).unwrap_err().code(), "invalid-reference");
        slide.set_hidden(true).unwrap();
        assert!(slide.hidden());
    }

    #[test]
    fn test_picture_part_released_with_shape() {
        let mut package = Package::new();
        package
            .add_part("ppt/slides/slide1.xml", content_types::SLIDE, Vec::new(), AddMode::Create)
            .unwrap();
        let mut part = blank();
        let mut authors = None;
        let mut slide = SlideMut::new(&mut part, &mut package, &mut authors, "ppt/presentation.xml", 1);
        let id = slide
            .add_picture(b"\x89PNG\r\n", "png", Bounds::new(0, 0, 10, 10))
            .unwrap();
        assert!(slide.package.part_exists("ppt/media/image1.png"));
        slide.delete_shape(id).unwrap();
        assert!(!slide.package.part_exists("ppt/media/image1.png"));
    }
}
