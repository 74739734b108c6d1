//! Cell comments (xl/commentsN.xml) and their legacy VML anchors

use crate::error::{Error, Result};
use crate::spreadsheet::cell_ref::CellRef;
use crate::spreadsheet::shared_strings::item_text;
use crate::xml::{self, RawXmlElement};

/// First VML shape number of a sheet's comment set
const FIRST_SHAPE_ID: usize = 1025;

/// A comment as seen by callers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetComment {
    /// Cell reference, e.g. `B3`
    pub reference: String,
    pub author: String,
    pub text: String,
}

/// Comments of one worksheet
#[derive(Clone, Debug)]
pub struct CommentsPart {
    uri: String,
    vml_uri: Option<String>,
    root: RawXmlElement,
    /// Set when the VML anchors must be rebuilt
    dirty: bool,
}

impl CommentsPart {
    pub fn new(uri: impl Into<String>) -> Self {
        let root = RawXmlElement::new("comments")
            .with_attr("xmlns", xml::S)
            .with_child(RawXmlElement::new("authors"))
            .with_child(RawXmlElement::new("commentList"));
        CommentsPart {
            uri: uri.into(),
            vml_uri: None,
            root,
            dirty: true,
        }
    }

    pub fn from_bytes(uri: impl Into<String>, data: &[u8]) -> Result<Self> {
        let root = RawXmlElement::parse(data)?;
        if root.local_name() != "comments" {
            return Err(Error::InvalidFormat(format!("expected comments, found {}", root.name)));
        }
        Ok(CommentsPart {
            uri: uri.into(),
            vml_uri: None,
            root,
            dirty: false,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn vml_uri(&self) -> Option<&str> {
        self.vml_uri.as_deref()
    }

    pub(crate) fn set_vml_uri(&mut self, uri: impl Into<String>) {
        self.vml_uri = Some(uri.into());
    }

    /// Whether the VML anchors are out of date
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn tag(&self, local: &str) -> String {
        match self.root.name.split_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    fn authors(&self) -> Vec<String> {
        self.root
            .child("authors")
            .into_iter()
            .flat_map(|a| a.elements())
            .map(RawXmlElement::text)
            .collect()
    }

    fn author_index(&mut self, author: &str) -> usize {
        let authors = self.authors();
        if let Some(i) = authors.iter().position(|a| a == author) {
            return i;
        }
        let tag = self.tag("author");
        if self.root.child("authors").is_none() {
            let list = RawXmlElement::new(self.tag("authors"));
            self.root.insert_child_ordered(list, &["authors", "commentList", "extLst"]);
        }
        if let Some(list) = self.root.child_mut("authors") {
            let mut elem = RawXmlElement::new(tag);
            if !author.is_empty() {
                elem = elem.with_text(author);
            }
            list.push_child(elem);
        }
        authors.len()
    }

    /// Comments in document order
    pub fn list(&self) -> Vec<SheetComment> {
        let authors = self.authors();
        self.entries()
            .map(|c| SheetComment {
                reference: c.attr("ref").unwrap_or_default().to_string(),
                author: c
                    .attr("authorId")
                    .and_then(|v| v.parse::<usize>().ok())
                    .and_then(|i| authors.get(i).cloned())
                    .unwrap_or_default(),
                text: c.child("text").map(item_text).unwrap_or_default(),
            })
            .collect()
    }

    fn entries(&self) -> impl Iterator<Item = &RawXmlElement> {
        self.root
            .child("commentList")
            .into_iter()
            .flat_map(|l| l.elements())
            .filter(|c| c.local_name() == "comment")
    }

    pub fn get(&self, cell: &CellRef) -> Option<SheetComment> {
        let reference = cell.to_string();
        self.list().into_iter().find(|c| c.reference == reference)
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach a comment to a cell, replacing any comment already there
    pub fn add(&mut self, cell: &CellRef, author: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(Error::validation("text", "comment text cannot be empty", text));
        }
        let author_id = self.author_index(author);
        let mut t = RawXmlElement::new(self.tag("t")).with_text(text);
        if xml::needs_space_preserve(text) {
            t.set_attr("xml:space", "preserve");
        }
        let comment = RawXmlElement::new(self.tag("comment"))
            .with_attr("ref", cell.to_string())
            .with_attr("authorId", author_id.to_string())
            .with_child(RawXmlElement::new(self.tag("text")).with_child(t));

        self.remove(cell);
        if self.root.child("commentList").is_none() {
            let list = RawXmlElement::new(self.tag("commentList"));
            self.root.insert_child_ordered(list, &["authors", "commentList", "extLst"]);
        }
        if let Some(list) = self.root.child_mut("commentList") {
            list.push_child(comment);
        }
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, cell: &CellRef) -> bool {
        let reference = cell.to_string();
        let Some(list) = self.root.child_mut("commentList") else {
            return false;
        };
        let before = list.children.len();
        list.children.retain(|node| match node {
            xml::RawXmlNode::Element(e) => e.local_name() != "comment" || e.attr("ref") != Some(reference.as_str()),
            _ => true,
        });
        before != list.children.len()
    }

    /// Remove the comment on a cell; `InvalidReference` when there is none
    pub fn delete(&mut self, cell: &CellRef) -> Result<()> {
        if !self.remove(cell) {
            return Err(Error::InvalidReference(format!("no comment on {}", cell)));
        }
        self.dirty = true;
        Ok(())
    }

    /// Legacy drawing with one hidden note shape per comment, ordered by row then column
    pub fn vml_bytes(&self) -> Result<Vec<u8>> {
        let mut cells: Vec<CellRef> = self
            .entries()
            .filter_map(|c| CellRef::parse(c.attr("ref")?).ok())
            .collect();
        cells.sort_by_key(|c| (c.row, c.col));

        let mut root = RawXmlElement::new("xml")
            .with_attr("xmlns:v", xml::V)
            .with_attr("xmlns:o", xml::O)
            .with_attr("xmlns:x", xml::X)
            .with_child(
                RawXmlElement::new("o:shapelayout")
                    .with_attr("v:ext", "edit")
                    .with_child(RawXmlElement::new("o:idmap").with_attr("v:ext", "edit").with_attr("data", "1")),
            )
            .with_child(
                RawXmlElement::new("v:shapetype")
                    .with_attr("id", "_x0000_t202")
                    .with_attr("coordsize", "21600,21600")
                    .with_attr("o:spt", "202")
                    .with_attr("path", "m,l,21600r21600,l21600,xe")
                    .with_child(RawXmlElement::new("v:stroke").with_attr("joinstyle", "miter"))
                    .with_child(
                        RawXmlElement::new("v:path")
                            .with_attr("gradientshapeok", "t")
                            .with_attr("o:connecttype", "rect"),
                    ),
            );

        for (i, cell) in cells.iter().enumerate() {
            let (row, col) = cell.zero_based();
            let client = RawXmlElement::new("x:ClientData")
                .with_attr("ObjectType", "Note")
                .with_child(RawXmlElement::new("x:MoveWithCells"))
                .with_child(RawXmlElement::new("x:SizeWithCells"))
                .with_child(RawXmlElement::new("x:AutoFill").with_text("False"))
                .with_child(RawXmlElement::new("x:Row").with_text(row.to_string()))
                .with_child(RawXmlElement::new("x:Column").with_text(col.to_string()));
            root.push_child(
                RawXmlElement::new("v:shape")
                    .with_attr("id", format!("_x0000_s{}", FIRST_SHAPE_ID + i))
                    .with_attr("type", "#_x0000_t202")
                    .with_attr(
                        "style",
                        "position:absolute;margin-left:59.25pt;margin-top:1.5pt;width:108pt;height:59.25pt;z-index:1;visibility:hidden",
                    )
                    .with_attr("fillcolor", "#ffffe1")
                    .with_attr("o:insetmode", "auto")
                    .with_child(RawXmlElement::new("v:fill").with_attr("color2", "#ffffe1"))
                    .with_child(
                        RawXmlElement::new("v:shadow")
                            .with_attr("color", "black")
                            .with_attr("obscured", "t"),
                    )
                    .with_child(RawXmlElement::new("v:path").with_attr("o:connecttype", "none"))
                    .with_child(
                        RawXmlElement::new("v:textbox")
                            .with_attr("style", "mso-direction-alt:auto")
                            .with_child(RawXmlElement::new("div").with_attr("style", "text-align:left")),
                    )
                    .with_child(client),
            );
        }
        root.to_xml_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    #[test]
    fn test_add_replace_delete() {
        let mut part = CommentsPart::new("xl/comments1.xml");
        part.add(&at("B2"), "Ann", "first").unwrap();
        part.add(&at("A1"), "Bob", "second").unwrap();
        part.add(&at("B2"), "Ann", "replaced").unwrap();

        let list = part.list();
        assert_eq!(list.len(), 2);
        assert_eq!(part.get(&at("B2")).unwrap().text, "replaced");
        assert_eq!(part.get(&at("A1")).unwrap().author, "Bob");

        part.delete(&at("A1")).unwrap();
        assert_eq!(part.delete(&at("A1")).unwrap_err().code(), "invalid-reference");
        assert_eq!(part.len(), 1);

        let out = String::from_utf8(part.to_bytes().unwrap()).unwrap();
        assert!(out.contains("<authors><author>Ann</author><author>Bob</author></authors>"));
        assert!(out.contains(r#"<comment ref="B2" authorId="0"><text><t>replaced</t></text></comment>"#));
    }

    #[test]
    fn test_vml_shapes_follow_cell_order() {
        let mut part = CommentsPart::new("xl/comments1.xml");
        part.add(&at("C5"), "Ann", "later").unwrap();
        part.add(&at("A1"), "Ann", "earlier").unwrap();
        let vml = RawXmlElement::parse(&part.vml_bytes().unwrap()).unwrap();
        let shapes: Vec<&RawXmlElement> = vml.elements().filter(|e| e.local_name() == "shape").collect();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].attr("id"), Some("_x0000_s1025"));
        assert_eq!(shapes[1].attr("id"), Some("_x0000_s1026"));
        let client = shapes[1].child("ClientData").unwrap();
        assert_eq!(client.child("Row").unwrap().text(), "4");
        assert_eq!(client.child("Column").unwrap().text(), "2");
    }

    #[test]
    fn test_parse_rich_comment() {
        let data = br#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors><author>Ann</author></authors><commentList><comment ref="D4" authorId="0"><text><r><rPr><b/></rPr><t>Ann:</t></r><r><t xml:space="preserve"> check</t></r></text></comment></commentList></comments>"#;
        let part = CommentsPart::from_bytes("xl/comments1.xml", data).unwrap();
        assert!(!part.is_dirty());
        let list = part.list();
        assert_eq!(list[0].text, "Ann: check");
        assert_eq!(list[0].reference, "D4");
    }
}
