//! Drawing envelope inside a run (w:drawing)

use crate::drawing::{self, GraphicKind};
use crate::error::Result;
use crate::xml::RawXmlElement;
use quick_xml::Writer;

/// A `w:drawing` element, kept as a tree so unknown markup survives
#[derive(Clone, Debug, PartialEq)]
pub struct Drawing {
    pub element: RawXmlElement,
}

/// Summary of a drawing in a document
#[derive(Clone, Debug, PartialEq)]
pub struct DrawingInfo {
    pub doc_pr_id: Option<u32>,
    pub name: Option<String>,
    pub kind: GraphicKind,
    pub relationship_ids: Vec<String>,
}

impl Drawing {
    pub fn new(element: RawXmlElement) -> Self {
        Drawing { element }
    }

    /// Build an inline drawing around `graphic`
    pub fn inline(doc_pr_id: u32, name: &str, cx: i64, cy: i64, graphic: RawXmlElement) -> Self {
        let inline = RawXmlElement::new("wp:inline")
            .with_attr("distT", "0")
            .with_attr("distB", "0")
            .with_attr("distL", "0")
            .with_attr("distR", "0")
            .with_child(
                RawXmlElement::new("wp:extent")
                    .with_attr("cx", cx.to_string())
                    .with_attr("cy", cy.to_string()),
            )
            .with_child(
                RawXmlElement::new("wp:effectExtent")
                    .with_attr("l", "0")
                    .with_attr("t", "0")
                    .with_attr("r", "0")
                    .with_attr("b", "0"),
            )
            .with_child(
                RawXmlElement::new("wp:docPr")
                    .with_attr("id", doc_pr_id.to_string())
                    .with_attr("name", name),
            )
            .with_child(RawXmlElement::new("wp:cNvGraphicFramePr"))
            .with_child(graphic);
        Drawing {
            element: RawXmlElement::new("w:drawing").with_child(inline),
        }
    }

    fn anchor(&self) -> Option<&RawXmlElement> {
        self.element
            .elements()
            .find(|e| matches!(e.local_name(), "inline" | "anchor"))
    }

    /// The `wp:docPr` ID
    pub fn doc_pr_id(&self) -> Option<u32> {
        self.anchor()?.child("docPr")?.attr("id")?.parse().ok()
    }

    /// The `wp:docPr` name
    pub fn doc_pr_name(&self) -> Option<&str> {
        self.anchor()?.child("docPr")?.attr("name")
    }

    /// Size in EMU
    pub fn extent(&self) -> Option<(i64, i64)> {
        let extent = self.anchor()?.child("extent")?;
        Some((extent.attr("cx")?.parse().ok()?, extent.attr("cy")?.parse().ok()?))
    }

    /// What the drawing shows
    pub fn kind(&self) -> GraphicKind {
        self.anchor()
            .and_then(|a| a.descendant(&["graphic", "graphicData"]))
            .and_then(|d| d.attr("uri"))
            .map(GraphicKind::from_uri)
            .unwrap_or(GraphicKind::Other)
    }

    /// Every relationship ID referenced from the drawing
    pub fn relationship_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        collect_rel_ids(&self.element, &mut ids);
        ids
    }

    pub fn info(&self) -> DrawingInfo {
        DrawingInfo {
            doc_pr_id: self.doc_pr_id(),
            name: self.doc_pr_name().map(str::to_string),
            kind: self.kind(),
            relationship_ids: self.relationship_ids(),
        }
    }

    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        self.element.write_to(writer)
    }
}

fn collect_rel_ids(elem: &RawXmlElement, out: &mut Vec<String>) {
    for (key, value) in &elem.attributes {
        if key.starts_with("r:") && !key.starts_with("xmlns") {
            out.push(value.clone());
        }
    }
    for child in elem.elements() {
        collect_rel_ids(child, out);
    }
}

/// Inline picture drawing
pub(crate) fn picture(doc_pr_id: u32, rel_id: &str, cx: i64, cy: i64) -> Drawing {
    let name = format!("Picture {}", doc_pr_id);
    let pic = drawing::picture("pic", 0, &name, rel_id, cx, cy);
    let graphic = drawing::graphic(drawing::uri::PICTURE, pic);
    Drawing::inline(doc_pr_id, &name, cx, cy, graphic)
}

/// Inline chart drawing
pub(crate) fn chart(doc_pr_id: u32, title: &str, rel_id: &str, cx: i64, cy: i64) -> Drawing {
    let name = if title.is_empty() {
        format!("Chart {}", doc_pr_id)
    } else {
        title.to_string()
    };
    let graphic = drawing::graphic(drawing::uri::CHART, drawing::chart_reference(rel_id));
    Drawing::inline(doc_pr_id, &name, cx, cy, graphic)
}

/// Inline diagram drawing
pub(crate) fn diagram(doc_pr_id: u32, ids: &drawing::DiagramRelIds, cx: i64, cy: i64) -> Drawing {
    let name = format!("Diagram {}", doc_pr_id);
    let graphic = drawing::graphic(drawing::uri::DIAGRAM, drawing::diagram_reference(ids));
    Drawing::inline(doc_pr_id, &name, cx, cy, graphic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_picture_drawing_info() {
        let d = picture(7, "rId3", 914400, 457200);
        assert_eq!(d.doc_pr_id(), Some(7));
        assert_eq!(d.kind(), GraphicKind::Picture);
        assert_eq!(d.extent(), Some((914400, 457200)));
        assert_eq!(d.relationship_ids(), vec!["rId3".to_string()]);
    }

    #[test]
    fn test_parsed_anchor_drawing() {
        let raw = RawXmlElement::parse(
            br#"<w:drawing xmlns:w="w" xmlns:wp="wp" xmlns:a="a" xmlns:r="r"><wp:anchor><wp:extent cx="10" cy="20"/><wp:docPr id="12" name="Chart 1"/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart xmlns:c="c" r:id="rId9"/></a:graphicData></a:graphic></wp:anchor></w:drawing>"#,
        )
        .unwrap();
        let d = Drawing::new(raw);
        let info = d.info();
        assert_eq!(info.doc_pr_id, Some(12));
        assert_eq!(info.name.as_deref(), Some("Chart 1"));
        assert_eq!(info.kind, GraphicKind::Chart);
        assert_eq!(info.relationship_ids, vec!["rId9".to_string()]);
    }
}
