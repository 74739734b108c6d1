//! Table cell elements (w:tc)

use crate::document::body::{self, BlockContent};
use crate::document::{Paragraph, Table};
use crate::error::Result;
use crate::xml::RawXmlElement;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Child order of w:tcPr
const TC_PR_ORDER: &[&str] = &[
    "cnfStyle",
    "tcW",
    "gridSpan",
    "hMerge",
    "vMerge",
    "tcBorders",
    "shd",
    "noWrap",
    "tcMar",
    "textDirection",
    "tcFitText",
    "vAlign",
    "hideMark",
];

/// Vertical merge state of a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VMerge {
    /// First cell of a merged column run
    Restart,
    /// Cell absorbed into the run above
    Continue,
}

/// Vertical alignment of cell content
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

impl VerticalAlignment {
    fn from_val(val: &str) -> Option<Self> {
        match val {
            "top" => Some(Self::Top),
            "center" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
        }
    }
}

/// Table cell (w:tc)
#[derive(Clone, Debug, Default)]
pub struct TableCell {
    /// Cell properties (w:tcPr), kept whole so borders and shading survive
    pub properties: Option<RawXmlElement>,
    /// Paragraphs, nested tables and content controls
    pub content: Vec<BlockContent>,
}

impl TableCell {
    /// A cell holding one paragraph of `text`
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let para = if text.is_empty() {
            Paragraph::default()
        } else {
            Paragraph::new(text)
        };
        TableCell {
            properties: None,
            content: vec![BlockContent::Paragraph(para)],
        }
    }

    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, _start: &BytesStart) -> Result<Self> {
        let mut cell = TableCell::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"tcPr" => {
                    cell.properties = Some(RawXmlElement::from_reader(reader, &e)?);
                }
                Event::Start(e) => cell.content.push(BlockContent::from_start(reader, &e)?),
                Event::Empty(e) if e.name().local_name().as_ref() == b"tcPr" => {
                    cell.properties = Some(RawXmlElement::from_empty(&e));
                }
                Event::Empty(e) => cell.content.push(BlockContent::from_empty(&e)),
                Event::End(e) if e.name().local_name().as_ref() == b"tc" => break,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(cell)
    }

    /// Paragraph texts joined with newlines, nested tables included
    pub fn text(&self) -> String {
        body::blocks_text(&self.content)
    }

    /// Replace all content with a single paragraph
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = vec![BlockContent::Paragraph(Paragraph::new(text))];
    }

    /// Reset to one empty paragraph
    pub fn clear(&mut self) {
        self.content = vec![BlockContent::Paragraph(Paragraph::default())];
    }

    pub fn add_paragraph(&mut self, para: Paragraph) -> &mut Paragraph {
        self.content.push(BlockContent::Paragraph(para));
        match self.content.last_mut() {
            Some(BlockContent::Paragraph(p)) => p,
            _ => unreachable!(),
        }
    }

    /// Nest a table; a paragraph follows it since a cell may not end on a table
    pub fn add_table(&mut self, table: Table) {
        self.content.push(BlockContent::Table(table));
        self.content.push(BlockContent::Paragraph(Paragraph::default()));
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.content.iter().filter_map(|c| match c {
            BlockContent::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.content.iter_mut().filter_map(|c| match c {
            BlockContent::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.content.iter().filter_map(|c| match c {
            BlockContent::Table(t) => Some(t),
            _ => None,
        })
    }

    fn property(&self, local: &str) -> Option<&RawXmlElement> {
        self.properties.as_ref()?.child(local)
    }

    fn property_val(&self, local: &str) -> Option<&str> {
        self.property(local)?.attr_local("val")
    }

    /// Replace (or with `None` remove) one tcPr child
    fn set_property(&mut self, local: &str, element: Option<RawXmlElement>) {
        let props = self
            .properties
            .get_or_insert_with(|| RawXmlElement::new("w:tcPr"));
        props.remove_children(local);
        if let Some(element) = element {
            props.insert_child_ordered(element, TC_PR_ORDER);
        }
    }

    /// Width in twips
    pub fn width(&self) -> Option<i32> {
        self.property("tcW")?.attr_local("w")?.parse().ok()
    }

    pub fn set_width(&mut self, width: i32) {
        let element = RawXmlElement::new("w:tcW")
            .with_attr("w:w", width.to_string())
            .with_attr("w:type", "dxa");
        self.set_property("tcW", Some(element));
    }

    /// Number of grid columns spanned
    pub fn grid_span(&self) -> Option<u32> {
        self.property_val("gridSpan")?.parse().ok()
    }

    pub fn set_grid_span(&mut self, span: u32) {
        let element = (span > 1).then(|| RawXmlElement::new("w:gridSpan").with_attr("w:val", span.to_string()));
        self.set_property("gridSpan", element);
    }

    /// A vMerge without a value continues the run above
    pub fn v_merge(&self) -> Option<VMerge> {
        let merge = self.property("vMerge")?;
        match merge.attr_local("val") {
            Some("restart") => Some(VMerge::Restart),
            _ => Some(VMerge::Continue),
        }
    }

    pub fn set_v_merge(&mut self, merge: Option<VMerge>) {
        let element = merge.map(|m| match m {
            VMerge::Restart => RawXmlElement::new("w:vMerge").with_attr("w:val", "restart"),
            VMerge::Continue => RawXmlElement::new("w:vMerge"),
        });
        self.set_property("vMerge", element);
    }

    pub fn vertical_alignment(&self) -> Option<VerticalAlignment> {
        VerticalAlignment::from_val(self.property_val("vAlign")?)
    }

    pub fn set_vertical_alignment(&mut self, align: VerticalAlignment) {
        let element = RawXmlElement::new("w:vAlign").with_attr("w:val", align.as_str());
        self.set_property("vAlign", Some(element));
    }

    /// Whether the cell starts a horizontal merge
    pub fn is_merge_start(&self) -> bool {
        self.grid_span().is_some_and(|s| s > 1)
    }

    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("w:tc")))?;
        if let Some(props) = self.properties.as_ref().filter(|p| !p.children.is_empty()) {
            props.write_to(writer)?;
        }
        for item in &self.content {
            item.write_to(writer)?;
        }
        if !matches!(self.content.last(), Some(BlockContent::Paragraph(_))) {
            writer.write_event(Event::Empty(BytesStart::new("w:p")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:tc")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;
    use pretty_assertions::assert_eq;

    fn parse(data: &str) -> TableCell {
        let mut reader = xml::reader_from_bytes(data.as_bytes());
        let mut buf = Vec::new();
        loop {
            if let Event::Start(e) = reader.read_event_into(&mut buf).unwrap() {
                return TableCell::from_reader(&mut reader, &e.into_owned()).unwrap();
            }
            buf.clear();
        }
    }

    #[test]
    fn test_properties_keep_schema_order() {
        let mut cell = parse(
            r#"<w:tc xmlns:w="w"><w:tcPr><w:tcBorders><w:top w:val="single"/></w:tcBorders><w:vAlign w:val="bottom"/></w:tcPr><w:p/></w:tc>"#,
        );
        assert_eq!(cell.vertical_alignment(), Some(VerticalAlignment::Bottom));
        cell.set_width(2400);
        cell.set_v_merge(Some(VMerge::Continue));
        cell.set_vertical_alignment(VerticalAlignment::Center);

        let props = cell.properties.as_ref().unwrap();
        let order: Vec<&str> = props.elements().map(|e| e.local_name()).collect();
        assert_eq!(order, vec!["tcW", "vMerge", "tcBorders", "vAlign"]);
        assert_eq!(cell.width(), Some(2400));
        assert_eq!(cell.v_merge(), Some(VMerge::Continue));

        cell.set_v_merge(None);
        assert_eq!(cell.v_merge(), None);
    }

    #[test]
    fn test_unit_span_is_not_written() {
        let mut cell = TableCell::new("a");
        cell.set_grid_span(1);
        assert!(!cell.is_merge_start());
        let mut out = Vec::new();
        cell.write_to(&mut Writer::new(&mut out)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains("tcPr"), "{}", out);
    }
}
