//! Table row elements (w:tr)

use crate::error::Result;
use crate::xml::{RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

use super::cell::TableCell;

/// Table row (w:tr)
#[derive(Clone, Debug, Default)]
pub struct TableRow {
    /// Row properties (w:trPr)
    pub properties: Option<RawXmlElement>,
    /// Cells
    pub cells: Vec<TableCell>,
    /// Unknown attributes (w14:paraId and friends)
    pub unknown_attrs: Vec<(String, String)>,
    /// Unknown children (preserved)
    pub unknown_children: Vec<RawXmlNode>,
}

impl TableRow {
    /// Create a row of empty cells
    pub fn new(cell_count: usize) -> Self {
        TableRow {
            cells: (0..cell_count).map(|_| TableCell::new("")).collect(),
            ..Default::default()
        }
    }

    /// Create a row from cell texts
    pub fn from_texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        TableRow {
            cells: texts.into_iter().map(TableCell::new).collect(),
            ..Default::default()
        }
    }

    /// Parse from reader (after w:tr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut row = TableRow {
            unknown_attrs: crate::xml::attributes_of(start),
            ..Default::default()
        };
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"trPr" => row.properties = Some(RawXmlElement::from_reader(reader, &e)?),
                    b"tc" => row.cells.push(TableCell::from_reader(reader, &e)?),
                    _ => {
                        let raw = RawXmlElement::from_reader(reader, &e)?;
                        row.unknown_children.push(RawXmlNode::Element(raw));
                    }
                },
                Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"tc" => row.cells.push(TableCell::new("")),
                    _ => row
                        .unknown_children
                        .push(RawXmlNode::Element(RawXmlElement::from_empty(&e))),
                },
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"tr" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(row)
    }

    /// Iterate over cells
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.cells.iter()
    }

    /// Get cell at index
    pub fn cell(&self, index: usize) -> Option<&TableCell> {
        self.cells.get(index)
    }

    /// Get mutable cell at index
    pub fn cell_mut(&mut self, index: usize) -> Option<&mut TableCell> {
        self.cells.get_mut(index)
    }

    /// Mark the row as a header row repeated on each page
    pub fn set_header(&mut self, header: bool) {
        let props = self
            .properties
            .get_or_insert_with(|| RawXmlElement::new("w:trPr"));
        props.remove_children("tblHeader");
        if header {
            props.push_child(RawXmlElement::new("w:tblHeader"));
        }
    }

    /// Whether the row repeats as a header
    pub fn is_header(&self) -> bool {
        self.properties
            .as_ref()
            .and_then(|p| p.child("tblHeader"))
            .map_or(false, |h| h.attr("w:val").map_or(true, crate::xml::parse_bool_str))
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:tr");
        for (key, value) in &self.unknown_attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(start))?;

        if let Some(props) = &self.properties {
            props.write_to(writer)?;
        }
        for cell in &self.cells {
            cell.write_to(writer)?;
        }
        for child in &self.unknown_children {
            child.write_to(writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new("w:tr")))?;
        Ok(())
    }
}
