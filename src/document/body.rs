//! Document body and block-level content

use crate::document::sdt::{BlockSdt, MAX_SDT_DEPTH};
use crate::document::{Paragraph, Table};
use crate::error::Result;
use crate::xml::{RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Block-level content in a document body
#[derive(Clone, Debug)]
pub enum BlockContent {
    /// Paragraph
    Paragraph(Paragraph),
    /// Table
    Table(Table),
    /// Block-level content control
    ContentControl(BlockSdt),
    /// Unknown element (preserved for round-trip)
    Unknown(RawXmlNode),
}

/// Document body (w:body)
#[derive(Clone, Debug, Default)]
pub struct Body {
    /// Block-level content
    pub content: Vec<BlockContent>,
    /// Section properties (last sectPr in body)
    pub section_properties: Option<RawXmlElement>,
}

impl Body {
    /// Parse body from XML reader (after w:body start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut body = Body::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    if e.name().local_name().as_ref() == b"sectPr" {
                        body.section_properties = Some(RawXmlElement::from_reader(reader, &e)?);
                    } else {
                        body.content.push(BlockContent::from_start(reader, &e)?);
                    }
                }
                Event::Empty(e) => {
                    if e.name().local_name().as_ref() == b"sectPr" {
                        body.section_properties = Some(RawXmlElement::from_empty(&e));
                    } else {
                        body.content.push(BlockContent::from_empty(&e));
                    }
                }
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"body" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(body)
    }

    /// Get top-level paragraphs
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.content.iter().filter_map(|c| match c {
            BlockContent::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Get top-level paragraphs mutably
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.content.iter_mut().filter_map(|c| match c {
            BlockContent::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Get top-level tables
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.content.iter().filter_map(|c| match c {
            BlockContent::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Get top-level tables mutably
    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.content.iter_mut().filter_map(|c| match c {
            BlockContent::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Write body to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("w:body")))?;

        for content in &self.content {
            content.write_to(writer)?;
        }

        if let Some(sect_pr) = &self.section_properties {
            sect_pr.write_to(writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new("w:body")))?;
        Ok(())
    }

    /// Add a paragraph
    pub fn add_paragraph(&mut self, para: Paragraph) -> &mut Paragraph {
        self.content.push(BlockContent::Paragraph(para));
        match self.content.last_mut() {
            Some(BlockContent::Paragraph(p)) => p,
            _ => unreachable!(),
        }
    }

    /// Add a table
    pub fn add_table(&mut self, table: Table) -> &mut Table {
        self.content.push(BlockContent::Table(table));
        match self.content.last_mut() {
            Some(BlockContent::Table(t)) => t,
            _ => unreachable!(),
        }
    }
}

impl BlockContent {
    /// Parse block-level content from a start tag
    pub fn from_start<R: BufRead>(reader: &mut Reader<R>, e: &BytesStart) -> Result<Self> {
        let item = match e.name().local_name().as_ref() {
            b"p" => BlockContent::Paragraph(Paragraph::from_reader(reader, e)?),
            b"tbl" => BlockContent::Table(Table::from_reader(reader, e)?),
            b"sdt" => BlockContent::ContentControl(BlockSdt::from_reader(reader, e)?),
            _ => BlockContent::Unknown(RawXmlNode::Element(RawXmlElement::from_reader(reader, e)?)),
        };
        Ok(item)
    }

    /// Parse block-level content from an empty tag
    pub fn from_empty(e: &BytesStart) -> Self {
        match e.name().local_name().as_ref() {
            b"p" => BlockContent::Paragraph(Paragraph::from_empty(e)),
            _ => BlockContent::Unknown(RawXmlNode::Element(RawXmlElement::from_empty(e))),
        }
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            BlockContent::Paragraph(para) => para.write_to(writer),
            BlockContent::Table(table) => table.write_to(writer),
            BlockContent::ContentControl(sdt) => sdt.write_to(writer),
            BlockContent::Unknown(node) => node.write_to(writer),
        }
    }
}

/// Read block-level children up to the end tag named `end` (local name)
pub(crate) fn read_blocks<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<Vec<BlockContent>> {
    let mut blocks = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => blocks.push(BlockContent::from_start(reader, &e)?),
            Event::Empty(e) => blocks.push(BlockContent::from_empty(&e)),
            Event::End(e) => {
                if e.name().local_name().as_ref() == end {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(blocks)
}

/// Visit every paragraph in document order, including those in tables and content controls
pub(crate) fn for_each_paragraph<'a, F>(blocks: &'a [BlockContent], f: &mut F)
where
    F: FnMut(&'a Paragraph),
{
    visit(blocks, 0, f);

    fn visit<'a, F: FnMut(&'a Paragraph)>(blocks: &'a [BlockContent], depth: usize, f: &mut F) {
        if depth > MAX_SDT_DEPTH {
            return;
        }
        for block in blocks {
            match block {
                BlockContent::Paragraph(p) => f(p),
                BlockContent::Table(t) => {
                    for cell in t.rows.iter().flat_map(|r| r.cells.iter()) {
                        visit(&cell.content, depth + 1, f);
                    }
                }
                BlockContent::ContentControl(sdt) => visit(&sdt.content, depth + 1, f),
                BlockContent::Unknown(_) => {}
            }
        }
    }
}

/// Visit preserved block-level elements, inside tables and content controls too
pub(crate) fn for_each_unknown_block<'a, F>(blocks: &'a [BlockContent], f: &mut F)
where
    F: FnMut(&'a RawXmlNode),
{
    visit(blocks, 0, f);

    fn visit<'a, F: FnMut(&'a RawXmlNode)>(blocks: &'a [BlockContent], depth: usize, f: &mut F) {
        if depth > MAX_SDT_DEPTH {
            return;
        }
        for block in blocks {
            match block {
                BlockContent::Paragraph(_) => {}
                BlockContent::Table(t) => {
                    for cell in t.rows.iter().flat_map(|r| r.cells.iter()) {
                        visit(&cell.content, depth + 1, f);
                    }
                }
                BlockContent::ContentControl(sdt) => visit(&sdt.content, depth + 1, f),
                BlockContent::Unknown(node) => f(node),
            }
        }
    }
}

/// Mutable counterpart of [`for_each_paragraph`]
pub(crate) fn for_each_paragraph_mut<F>(blocks: &mut [BlockContent], f: &mut F)
where
    F: FnMut(&mut Paragraph),
{
    visit(blocks, 0, f);

    fn visit<F: FnMut(&mut Paragraph)>(blocks: &mut [BlockContent], depth: usize, f: &mut F) {
        if depth > MAX_SDT_DEPTH {
            return;
        }
        for block in blocks {
            match block {
                BlockContent::Paragraph(p) => f(p),
                BlockContent::Table(t) => {
                    for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                        visit(&mut cell.content, depth + 1, f);
                    }
                }
                BlockContent::ContentControl(sdt) => visit(&mut sdt.content, depth + 1, f),
                BlockContent::Unknown(_) => {}
            }
        }
    }
}

/// Paragraph texts joined with newlines
pub(crate) fn blocks_text(blocks: &[BlockContent]) -> String {
    let mut texts = Vec::new();
    for_each_paragraph(blocks, &mut |p| texts.push(p.text()));
    texts.join("\n")
}
