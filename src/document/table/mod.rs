//! Table elements (w:tbl, w:tr, w:tc)

mod cell;
mod row;

pub use cell::{TableCell, VMerge, VerticalAlignment};
pub use row::TableRow;

use crate::error::{Error, Result};
use crate::xml::{self, RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Text width of a US Letter page with one-inch margins, in twips
const TEXT_WIDTH: i32 = 9360;

/// Table element (w:tbl)
#[derive(Clone, Debug, Default)]
pub struct Table {
    /// Table properties (w:tblPr)
    pub properties: Option<RawXmlElement>,
    /// Grid column widths in twips (w:tblGrid)
    pub grid: Vec<Option<i32>>,
    /// Table rows
    pub rows: Vec<TableRow>,
    /// Unknown children (preserved)
    pub unknown_children: Vec<RawXmlNode>,
}

impl Table {
    /// Create a `rows` x `cols` table in the "TableGrid" style with evenly split columns
    pub fn new(rows: usize, cols: usize) -> Self {
        let width = if cols == 0 { 0 } else { TEXT_WIDTH / cols as i32 };
        let properties = RawXmlElement::new("w:tblPr")
            .with_child(RawXmlElement::new("w:tblStyle").with_attr("w:val", "TableGrid"))
            .with_child(
                RawXmlElement::new("w:tblW")
                    .with_attr("w:w", "0")
                    .with_attr("w:type", "auto"),
            )
            .with_child(
                RawXmlElement::new("w:tblLook")
                    .with_attr("w:val", "04A0")
                    .with_attr("w:firstRow", "1")
                    .with_attr("w:lastRow", "0")
                    .with_attr("w:firstColumn", "1")
                    .with_attr("w:lastColumn", "0")
                    .with_attr("w:noHBand", "0")
                    .with_attr("w:noVBand", "1"),
            );

        let rows = (0..rows)
            .map(|_| {
                let mut row = TableRow::new(cols);
                for cell in &mut row.cells {
                    cell.set_width(width);
                }
                row
            })
            .collect();

        Table {
            properties: Some(properties),
            grid: vec![Some(width); cols],
            rows,
            unknown_children: Vec::new(),
        }
    }

    /// Parse from reader (after w:tbl start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, _start: &BytesStart) -> Result<Self> {
        let mut table = Table::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"tblPr" => table.properties = Some(RawXmlElement::from_reader(reader, &e)?),
                    b"tblGrid" => table.grid = parse_table_grid(reader)?,
                    b"tr" => table.rows.push(TableRow::from_reader(reader, &e)?),
                    _ => {
                        let raw = RawXmlElement::from_reader(reader, &e)?;
                        table.unknown_children.push(RawXmlNode::Element(raw));
                    }
                },
                Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"tblPr" => table.properties = Some(RawXmlElement::from_empty(&e)),
                    b"tblGrid" => {}
                    _ => table
                        .unknown_children
                        .push(RawXmlNode::Element(RawXmlElement::from_empty(&e))),
                },
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"tbl" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(table)
    }

    /// Table style ID
    pub fn style(&self) -> Option<&str> {
        self.properties.as_ref()?.child("tblStyle")?.attr("w:val")
    }

    /// Set the table style ID
    pub fn set_style(&mut self, style_id: &str) {
        let props = self
            .properties
            .get_or_insert_with(|| RawXmlElement::new("w:tblPr"));
        match props.child_mut("tblStyle") {
            Some(style) => style.set_attr("w:val", style_id),
            None => props.insert_child_ordered(
                RawXmlElement::new("w:tblStyle").with_attr("w:val", style_id),
                &["tblStyle"],
            ),
        }
    }

    /// Get row count
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get column count (grid width, or the widest row when there is no grid)
    pub fn column_count(&self) -> usize {
        if self.grid.is_empty() {
            self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
        } else {
            self.grid.len()
        }
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter()
    }

    /// Get cell at position (zero-based)
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row)?.cells.get(col)
    }

    /// Get mutable cell at position (zero-based)
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row)?.cells.get_mut(col)
    }

    /// Set the text of the cell at position; `InvalidIndex` when out of range
    pub fn set_cell_text(&mut self, row: usize, col: usize, text: impl Into<String>) -> Result<()> {
        let (rows, cols) = (self.row_count(), self.column_count());
        let cell = self.cell_mut(row, col).ok_or_else(|| {
            Error::InvalidIndex(format!("cell ({}, {}) outside {}x{} table", row, col, rows, cols))
        })?;
        cell.set_text(text);
        Ok(())
    }

    /// Append a row with one empty cell per grid column
    pub fn add_row(&mut self) -> &mut TableRow {
        let mut row = TableRow::new(self.column_count());
        for (cell, col) in row.cells.iter_mut().zip(&self.grid) {
            if let Some(width) = *col {
                cell.set_width(width);
            }
        }
        self.rows.push(row);
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Remove the row at `index`; `InvalidIndex` when out of range
    pub fn remove_row(&mut self, index: usize) -> Result<TableRow> {
        if index >= self.rows.len() {
            return Err(Error::InvalidIndex(format!(
                "row {} outside table of {} rows",
                index,
                self.rows.len()
            )));
        }
        Ok(self.rows.remove(index))
    }

    /// Set column width (in twips)
    pub fn set_column_width(&mut self, col: usize, width: i32) {
        if let Some(column) = self.grid.get_mut(col) {
            *column = Some(width);
        }
        for row in &mut self.rows {
            if let Some(cell) = row.cells.get_mut(col) {
                cell.set_width(width);
            }
        }
    }

    /// Cell texts, row by row
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(TableCell::text).collect())
            .collect()
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("w:tbl")))?;

        if let Some(props) = &self.properties {
            props.write_to(writer)?;
        }

        writer.write_event(Event::Start(BytesStart::new("w:tblGrid")))?;
        for col in &self.grid {
            let mut elem = BytesStart::new("w:gridCol");
            if let Some(w) = col {
                elem.push_attribute(("w:w", w.to_string().as_str()));
            }
            writer.write_event(Event::Empty(elem))?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:tblGrid")))?;

        for row in &self.rows {
            row.write_to(writer)?;
        }

        for child in &self.unknown_children {
            child.write_to(writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new("w:tbl")))?;
        Ok(())
    }
}

fn parse_table_grid<R: BufRead>(reader: &mut Reader<R>) -> Result<Vec<Option<i32>>> {
    let mut columns = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) if e.name().local_name().as_ref() == b"gridCol" => {
                columns.push(xml::get_attr(&e, "w:w").and_then(|v| v.parse().ok()));
            }
            Event::End(e) => {
                if e.name().local_name().as_ref() == b"tblGrid" {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::body::BlockContent;
    use pretty_assertions::assert_eq;

    fn parse(data: &str) -> Table {
        let mut reader = xml::reader_from_bytes(data.as_bytes());
        let mut buf = Vec::new();
        loop {
            if let Event::Start(e) = reader.read_event_into(&mut buf).unwrap() {
                return Table::from_reader(&mut reader, &e.into_owned()).unwrap();
            }
            buf.clear();
        }
    }

    #[test]
    fn test_new_table_shape() {
        let table = Table::new(2, 3);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.style(), Some("TableGrid"));
        assert_eq!(table.cell(1, 2).and_then(|c| c.width()), Some(3120));
        assert!(table.cell(2, 0).is_none());
    }

    #[test]
    fn test_set_cell_text_out_of_range() {
        let mut table = Table::new(1, 1);
        table.set_cell_text(0, 0, "x").unwrap();
        assert_eq!(table.texts(), vec![vec!["x".to_string()]]);
        let err = table.set_cell_text(3, 0, "y").unwrap_err();
        assert_eq!(err.kind().code(), "invalid-index");
    }

    #[test]
    fn test_nested_table_and_merge() {
        let table = parse(
            r#"<w:tbl xmlns:w="w"><w:tblPr><w:tblStyle w:val="Plain"/></w:tblPr><w:tblGrid><w:gridCol w:w="100"/><w:gridCol w:w="200"/></w:tblGrid><w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/><w:shd w:fill="FF0000"/><w:vAlign w:val="center"/></w:tcPr><w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p/></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(table.style(), Some("Plain"));
        let cell = table.cell(0, 0).unwrap();
        assert!(cell.is_merge_start());
        assert_eq!(cell.vertical_alignment(), Some(VerticalAlignment::Center));
        assert_eq!(cell.tables().count(), 1);
        assert!(matches!(cell.content[0], BlockContent::Table(_)));
        assert_eq!(cell.text(), "inner\n");

        let mut out = Vec::new();
        table.write_to(&mut Writer::new(&mut out)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"<w:gridSpan w:val="2"/><w:shd w:fill="FF0000"/><w:vAlign w:val="center"/>"#));
        assert!(out.contains(r#"<w:gridCol w:w="200"/>"#));
    }

    #[test]
    fn test_cell_without_trailing_paragraph_gets_one() {
        let mut table = Table::new(1, 1);
        let cell = table.cell_mut(0, 0).unwrap();
        cell.content = vec![BlockContent::Table(Table::new(1, 1))];
        let mut out = Vec::new();
        table.write_to(&mut Writer::new(&mut out)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("</w:tbl><w:p/></w:tc>"), "{}", out);
    }
}
