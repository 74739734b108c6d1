//! Slide tables (a:tbl inside a graphic frame)

use crate::error::{Error, Result};
use crate::presentation::text::TextBody;
use crate::xml::RawXmlElement;

/// Schema order of `a:tc` children
const TC_ORDER: &[&str] = &["txBody", "tcPr", "extLst"];

/// A new `a:tbl` of `rows` × `cols` empty cells sized to fill `cx` × `cy`
pub(crate) fn new_table(rows: usize, cols: usize, cx: i64, cy: i64) -> Result<RawXmlElement> {
    if rows == 0 || cols == 0 {
        return Err(Error::validation(
            "size",
            "a table needs at least one row and one column",
            format!("{}x{}", rows, cols),
        ));
    }
    let col_width = cx / cols as i64;
    let row_height = cy / rows as i64;

    let mut grid = RawXmlElement::new("a:tblGrid");
    for _ in 0..cols {
        grid.push_child(RawXmlElement::new("a:gridCol").with_attr("w", col_width.to_string()));
    }
    let mut tbl = RawXmlElement::new("a:tbl")
        .with_child(
            RawXmlElement::new("a:tblPr")
                .with_attr("firstRow", "1")
                .with_attr("bandRow", "1"),
        )
        .with_child(grid);
    for _ in 0..rows {
        tbl.push_child(new_row(cols, row_height));
    }
    Ok(tbl)
}

fn new_row(cols: usize, height: i64) -> RawXmlElement {
    let mut row = RawXmlElement::new("a:tr").with_attr("h", height.to_string());
    for _ in 0..cols {
        row.push_child(new_cell());
    }
    row
}

fn new_cell() -> RawXmlElement {
    RawXmlElement::new("a:tc")
        .with_child(TextBody::default().to_element("a:txBody"))
        .with_child(RawXmlElement::new("a:tcPr"))
}

fn rows_of(tbl: &RawXmlElement) -> impl Iterator<Item = &RawXmlElement> {
    tbl.elements().filter(|e| e.local_name() == "tr")
}

fn col_count(tbl: &RawXmlElement) -> usize {
    tbl.child("tblGrid")
        .map(|g| g.elements().filter(|e| e.local_name() == "gridCol").count())
        .unwrap_or(0)
}

fn out_of_range(row: usize, col: usize) -> Error {
    Error::InvalidIndex(format!("table cell ({}, {}) is out of range", row, col))
}

/// Read access to a slide table
#[derive(Clone, Copy, Debug)]
pub struct SlideTable<'a> {
    tbl: &'a RawXmlElement,
}

impl<'a> SlideTable<'a> {
    pub(crate) fn new(tbl: &'a RawXmlElement) -> Self {
        SlideTable { tbl }
    }

    pub fn rows(&self) -> usize {
        rows_of(self.tbl).count()
    }

    pub fn cols(&self) -> usize {
        col_count(self.tbl)
    }

    /// Cell at zero-based `row`, `col`
    pub fn cell(&self, row: usize, col: usize) -> Result<TableCell<'a>> {
        rows_of(self.tbl)
            .nth(row)
            .and_then(|r| r.elements().filter(|e| e.local_name() == "tc").nth(col))
            .map(|tc| TableCell { tc })
            .ok_or_else(|| out_of_range(row, col))
    }

    /// Cell texts, row by row
    pub fn texts(&self) -> Vec<Vec<String>> {
        rows_of(self.tbl)
            .map(|r| {
                r.elements()
                    .filter(|e| e.local_name() == "tc")
                    .map(|tc| TableCell { tc }.text())
                    .collect()
            })
            .collect()
    }
}

/// A table cell (a:tc)
#[derive(Clone, Copy, Debug)]
pub struct TableCell<'a> {
    tc: &'a RawXmlElement,
}

impl<'a> TableCell<'a> {
    pub fn text(&self) -> String {
        self.text_body().map(|b| b.text()).unwrap_or_default()
    }

    pub fn text_body(&self) -> Option<TextBody> {
        self.tc.child("txBody").map(TextBody::from_element)
    }

    pub fn row_span(&self) -> u32 {
        self.tc.attr("rowSpan").and_then(|v| v.parse().ok()).unwrap_or(1)
    }

    pub fn grid_span(&self) -> u32 {
        self.tc.attr("gridSpan").and_then(|v| v.parse().ok()).unwrap_or(1)
    }

    /// Whether the cell is covered by a neighbour's span
    pub fn is_merged(&self) -> bool {
        ["hMerge", "vMerge"]
            .iter()
            .any(|a| self.tc.attr(a).map(crate::xml::parse_bool_str).unwrap_or(false))
    }
}

/// Write access to a slide table
#[derive(Debug)]
pub struct SlideTableMut<'a> {
    tbl: &'a mut RawXmlElement,
}

impl<'a> SlideTableMut<'a> {
    pub(crate) fn new(tbl: &'a mut RawXmlElement) -> Self {
        SlideTableMut { tbl }
    }

    pub fn view(&self) -> SlideTable<'_> {
        SlideTable::new(&*self.tbl)
    }

    pub fn rows(&self) -> usize {
        self.view().rows()
    }

    pub fn cols(&self) -> usize {
        self.view().cols()
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Result<TableCellMut<'_>> {
        self.tbl
            .elements_mut()
            .filter(|e| e.local_name() == "tr")
            .nth(row)
            .and_then(|r| r.elements_mut().filter(|e| e.local_name() == "tc").nth(col))
            .map(|tc| TableCellMut { tc })
            .ok_or_else(|| out_of_range(row, col))
    }

    /// Set the text of the cell at `row`, `col`
    pub fn set_cell_text(&mut self, row: usize, col: usize, text: &str) -> Result<()> {
        self.cell_mut(row, col)?.set_text(text);
        Ok(())
    }

    /// Append an empty row as tall as the last one
    pub fn add_row(&mut self) {
        let height = rows_of(self.tbl)
            .last()
            .and_then(|r| r.attr("h"))
            .and_then(|h| h.parse().ok())
            .unwrap_or(370_840);
        let row = new_row(self.cols(), height);
        let pos = self.tbl.children.iter().rposition(|c| {
            c.as_element()
                .map(|e| e.local_name() == "tr" || e.local_name() == "tblGrid")
                .unwrap_or(false)
        });
        let node = crate::xml::RawXmlNode::Element(row);
        match pos {
            Some(i) => self.tbl.children.insert(i + 1, node),
            None => self.tbl.children.push(node),
        }
        self.tbl.self_closing = false;
    }

    /// Remove the zero-based `row`; the last row cannot be removed
    pub fn delete_row(&mut self, row: usize) -> Result<()> {
        let rows = self.rows();
        if row >= rows {
            return Err(Error::InvalidIndex(format!("table row {} is out of range", row)));
        }
        if rows == 1 {
            return Err(Error::validation("row", "a table needs at least one row", row.to_string()));
        }
        let mut seen = 0;
        self.tbl.children.retain(|c| match c.as_element() {
            Some(e) if e.local_name() == "tr" => {
                seen += 1;
                seen - 1 != row
            }
            _ => true,
        });
        Ok(())
    }
}

/// A mutable table cell
#[derive(Debug)]
pub struct TableCellMut<'a> {
    tc: &'a mut RawXmlElement,
}

impl<'a> TableCellMut<'a> {
    pub fn text(&self) -> String {
        TableCell { tc: &*self.tc }.text()
    }

    pub fn set_text(&mut self, text: &str) {
        let mut body = TableCell { tc: &*self.tc }.text_body().unwrap_or_default();
        body.set_text(text);
        self.set_text_body(&body);
    }

    pub fn set_text_body(&mut self, body: &TextBody) {
        self.tc.remove_children("txBody");
        self.tc.insert_child_ordered(body.to_element("a:txBody"), TC_ORDER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_table_shape() {
        let tbl = new_table(2, 3, 3000, 1000).unwrap();
        let view = SlideTable::new(&tbl);
        assert_eq!(view.rows(), 2);
        assert_eq!(view.cols(), 3);
        assert_eq!(tbl.child("tblGrid").unwrap().child("gridCol").unwrap().attr("w"), Some("1000"));
        assert_eq!(view.cell(1, 2).unwrap().text(), "");
        assert_eq!(view.cell(2, 0).unwrap_err().code(), "invalid-index");
        assert!(new_table(0, 1, 10, 10).is_err());
    }

    #[test]
    fn test_cell_text_and_rows() {
        let mut tbl = new_table(1, 2, 2000, 500).unwrap();
        let mut table = SlideTableMut::new(&mut tbl);
        table.set_cell_text(0, 1, "Revenue").unwrap();
        table.add_row();
        table.set_cell_text(1, 0, "Q1").unwrap();
        assert_eq!(table.rows(), 2);
        assert_eq!(
            table.view().texts(),
            vec![vec!["".to_string(), "Revenue".to_string()], vec!["Q1".to_string(), "".to_string()]]
        );
        table.delete_row(0).unwrap();
        assert_eq!(table.view().cell(0, 0).unwrap().text(), "Q1");
        assert!(table.delete_row(0).is_err());

        let names: Vec<&str> = tbl.descendant(&["tr", "tc"]).unwrap().elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["txBody", "tcPr"]);
    }
}
