//! Table parts (xl/tables/tableN.xml) and row editing through the owning sheet

use crate::error::{Error, Result};
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell_ref::{CellRange, CellRef};
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::spreadsheet::worksheet::WorksheetPart;
use crate::xml::{self, RawXmlElement};

const TABLE_ORDER: &[&str] = &[
    "autoFilter",
    "sortState",
    "tableColumns",
    "tableStyleInfo",
    "extLst",
];

/// A table definition
#[derive(Clone, Debug)]
pub struct Table {
    uri: String,
    rel_id: String,
    root: RawXmlElement,
}

impl Table {
    /// A table over `range` with columns `Column1..N` and the medium banded style
    pub fn new(uri: impl Into<String>, rel_id: impl Into<String>, id: u32, name: &str, range: CellRange) -> Self {
        let reference = range.to_string();
        let mut columns = RawXmlElement::new("tableColumns").with_attr("count", range.cols().to_string());
        for i in 1..=range.cols() {
            columns.push_child(
                RawXmlElement::new("tableColumn")
                    .with_attr("id", i.to_string())
                    .with_attr("name", format!("Column{}", i)),
            );
        }
        let root = RawXmlElement::new("table")
            .with_attr("xmlns", xml::S)
            .with_attr("id", id.to_string())
            .with_attr("name", name)
            .with_attr("displayName", name)
            .with_attr("ref", reference.as_str())
            .with_attr("totalsRowShown", "0")
            .with_child(RawXmlElement::new("autoFilter").with_attr("ref", reference.as_str()))
            .with_child(columns)
            .with_child(
                RawXmlElement::new("tableStyleInfo")
                    .with_attr("name", "TableStyleMedium2")
                    .with_attr("showFirstColumn", "0")
                    .with_attr("showLastColumn", "0")
                    .with_attr("showRowStripes", "1")
                    .with_attr("showColumnStripes", "0"),
            );
        Table {
            uri: uri.into(),
            rel_id: rel_id.into(),
            root,
        }
    }

    pub fn from_bytes(uri: impl Into<String>, rel_id: impl Into<String>, data: &[u8]) -> Result<Self> {
        let root = RawXmlElement::parse(data)?;
        if root.local_name() != "table" {
            return Err(Error::InvalidFormat(format!("expected table, found {}", root.name)));
        }
        let table = Table {
            uri: uri.into(),
            rel_id: rel_id.into(),
            root,
        };
        table.range()?;
        Ok(table)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }

    /// Part URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Relationship ID from the worksheet
    pub fn rel_id(&self) -> &str {
        &self.rel_id
    }

    pub(crate) fn set_rel_id(&mut self, rel_id: impl Into<String>) {
        self.rel_id = rel_id.into();
    }

    pub fn id(&self) -> u32 {
        self.root.attr("id").and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        self.root.attr("name").unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.root.attr("displayName").unwrap_or_else(|| self.name())
    }

    /// A1 reference including the header row
    pub fn reference(&self) -> &str {
        self.root.attr("ref").unwrap_or_default()
    }

    pub fn range(&self) -> Result<CellRange> {
        CellRange::parse(self.reference())
    }

    pub fn header_row_count(&self) -> u32 {
        self.root
            .attr("headerRowCount")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    }

    pub fn style_name(&self) -> Option<&str> {
        self.root.child("tableStyleInfo")?.attr("name")
    }

    /// Column names in order
    pub fn columns(&self) -> Vec<String> {
        self.root
            .child("tableColumns")
            .into_iter()
            .flat_map(|c| c.elements())
            .filter(|c| c.local_name() == "tableColumn")
            .map(|c| c.attr("name").unwrap_or_default().to_string())
            .collect()
    }

    /// Zero-based position of a column, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Rows below the header, `None` for a table that is all header
    pub fn data_range(&self) -> Result<Option<CellRange>> {
        if self.data_rows()? == 0 {
            return Ok(None);
        }
        let range = self.range()?;
        let start = CellRef::new(self.first_data_row(&range)?, range.start.col)?;
        Ok(Some(CellRange::new(start, range.end)))
    }

    /// Sheet row of the first data row
    fn first_data_row(&self, range: &CellRange) -> Result<u32> {
        range
            .start
            .row
            .checked_add(self.header_row_count())
            .ok_or_else(|| Error::InvalidValue(format!("table '{}' has an out-of-range headerRowCount", self.name())))
    }

    fn set_range(&mut self, range: CellRange) {
        let reference = range.to_string();
        let has_header = self.header_row_count() > 0;
        let tag = self.tag("autoFilter");
        self.root.set_attr("ref", reference.as_str());
        match (self.root.child_mut("autoFilter"), has_header) {
            (Some(filter), _) => filter.set_attr("ref", reference.as_str()),
            (None, true) => {
                let filter = RawXmlElement::new(tag).with_attr("ref", reference);
                self.root.insert_child_ordered(filter, TABLE_ORDER);
            }
            (None, false) => {}
        }
    }

    fn tag(&self, local: &str) -> String {
        match self.root.name.split_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    fn data_rows(&self) -> Result<u32> {
        let range = self.range()?;
        Ok((range.rows()).saturating_sub(self.header_row_count()))
    }
}

/// Read access to a table together with the sheet holding its cells
pub struct TableView<'a> {
    pub(crate) table: &'a Table,
    pub(crate) sheet: &'a WorksheetPart,
    pub(crate) strings: &'a SharedStrings,
}

impl<'a> TableView<'a> {
    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn name(&self) -> &'a str {
        self.table.name()
    }

    pub fn columns(&self) -> Vec<String> {
        self.table.columns()
    }

    pub fn data_range(&self) -> Result<Option<CellRange>> {
        self.table.data_range()
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<CellValue>> {
        column_values(self.table, self.sheet, self.strings, name)
    }

    /// Data rows, each in column order
    pub fn rows(&self) -> Result<Vec<Vec<CellValue>>> {
        row_values(self.table, self.sheet, self.strings)
    }
}

/// Write access to a table and its cells
pub struct TableMut<'a> {
    pub(crate) table: &'a mut Table,
    pub(crate) sheet: &'a mut WorksheetPart,
    pub(crate) strings: &'a mut SharedStrings,
}

impl<'a> TableMut<'a> {
    pub fn table(&self) -> &Table {
        self.table
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn columns(&self) -> Vec<String> {
        self.table.columns()
    }

    pub fn data_range(&self) -> Result<Option<CellRange>> {
        self.table.data_range()
    }

    pub fn column(&self, name: &str) -> Result<Vec<CellValue>> {
        column_values(self.table, self.sheet, self.strings, name)
    }

    pub fn rows(&self) -> Result<Vec<Vec<CellValue>>> {
        row_values(self.table, self.sheet, self.strings)
    }

    /// Append a data row below the table, extending its reference by one row
    pub fn add_row(&mut self, values: &[(&str, CellValue)]) -> Result<()> {
        let range = self.table.range()?;
        let end = CellRef::new(range.end.row + 1, range.end.col)?;
        self.table.set_range(CellRange::new(range.start, end));
        let index = self.table.data_rows()?;
        self.update_row(index, values)
    }

    /// Overwrite cells of data row `index` (1-based); unknown column names are skipped
    pub fn update_row(&mut self, index: u32, values: &[(&str, CellValue)]) -> Result<()> {
        let rows = self.table.data_rows()?;
        if index == 0 || index > rows {
            return Err(Error::InvalidIndex(format!(
                "table row {} out of range 1..={}",
                index, rows
            )));
        }
        let range = self.table.range()?;
        let row = self.table.first_data_row(&range)? + index - 1;
        for (name, value) in values {
            let Some(col) = self.table.column_index(name) else {
                log::debug!("table '{}' has no column '{}'", self.table.name(), name);
                continue;
            };
            let at = CellRef::new(row, range.start.col + col as u32)?;
            self.sheet.set_value(&at, value.clone(), self.strings)?;
        }
        Ok(())
    }

    /// Remove data row `index` (1-based): rows below move up one and the reference shrinks.
    ///
    /// A table keeps at least one data row; deleting the last one only clears it.
    pub fn delete_row(&mut self, index: u32) -> Result<()> {
        let rows = self.table.data_rows()?;
        if index == 0 || index > rows {
            return Err(Error::InvalidIndex(format!(
                "table row {} out of range 1..={}",
                index, rows
            )));
        }
        let range = self.table.range()?;
        let first = self.table.first_data_row(&range)?;
        for row in (first + index - 1)..range.end.row {
            for col in range.start.col..=range.end.col {
                let below = CellRef::new(row + 1, col)?;
                let target = CellRef::new(row, col)?;
                let moved = self.sheet.cell(&below).cloned();
                let cell = self.sheet.cell_entry(&target);
                match moved {
                    Some(mut source) => {
                        source.reference = target.to_string();
                        *cell = source;
                    }
                    None => cell.clear(),
                }
            }
        }
        for col in range.start.col..=range.end.col {
            if let Some(cell) = self.sheet.cell_mut(&CellRef::new(range.end.row, col)?) {
                cell.clear();
            }
        }
        if rows > 1 {
            let end = CellRef::new(range.end.row - 1, range.end.col)?;
            self.table.set_range(CellRange::new(range.start, end));
        }
        Ok(())
    }
}

fn column_values(table: &Table, sheet: &WorksheetPart, strings: &SharedStrings, name: &str) -> Result<Vec<CellValue>> {
    let col = table
        .column_index(name)
        .ok_or_else(|| Error::InvalidReference(format!("table '{}' has no column '{}'", table.name(), name)))?;
    let range = table.range()?;
    let first = table.first_data_row(&range)?;
    (first..=range.end.row)
        .map(|row| Ok(sheet.value(&CellRef::new(row, range.start.col + col as u32)?, strings)))
        .collect()
}

fn row_values(table: &Table, sheet: &WorksheetPart, strings: &SharedStrings) -> Result<Vec<Vec<CellValue>>> {
    let range = table.range()?;
    let first = table.first_data_row(&range)?;
    (first..=range.end.row)
        .map(|row| {
            (range.start.col..=range.end.col)
                .map(|col| Ok(sheet.value(&CellRef::new(row, col)?, strings)))
                .collect()
        })
        .collect()
}

/// Whether `name` can name a table or defined name
pub(crate) fn check_name(field: &str, name: &str) -> Result<()> {
    let valid_start = name
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '\\');
    if !valid_start {
        return Err(Error::validation(field, "must start with a letter, '_' or '\\'", name));
    }
    if name.len() > 255 {
        return Err(Error::validation(field, "longer than 255 characters", name));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '\\')) {
        return Err(Error::validation(field, "contains characters other than letters, digits, '_' and '.'", name));
    }
    if CellRef::parse(name).is_ok() || name.eq_ignore_ascii_case("r") || name.eq_ignore_ascii_case("c") {
        return Err(Error::validation(field, "looks like a cell reference", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup(range: &str) -> (Table, WorksheetPart, SharedStrings) {
        let table = Table::new("xl/tables/table1.xml", "rId1", 1, "Sales", CellRange::parse(range).unwrap());
        (table, WorksheetPart::new(), SharedStrings::default())
    }

    #[test]
    fn test_new_table_columns() {
        let (table, _, _) = setup("B2:D5");
        assert_eq!(table.columns(), vec!["Column1", "Column2", "Column3"]);
        assert_eq!(table.data_range().unwrap().unwrap().to_string(), "B3:D5");
        assert_eq!(table.style_name(), Some("TableStyleMedium2"));
        let out = String::from_utf8(table.to_bytes().unwrap()).unwrap();
        assert!(out.contains(r#"<autoFilter ref="B2:D5"/>"#));
        assert!(out.contains(r#"showRowStripes="1""#));
    }

    #[test]
    fn test_add_update_delete_rows() {
        let (mut table, mut sheet, mut strings) = setup("A1:C3");
        let mut rows = TableMut {
            table: &mut table,
            sheet: &mut sheet,
            strings: &mut strings,
        };
        rows.update_row(1, &[("column1", "Widget".into()), ("Column2", 2.0.into())]).unwrap();
        rows.add_row(&[
            ("Column1", "Gadget".into()),
            ("Column2", 5.0.into()),
            ("Column3", 3.5.into()),
            ("Nope", 1.0.into()),
        ])
        .unwrap();
        assert_eq!(rows.table().reference(), "A1:C4");
        let names = rows.column("Column1").unwrap();
        assert_eq!(names.last(), Some(&CellValue::String("Gadget".into())));
        assert_eq!(names.len(), 3);

        assert_eq!(rows.update_row(4, &[]).unwrap_err().code(), "invalid-index");
        assert_eq!(rows.delete_row(0).unwrap_err().code(), "invalid-index");

        rows.delete_row(1).unwrap();
        assert_eq!(rows.table().reference(), "A1:C3");
        let data = rows.rows().unwrap();
        assert_eq!(data[0], vec![CellValue::Empty, CellValue::Empty, CellValue::Empty]);
        assert_eq!(data[1][0], CellValue::String("Gadget".into()));
        assert_eq!(data[1][2], CellValue::Number(3.5));
    }

    #[test]
    fn test_last_data_row_is_cleared_not_removed() {
        let (mut table, mut sheet, mut strings) = setup("A1:B2");
        let mut rows = TableMut {
            table: &mut table,
            sheet: &mut sheet,
            strings: &mut strings,
        };
        rows.update_row(1, &[("Column1", 9.0.into())]).unwrap();
        rows.delete_row(1).unwrap();
        assert_eq!(rows.table().reference(), "A1:B2");
        assert_eq!(rows.column("Column1").unwrap(), vec![CellValue::Empty]);
    }

    #[test]
    fn test_header_only_table_has_no_data_range() {
        let data = br#"<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="3" name="Empty" ref="A1:C1"><tableColumns count="3"/></table>"#;
        let table = Table::from_bytes("xl/tables/table3.xml", "rId1", data).unwrap();
        assert_eq!(table.data_range().unwrap(), None);

        let data = br#"<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="4" name="Odd" ref="A1:C4" headerRowCount="4294967295"><tableColumns count="1"><tableColumn id="1" name="Column1"/></tableColumns></table>"#;
        let table = Table::from_bytes("xl/tables/table4.xml", "rId2", data).unwrap();
        assert_eq!(table.data_range().unwrap(), None);
        let (sheet, strings) = (WorksheetPart::new(), SharedStrings::default());
        let err = column_values(&table, &sheet, &strings, "Column1").unwrap_err();
        assert_eq!(err.code(), "invalid-value");
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("name", "Sales_2024").is_ok());
        assert!(check_name("name", "_hidden").is_ok());
        for bad in ["", "1st", "A1", "has space", "R", "xfd100"] {
            assert_eq!(check_name("name", bad).unwrap_err().code(), "validation", "{}", bad);
        }
    }
}
