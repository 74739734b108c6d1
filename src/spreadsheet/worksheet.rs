//! Worksheet part (xl/worksheets/sheetN.xml)
//!
//! Rows and cells are parsed into typed models; every other child of the
//! worksheet element is kept as a raw tree and written back in place.

use crate::error::{Error, Result};
use crate::spreadsheet::cell::{format_number, Cell, CellType, CellValue, Formula, Row};
use crate::spreadsheet::cell_ref::{CellRange, CellRef};
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::xml::{self, RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::BufRead;

/// Schema order of worksheet children
pub(crate) const WORKSHEET_ORDER: &[&str] = &[
    "sheetPr",
    "dimension",
    "sheetViews",
    "sheetFormatPr",
    "cols",
    "sheetData",
    "sheetCalcPr",
    "sheetProtection",
    "protectedRanges",
    "scenarios",
    "autoFilter",
    "sortState",
    "dataConsolidate",
    "customSheetViews",
    "mergeCells",
    "phoneticPr",
    "conditionalFormatting",
    "dataValidations",
    "hyperlinks",
    "printOptions",
    "pageMargins",
    "pageSetup",
    "headerFooter",
    "rowBreaks",
    "colBreaks",
    "customProperties",
    "cellWatches",
    "ignoredErrors",
    "smartTags",
    "drawing",
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

/// A parsed worksheet
#[derive(Clone, Debug)]
pub struct WorksheetPart {
    /// Worksheet element; `sheetData` is kept as an empty placeholder
    root: RawXmlElement,
    /// Rows in ascending order
    rows: Vec<Row>,
    /// Element prefix with colon, empty for the default namespace
    prefix: String,
}

impl Default for WorksheetPart {
    fn default() -> Self {
        Self::new()
    }
}

fn col_of(cell: &Cell) -> u32 {
    CellRef::parse(&cell.reference).map_or(0, |r| r.col)
}

impl WorksheetPart {
    /// An empty sheet with default view, row height and margins
    pub fn new() -> Self {
        let root = RawXmlElement::new("worksheet")
            .with_attr("xmlns", xml::S)
            .with_attr("xmlns:r", xml::R)
            .with_child(RawXmlElement::new("dimension").with_attr("ref", "A1"))
            .with_child(
                RawXmlElement::new("sheetViews").with_child(
                    RawXmlElement::new("sheetView").with_attr("workbookViewId", "0"),
                ),
            )
            .with_child(RawXmlElement::new("sheetFormatPr").with_attr("defaultRowHeight", "15"))
            .with_child(RawXmlElement::new("sheetData"))
            .with_child(
                RawXmlElement::new("pageMargins")
                    .with_attr("left", "0.7")
                    .with_attr("right", "0.7")
                    .with_attr("top", "0.75")
                    .with_attr("bottom", "0.75")
                    .with_attr("header", "0.3")
                    .with_attr("footer", "0.3"),
            );
        WorksheetPart {
            root,
            rows: Vec::new(),
            prefix: String::new(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"worksheet" => {
                    let e = e.into_owned();
                    return Self::from_reader(&mut reader, &e);
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"worksheet" => {
                    let mut root = RawXmlElement::from_empty(&e);
                    let prefix = prefix_of(&root.name);
                    root.push_child(RawXmlElement::new(format!("{}sheetData", prefix)));
                    return Ok(WorksheetPart {
                        root,
                        rows: Vec::new(),
                        prefix,
                    });
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(Error::InvalidFormat(format!(
                        "expected worksheet, found {}",
                        String::from_utf8_lossy(e.name().as_ref())
                    )))
                }
                Event::Eof => return Err(Error::InvalidFormat("missing worksheet element".into())),
                _ => {}
            }
            buf.clear();
        }
    }

    fn from_reader<R: BufRead>(reader: &mut quick_xml::Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut root = RawXmlElement::from_empty(start);
        root.self_closing = false;
        let prefix = prefix_of(&root.name);
        let mut rows: Vec<Row> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"sheetData" => {
                        let e = e.into_owned();
                        read_sheet_data(reader, &mut rows)?;
                        root.push_child(RawXmlElement::from_empty(&e));
                    }
                    _ => root.push_child(RawXmlElement::from_reader(reader, &e)?),
                },
                Event::Empty(e) => root.push_child(RawXmlElement::from_empty(&e)),
                Event::Text(t) => {
                    let text = t.unescape()?.to_string();
                    if !text.trim().is_empty() {
                        root.children.push(RawXmlNode::Text(text));
                    }
                }
                Event::End(e) if e.name().local_name().as_ref() == b"worksheet" => break,
                Event::Eof => return Err(Error::InvalidFormat("unexpected end of XML in worksheet".into())),
                _ => {}
            }
            buf.clear();
        }

        if root.child("sheetData").is_none() {
            return Err(Error::InvalidFormat("worksheet has no sheetData".into()));
        }
        rows.sort_by_key(|r| r.index);
        rows.dedup_by_key(|r| r.index);
        Ok(WorksheetPart { root, rows, prefix })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let dimension = self
            .used_range()
            .map_or_else(|| "A1".to_string(), |r| r.to_string());
        xml::write_part(|writer| {
            let mut start = BytesStart::new(self.root.name.as_str());
            for (key, value) in &self.root.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Start(start))?;
            for child in &self.root.children {
                match child {
                    RawXmlNode::Element(e) if e.local_name() == "sheetData" => {
                        let mut data = BytesStart::new(e.name.as_str());
                        for (key, value) in &e.attributes {
                            data.push_attribute((key.as_str(), value.as_str()));
                        }
                        if self.rows.is_empty() {
                            writer.write_event(Event::Empty(data))?;
                            continue;
                        }
                        writer.write_event(Event::Start(data))?;
                        for row in &self.rows {
                            row.write_to(writer, &self.prefix)?;
                        }
                        writer.write_event(Event::End(BytesEnd::new(e.name.as_str())))?;
                    }
                    RawXmlNode::Element(e) if e.local_name() == "dimension" => {
                        let mut dim = e.clone();
                        dim.set_attr("ref", dimension.as_str());
                        dim.write_to(writer)?;
                    }
                    other => other.write_to(writer)?,
                }
            }
            writer.write_event(Event::End(BytesEnd::new(self.root.name.as_str())))?;
            Ok(())
        })
    }

    /// Qualified name for a worksheet element
    pub(crate) fn tag(&self, local: &str) -> String {
        format!("{}{}", self.prefix, local)
    }

    /// First child element with the given local name
    pub(crate) fn element(&self, local: &str) -> Option<&RawXmlElement> {
        self.root.child(local)
    }

    /// Child with the given local name, inserted in schema order when absent
    pub(crate) fn element_or_insert(&mut self, local: &str) -> &mut RawXmlElement {
        if self.root.child(local).is_none() {
            let elem = RawXmlElement::new(self.tag(local));
            self.root.insert_child_ordered(elem, WORKSHEET_ORDER);
        }
        match self.root.child_mut(local) {
            Some(elem) => elem,
            None => unreachable!(),
        }
    }

    /// Point `drawing`, `legacyDrawing` or a similar element at a relationship
    pub(crate) fn link_element(&mut self, local: &str, rel_id: &str) {
        let prefix = self.root.prefix_for(xml::R, "r");
        let elem = self.element_or_insert(local);
        elem.attributes.retain(|(k, _)| xml::local_name(k) != "id");
        elem.set_attr(&format!("{}:id", prefix), rel_id);
    }

    /// Append a `tablePart` pointing at `rel_id` and keep the count in step
    pub(crate) fn add_table_part(&mut self, rel_id: &str) {
        let prefix = self.root.prefix_for(xml::R, "r");
        let tag = self.tag("tablePart");
        let parts = self.element_or_insert("tableParts");
        parts.push_child(RawXmlElement::new(tag).with_attr(format!("{}:id", prefix), rel_id));
        let count = parts.elements().count();
        parts.set_attr("count", count.to_string());
    }

    pub(crate) fn remove_element(&mut self, local: &str) {
        self.root.remove_children(local);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn cell(&self, at: &CellRef) -> Option<&Cell> {
        let row = self
            .rows
            .binary_search_by_key(&at.row, |r| r.index)
            .ok()
            .map(|i| &self.rows[i])?;
        row.cells.iter().find(|c| col_of(c) == at.col)
    }

    pub fn cell_mut(&mut self, at: &CellRef) -> Option<&mut Cell> {
        let i = self.rows.binary_search_by_key(&at.row, |r| r.index).ok()?;
        self.rows[i].cells.iter_mut().find(|c| col_of(c) == at.col)
    }

    /// Cell at `at`, inserting an empty one (and its row) in order when absent
    pub fn cell_entry(&mut self, at: &CellRef) -> &mut Cell {
        let row_pos = match self.rows.binary_search_by_key(&at.row, |r| r.index) {
            Ok(i) => i,
            Err(i) => {
                self.rows.insert(i, Row::new(at.row));
                i
            }
        };
        let row = &mut self.rows[row_pos];
        let cell_pos = match row.cells.iter().position(|c| col_of(c) >= at.col) {
            Some(i) if col_of(&row.cells[i]) == at.col => i,
            Some(i) => {
                row.cells.insert(i, Cell::new(at.to_string()));
                i
            }
            None => {
                row.cells.push(Cell::new(at.to_string()));
                row.cells.len() - 1
            }
        };
        &mut row.cells[cell_pos]
    }

    /// Value of a cell with shared strings resolved
    pub fn value(&self, at: &CellRef, strings: &SharedStrings) -> CellValue {
        self.cell(at).map_or(CellValue::Empty, |c| c.resolve(strings))
    }

    /// Write a value; strings go through the shared-string table and any formula is dropped
    pub fn set_value(&mut self, at: &CellRef, value: CellValue, strings: &mut SharedStrings) -> Result<()> {
        if let CellValue::Number(n) = value {
            if !n.is_finite() {
                return Err(Error::InvalidValue(format!("cannot store {} in cell {}", n, at)));
            }
        }
        let cell = self.cell_entry(at);
        cell.clear();
        match value {
            CellValue::Empty => {}
            CellValue::String(s) => {
                cell.cell_type = Some(CellType::SharedString);
                cell.value = Some(strings.add(&s).to_string());
            }
            CellValue::Number(n) => cell.value = Some(format_number(n)),
            CellValue::Bool(b) => {
                cell.cell_type = Some(CellType::Bool);
                cell.value = Some(if b { "1" } else { "0" }.to_string());
            }
            CellValue::Error(e) => {
                cell.cell_type = Some(CellType::Error);
                cell.value = Some(e);
            }
        }
        Ok(())
    }

    /// Store a formula without a cached result; a leading `=` is dropped
    pub fn set_formula(&mut self, at: &CellRef, formula: &str) -> Result<()> {
        let text = formula.strip_prefix('=').unwrap_or(formula).trim();
        if text.is_empty() {
            return Err(Error::validation("formula", "formula cannot be empty", formula));
        }
        let cell = self.cell_entry(at);
        cell.clear();
        cell.formula = Some(Formula {
            text: text.to_string(),
            attrs: Vec::new(),
        });
        Ok(())
    }

    /// Smallest range covering every cell that holds something
    pub fn used_range(&self) -> Option<CellRange> {
        let mut range: Option<CellRange> = None;
        for cell in self.rows.iter().flat_map(|r| &r.cells) {
            if cell.value.is_none() && cell.formula.is_none() && cell.inline_string.is_none() {
                continue;
            }
            let Ok(at) = CellRef::parse(&cell.reference) else {
                continue;
            };
            let single = CellRange::new(at, at);
            range = Some(match range {
                Some(r) => r.union(&single),
                None => single,
            });
        }
        range
    }

    /// Number of cells referring to the shared-string table
    pub(crate) fn shared_string_refs(&self) -> u32 {
        self.rows
            .iter()
            .flat_map(|r| &r.cells)
            .filter(|c| c.cell_type == Some(CellType::SharedString))
            .count() as u32
    }

    pub fn merged_cells(&self) -> Vec<CellRange> {
        self.root
            .child("mergeCells")
            .into_iter()
            .flat_map(|m| m.elements())
            .filter_map(|m| CellRange::parse(m.attr("ref")?).ok())
            .collect()
    }

    /// Merge a range; it must span two cells or more and overlap no existing merge
    pub fn add_merge(&mut self, range: CellRange) -> Result<()> {
        if range.rows() == 1 && range.cols() == 1 {
            return Err(Error::validation("range", "a merge needs at least two cells", range.to_string()));
        }
        if let Some(existing) = self.merged_cells().into_iter().find(|m| m.intersects(&range)) {
            return Err(Error::validation(
                "range",
                format!("overlaps merged range {}", existing),
                range.to_string(),
            ));
        }
        let item = RawXmlElement::new(self.tag("mergeCell")).with_attr("ref", range.to_string());
        let merges = self.element_or_insert("mergeCells");
        merges.push_child(item);
        let count = merges.elements().count();
        merges.set_attr("count", count.to_string());
        Ok(())
    }

    /// Remove a merge given exactly as it was added
    pub fn remove_merge(&mut self, range: CellRange) -> Result<()> {
        let wanted = range.to_string();
        let Some(merges) = self.root.child_mut("mergeCells") else {
            return Err(Error::InvalidReference(format!("{} is not merged", wanted)));
        };
        let before = merges.children.len();
        merges.children.retain(|node| match node {
            RawXmlNode::Element(e) => {
                e.attr("ref").and_then(|r| CellRange::parse(r).ok()).map(|r| r.to_string()).as_deref()
                    != Some(wanted.as_str())
            }
            _ => true,
        });
        if merges.children.len() == before {
            return Err(Error::InvalidReference(format!("{} is not merged", wanted)));
        }
        let count = merges.elements().count();
        if count == 0 {
            self.root.remove_children("mergeCells");
        } else {
            merges.set_attr("count", count.to_string());
        }
        Ok(())
    }
}

/// Element prefix with colon, e.g. `x:` for `x:worksheet`
fn prefix_of(name: &str) -> String {
    match name.split_once(':') {
        Some((prefix, _)) => format!("{}:", prefix),
        None => String::new(),
    }
}

fn read_sheet_data<R: BufRead>(reader: &mut quick_xml::Reader<R>, rows: &mut Vec<Row>) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().local_name().as_ref() == b"row" => {
                let fallback = rows.last().map_or(1, |r| r.index.saturating_add(1));
                rows.push(Row::from_reader(reader, &e, fallback)?);
            }
            Event::Empty(e) if e.name().local_name().as_ref() == b"row" => {
                let fallback = rows.last().map_or(1, |r| r.index.saturating_add(1));
                rows.push(Row::from_empty(&e, fallback));
            }
            Event::Start(e) => xml::skip_element(reader, &e)?,
            Event::End(e) if e.name().local_name().as_ref() == b"sheetData" => break,
            Event::Eof => return Err(Error::InvalidFormat("unexpected end of XML in sheetData".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}
