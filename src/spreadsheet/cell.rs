//! Cells (c) and rows (row) of a worksheet

use crate::error::{Error, Result};
use crate::spreadsheet::cell_ref::{column_name, CellRef};
use crate::spreadsheet::shared_strings::{self, SharedStrings};
use crate::xml::{self, RawXmlElement};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt;
use std::io::BufRead;

/// The `t` attribute of a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellType {
    Bool,
    Number,
    Error,
    SharedString,
    /// Formula result string
    String,
    InlineString,
}

impl CellType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "b" => Some(CellType::Bool),
            "n" => Some(CellType::Number),
            "e" => Some(CellType::Error),
            "s" => Some(CellType::SharedString),
            "str" => Some(CellType::String),
            "inlineStr" => Some(CellType::InlineString),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Bool => "b",
            CellType::Number => "n",
            CellType::Error => "e",
            CellType::SharedString => "s",
            CellType::String => "str",
            CellType::InlineString => "inlineStr",
        }
    }
}

/// What a cell holds, as seen by callers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    String,
    Number,
    Bool,
    Error,
    Formula,
}

/// A cell value
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    String(String),
    Number(f64),
    Bool(bool),
    /// Error literal such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::String(s) | CellValue::Error(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// Shortest text that reads back as the same number; integral values have no fraction
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A formula (f) with its attributes, e.g. shared formula markers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Formula {
    pub text: String,
    pub attrs: Vec<(String, String)>,
}

/// A cell (c)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    /// A1 reference
    pub reference: String,
    /// Index into cellXfs
    pub style: Option<u32>,
    pub cell_type: Option<CellType>,
    pub formula: Option<Formula>,
    /// Raw value text (v)
    pub value: Option<String>,
    /// Inline rich string (is)
    pub inline_string: Option<RawXmlElement>,
    /// Unknown attributes (preserved)
    pub unknown_attrs: Vec<(String, String)>,
    /// Unknown children, e.g. extLst (preserved)
    pub unknown_children: Vec<RawXmlElement>,
}

impl Cell {
    pub fn new(reference: impl Into<String>) -> Self {
        Cell {
            reference: reference.into(),
            ..Default::default()
        }
    }

    fn with_attributes(start: &BytesStart) -> Self {
        let mut cell = Cell::default();
        for (key, value) in xml::attributes_of(start) {
            match key.as_str() {
                "r" => cell.reference = value,
                "s" => match value.parse() {
                    Ok(s) => cell.style = Some(s),
                    Err(_) => cell.unknown_attrs.push((key, value)),
                },
                "t" => match CellType::parse(&value) {
                    Some(t) => cell.cell_type = Some(t),
                    None => cell.unknown_attrs.push((key, value)),
                },
                _ => cell.unknown_attrs.push((key, value)),
            }
        }
        cell
    }

    /// Parse from reader (after c start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut cell = Cell::with_attributes(start);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"f" => {
                        let attrs = xml::attributes_of(&e);
                        let text = xml::read_text(reader, &e)?;
                        cell.formula = Some(Formula { text, attrs });
                    }
                    b"v" => cell.value = Some(xml::read_text(reader, &e)?),
                    b"is" => cell.inline_string = Some(RawXmlElement::from_reader(reader, &e)?),
                    _ => cell.unknown_children.push(RawXmlElement::from_reader(reader, &e)?),
                },
                Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"f" => {
                        cell.formula = Some(Formula {
                            text: String::new(),
                            attrs: xml::attributes_of(&e),
                        })
                    }
                    b"v" => cell.value = Some(String::new()),
                    b"is" => cell.inline_string = Some(RawXmlElement::from_empty(&e)),
                    _ => cell.unknown_children.push(RawXmlElement::from_empty(&e)),
                },
                Event::End(e) if e.name().local_name().as_ref() == b"c" => break,
                Event::Eof => return Err(Error::InvalidFormat("unexpected end of XML in cell".into())),
                _ => {}
            }
            buf.clear();
        }

        Ok(cell)
    }

    /// Create from empty element
    pub fn from_empty(start: &BytesStart) -> Self {
        Cell::with_attributes(start)
    }

    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>, prefix: &str) -> Result<()> {
        let tag = |local: &str| format!("{}{}", prefix, local);
        let name = tag("c");
        let mut start = BytesStart::new(name.as_str());
        start.push_attribute(("r", self.reference.as_str()));
        let style = self.style.map(|s| s.to_string());
        if let Some(s) = &style {
            start.push_attribute(("s", s.as_str()));
        }
        if let Some(t) = self.cell_type {
            start.push_attribute(("t", t.as_str()));
        }
        for (key, value) in &self.unknown_attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.formula.is_none()
            && self.value.is_none()
            && self.inline_string.is_none()
            && self.unknown_children.is_empty()
        {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(formula) = &self.formula {
            let f = tag("f");
            let mut elem = BytesStart::new(f.as_str());
            for (key, value) in &formula.attrs {
                elem.push_attribute((key.as_str(), value.as_str()));
            }
            if formula.text.is_empty() {
                writer.write_event(Event::Empty(elem))?;
            } else {
                writer.write_event(Event::Start(elem))?;
                writer.write_event(Event::Text(BytesText::new(&formula.text)))?;
                writer.write_event(Event::End(BytesEnd::new(f.as_str())))?;
            }
        }
        if let Some(value) = &self.value {
            xml::write_text_element(writer, &tag("v"), value)?;
        }
        if let Some(inline) = &self.inline_string {
            inline.write_to(writer)?;
        }
        for child in &self.unknown_children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }

    /// What the cell holds
    pub fn kind(&self) -> CellKind {
        if self.formula.is_some() {
            return CellKind::Formula;
        }
        match self.cell_type {
            Some(CellType::SharedString | CellType::String | CellType::InlineString) => CellKind::String,
            Some(CellType::Bool) => CellKind::Bool,
            Some(CellType::Error) => CellKind::Error,
            Some(CellType::Number) | None if self.value.is_some() => CellKind::Number,
            _ => CellKind::Empty,
        }
    }

    /// Value with shared strings resolved; formulas yield their cached result
    pub fn resolve(&self, strings: &SharedStrings) -> CellValue {
        let raw = self.value.as_deref();
        match self.cell_type {
            Some(CellType::SharedString) => raw
                .and_then(|v| v.trim().parse::<u32>().ok())
                .and_then(|i| strings.get(i))
                .map_or(CellValue::Empty, |s| CellValue::String(s.to_string())),
            Some(CellType::InlineString) => match &self.inline_string {
                Some(is) => CellValue::String(shared_strings::item_text(is)),
                None => CellValue::String(raw.unwrap_or_default().to_string()),
            },
            Some(CellType::String) => CellValue::String(raw.unwrap_or_default().to_string()),
            Some(CellType::Bool) => match raw {
                Some(v) => CellValue::Bool(xml::parse_bool_str(v.trim())),
                None => CellValue::Empty,
            },
            Some(CellType::Error) => raw.map_or(CellValue::Empty, |v| CellValue::Error(v.to_string())),
            Some(CellType::Number) | None => match raw.map(str::trim) {
                Some(v) if !v.is_empty() => match v.parse::<f64>() {
                    Ok(n) => CellValue::Number(n),
                    Err(_) => CellValue::String(v.to_string()),
                },
                _ => CellValue::Empty,
            },
        }
    }

    /// Drop value, formula and type; style and unknown content stay
    pub fn clear(&mut self) {
        self.cell_type = None;
        self.formula = None;
        self.value = None;
        self.inline_string = None;
    }
}

/// A row (row) holding cells in column order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    /// 1-based row number
    pub index: u32,
    pub cells: Vec<Cell>,
    /// Attributes other than `r` (spans, ht, customHeight, ...)
    pub attrs: Vec<(String, String)>,
    /// Unknown children (preserved)
    pub unknown_children: Vec<RawXmlElement>,
}

impl Row {
    pub fn new(index: u32) -> Self {
        Row {
            index,
            ..Default::default()
        }
    }

    fn with_attributes(start: &BytesStart, fallback: u32) -> Self {
        let mut row = Row::new(fallback);
        for (key, value) in xml::attributes_of(start) {
            match (key.as_str(), value.parse()) {
                ("r", Ok(r)) => row.index = r,
                _ => row.attrs.push((key, value)),
            }
        }
        row
    }

    /// Parse from reader (after row start tag); `fallback` numbers a row without `r`
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart, fallback: u32) -> Result<Self> {
        let mut row = Row::with_attributes(start, fallback);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"c" => {
                        let cell = Cell::from_reader(reader, &e)?;
                        row.push_cell(cell);
                    }
                    _ => row.unknown_children.push(RawXmlElement::from_reader(reader, &e)?),
                },
                Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"c" => {
                        let cell = Cell::from_empty(&e);
                        row.push_cell(cell);
                    }
                    _ => row.unknown_children.push(RawXmlElement::from_empty(&e)),
                },
                Event::End(e) if e.name().local_name().as_ref() == b"row" => break,
                Event::Eof => return Err(Error::InvalidFormat("unexpected end of XML in row".into())),
                _ => {}
            }
            buf.clear();
        }

        Ok(row)
    }

    pub fn from_empty(start: &BytesStart, fallback: u32) -> Self {
        Row::with_attributes(start, fallback)
    }

    /// Append a parsed cell, numbering it after its left neighbour when `r` is missing
    fn push_cell(&mut self, mut cell: Cell) {
        if cell.reference.is_empty() {
            let col = self
                .cells
                .last()
                .and_then(|c| CellRef::parse(&c.reference).ok())
                .map_or(1, |c| c.col + 1);
            cell.reference = format!("{}{}", column_name(col), self.index);
        }
        self.cells.push(cell);
    }

    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>, prefix: &str) -> Result<()> {
        let name = format!("{}row", prefix);
        let mut start = BytesStart::new(name.as_str());
        let index = self.index.to_string();
        start.push_attribute(("r", index.as_str()));
        for (key, value) in &self.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.cells.is_empty() && self.unknown_children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for cell in &self.cells {
            cell.write_to(writer, prefix)?;
        }
        for child in &self.unknown_children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_row(data: &str) -> Row {
        let mut reader = xml::reader_from_bytes(data.as_bytes());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) => {
                    let e = e.into_owned();
                    return Row::from_reader(&mut reader, &e, 1).unwrap();
                }
                Event::Eof => panic!("no row"),
                _ => {}
            }
            buf.clear();
        }
    }

    #[test]
    fn test_parse_cell_kinds() {
        let row = parse_row(
            r#"<row r="4" spans="1:5"><c r="A4" s="2"><v>10.5</v></c><c r="B4" t="s"><v>0</v></c><c r="C4" t="b"><v>1</v></c><c r="D4"><f>A4*2</f><v>21</v></c><c r="E4" t="inlineStr"><is><t>inline</t></is></c></row>"#,
        );
        assert_eq!(row.index, 4);
        assert_eq!(row.attrs, vec![("spans".to_string(), "1:5".to_string())]);
        let kinds: Vec<CellKind> = row.cells.iter().map(Cell::kind).collect();
        assert_eq!(
            kinds,
            vec![CellKind::Number, CellKind::String, CellKind::Bool, CellKind::Formula, CellKind::String]
        );

        let mut strings = SharedStrings::default();
        strings.add("shared");
        assert_eq!(row.cells[0].resolve(&strings), CellValue::Number(10.5));
        assert_eq!(row.cells[0].style, Some(2));
        assert_eq!(row.cells[1].resolve(&strings), CellValue::String("shared".into()));
        assert_eq!(row.cells[2].resolve(&strings), CellValue::Bool(true));
        assert_eq!(row.cells[3].formula.as_ref().unwrap().text, "A4*2");
        assert_eq!(row.cells[4].resolve(&strings), CellValue::String("inline".into()));
    }

    #[test]
    fn test_missing_cell_references_are_inferred() {
        let row = parse_row(r#"<row r="7"><c><v>1</v></c><c><v>2</v></c></row>"#);
        let refs: Vec<&str> = row.cells.iter().map(|c| c.reference.as_str()).collect();
        assert_eq!(refs, vec!["A7", "B7"]);
    }

    #[test]
    fn test_write_cell() {
        let cell = Cell {
            reference: "A3".into(),
            formula: Some(Formula {
                text: "A1+A2".into(),
                attrs: Vec::new(),
            }),
            ..Default::default()
        };
        let mut writer = Writer::new(Vec::new());
        cell.write_to(&mut writer, "").unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            r#"<c r="A3"><f>A1+A2</f></c>"#
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
    }
}
