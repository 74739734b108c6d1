//! Per-sheet state and the borrowed handles callers use to read and edit a sheet

use crate::drawing::{self as dml, GraphicKind};
use crate::error::{Error, Result};
use crate::opc::{content_types, rel_types, AddMode, Package, TargetMode};
use crate::spreadsheet::cell::{Cell, CellKind, CellValue, Row};
use crate::spreadsheet::cell_ref::{CellRange, CellRef};
use crate::spreadsheet::comments::{CommentsPart, SheetComment};
use crate::spreadsheet::drawing::{self, SheetDrawing};
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::spreadsheet::styles::Stylesheet;
use crate::spreadsheet::table::{Table, TableView};
use crate::spreadsheet::worksheet::WorksheetPart;
use crate::xml::RawXmlElement;

/// Visibility of a sheet tab
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    /// Hidden and not listed in the unhide dialog
    VeryHidden,
}

impl SheetState {
    pub fn parse(s: &str) -> Self {
        match s {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "veryHidden",
        }
    }
}

/// Everything the workbook tracks for one sheet
#[derive(Clone, Debug)]
pub(crate) struct Worksheet {
    /// The `sheet` element of workbook.xml
    pub(crate) entry: RawXmlElement,
    pub(crate) uri: String,
    /// `None` for chartsheets and other sheet kinds kept opaque
    pub(crate) part: Option<WorksheetPart>,
    pub(crate) tables: Vec<Table>,
    pub(crate) comments: Option<CommentsPart>,
    pub(crate) drawing: Option<SheetDrawing>,
}

impl Worksheet {
    pub(crate) fn name(&self) -> &str {
        self.entry.attr("name").unwrap_or_default()
    }

    pub(crate) fn state(&self) -> SheetState {
        self.entry.attr("state").map_or(SheetState::Visible, SheetState::parse)
    }

    pub(crate) fn part(&self) -> Result<&WorksheetPart> {
        self.part
            .as_ref()
            .ok_or_else(|| Error::InvalidValue(format!("'{}' is not a worksheet", self.name())))
    }

    pub(crate) fn part_mut(&mut self) -> Result<&mut WorksheetPart> {
        let name = self.name().to_string();
        self.part
            .as_mut()
            .ok_or_else(|| Error::InvalidValue(format!("'{}' is not a worksheet", name)))
    }

    /// Directory of the sheet part with trailing slash
    fn dir(&self) -> &str {
        match self.uri.rfind('/') {
            Some(i) => &self.uri[..=i],
            None => "",
        }
    }

    /// `xl/` for `xl/worksheets/sheet1.xml`
    pub(crate) fn package_dir(&self) -> String {
        let dir = self.dir().trim_end_matches('/');
        match dir.rfind('/') {
            Some(i) => dir[..=i].to_string(),
            None => String::new(),
        }
    }
}

/// Read access to one sheet
pub struct Sheet<'a> {
    pub(crate) sheet: &'a Worksheet,
    pub(crate) strings: &'a SharedStrings,
    pub(crate) styles: &'a Stylesheet,
}

impl<'a> Sheet<'a> {
    pub fn name(&self) -> &'a str {
        self.sheet.name()
    }

    pub fn state(&self) -> SheetState {
        self.sheet.state()
    }

    /// Part URI of the sheet
    pub fn uri(&self) -> &'a str {
        &self.sheet.uri
    }

    /// Whether this is a worksheet (rather than a chartsheet or similar)
    pub fn is_worksheet(&self) -> bool {
        self.sheet.part.is_some()
    }

    pub fn cell(&self, reference: &str) -> Result<Option<&'a Cell>> {
        let at = CellRef::parse(reference)?;
        Ok(self.sheet.part.as_ref().and_then(|p| p.cell(&at)))
    }

    /// Cell value with shared and inline strings resolved; formulas give their cached result
    pub fn value(&self, reference: &str) -> Result<CellValue> {
        Ok(self
            .cell(reference)?
            .map_or(CellValue::Empty, |c| c.resolve(self.strings)))
    }

    pub fn formula(&self, reference: &str) -> Result<Option<&'a str>> {
        Ok(self
            .cell(reference)?
            .and_then(|c| c.formula.as_ref())
            .map(|f| f.text.as_str()))
    }

    pub fn kind(&self, reference: &str) -> Result<CellKind> {
        Ok(self.cell(reference)?.map_or(CellKind::Empty, Cell::kind))
    }

    /// Cell format index
    pub fn style(&self, reference: &str) -> Result<Option<u32>> {
        Ok(self.cell(reference)?.and_then(|c| c.style))
    }

    /// Format code applied to a cell, when it has a style
    pub fn number_format(&self, reference: &str) -> Result<Option<String>> {
        Ok(self
            .style(reference)?
            .and_then(|xf| self.styles.num_fmt_id(xf))
            .and_then(|id| self.styles.number_format_code(id)))
    }

    pub fn used_range(&self) -> Option<CellRange> {
        self.sheet.part.as_ref().and_then(WorksheetPart::used_range)
    }

    pub fn rows(&self) -> &'a [Row] {
        self.sheet.part.as_ref().map(|p| p.rows()).unwrap_or(&[])
    }

    pub fn merged_cells(&self) -> Vec<CellRange> {
        self.sheet
            .part
            .as_ref()
            .map_or_else(Vec::new, WorksheetPart::merged_cells)
    }

    pub fn comments(&self) -> Vec<SheetComment> {
        self.sheet
            .comments
            .as_ref()
            .map_or_else(Vec::new, CommentsPart::list)
    }

    pub fn comment(&self, reference: &str) -> Result<Option<SheetComment>> {
        let at = CellRef::parse(reference)?;
        Ok(self.sheet.comments.as_ref().and_then(|c| c.get(&at)))
    }

    pub fn tables(&self) -> Vec<TableView<'a>> {
        let Some(part) = self.sheet.part.as_ref() else {
            return Vec::new();
        };
        self.sheet
            .tables
            .iter()
            .map(|table| TableView {
                table,
                sheet: part,
                strings: self.strings,
            })
            .collect()
    }

    /// Number of anchored drawings
    pub fn drawing_count(&self) -> usize {
        self.sheet.drawing.as_ref().map_or(0, SheetDrawing::anchor_count)
    }

    pub fn drawing_kinds(&self) -> Vec<GraphicKind> {
        self.sheet
            .drawing
            .as_ref()
            .map_or_else(Vec::new, SheetDrawing::kinds)
    }
}

/// Write access to one sheet
pub struct SheetMut<'a> {
    pub(crate) sheet: &'a mut Worksheet,
    pub(crate) package: &'a mut Package,
    pub(crate) strings: &'a mut SharedStrings,
    pub(crate) styles: &'a Stylesheet,
}

impl<'a> SheetMut<'a> {
    /// Read-only view of the same sheet
    pub fn view(&self) -> Sheet<'_> {
        Sheet {
            sheet: self.sheet,
            strings: self.strings,
            styles: self.styles,
        }
    }

    pub fn name(&self) -> &str {
        self.sheet.name()
    }

    pub fn value(&self, reference: &str) -> Result<CellValue> {
        self.view().value(reference)
    }

    pub fn set_value(&mut self, reference: &str, value: impl Into<CellValue>) -> Result<()> {
        self.package.ensure_open()?;
        let at = CellRef::parse(reference)?;
        self.sheet.part_mut()?.set_value(&at, value.into(), self.strings)
    }

    /// Store a formula; a leading `=` is optional
    pub fn set_formula(&mut self, reference: &str, formula: &str) -> Result<()> {
        self.package.ensure_open()?;
        let at = CellRef::parse(reference)?;
        self.sheet.part_mut()?.set_formula(&at, formula)
    }

    /// Apply a cell format index from [`Stylesheet::add_style`]
    pub fn set_style(&mut self, reference: &str, xf: u32) -> Result<()> {
        self.package.ensure_open()?;
        let at = CellRef::parse(reference)?;
        let count = self.styles.cell_xf_count();
        if xf >= count {
            return Err(Error::validation(
                "style",
                format!("no cell format {} (have {})", xf, count),
                xf.to_string(),
            ));
        }
        self.sheet.part_mut()?.cell_entry(&at).style = Some(xf);
        Ok(())
    }

    /// Drop the value and formula of a cell; its style stays
    pub fn clear_cell(&mut self, reference: &str) -> Result<()> {
        self.package.ensure_open()?;
        let at = CellRef::parse(reference)?;
        if let Some(cell) = self.sheet.part_mut()?.cell_mut(&at) {
            cell.clear();
        }
        Ok(())
    }

    pub fn merge_cells(&mut self, range: &str) -> Result<()> {
        self.package.ensure_open()?;
        let range = CellRange::parse(range)?;
        self.sheet.part_mut()?.add_merge(range)
    }

    pub fn unmerge_cells(&mut self, range: &str) -> Result<()> {
        self.package.ensure_open()?;
        let range = CellRange::parse(range)?;
        self.sheet.part_mut()?.remove_merge(range)
    }

    /// Attach a note to a cell, replacing an existing one
    pub fn add_comment(&mut self, reference: &str, author: &str, text: &str) -> Result<()> {
        self.package.ensure_open()?;
        let at = CellRef::parse(reference)?;
        self.sheet.part()?;
        if self.sheet.comments.is_none() {
            let dir = self.sheet.package_dir();
            let uri = self.package.next_part_name(&format!("{}comments", dir), "xml");
            let part = CommentsPart::new(uri.as_str());
            self.package
                .add_part(&uri, content_types::SPREADSHEET_COMMENTS, part.to_bytes()?, AddMode::Create)?;
            self.package
                .add_relationship(&self.sheet.uri, rel_types::COMMENTS, &uri, TargetMode::Internal)?;
            self.sheet.comments = Some(part);
        }
        match self.sheet.comments.as_mut() {
            Some(part) => part.add(&at, author, text),
            None => unreachable!(),
        }
    }

    pub fn delete_comment(&mut self, reference: &str) -> Result<()> {
        self.package.ensure_open()?;
        let at = CellRef::parse(reference)?;
        match self.sheet.comments.as_mut() {
            Some(part) => part.delete(&at),
            None => Err(Error::InvalidReference(format!("no comment on {}", at))),
        }
    }

    /// Drawing part of the sheet, created and linked on first use
    fn drawing(&mut self) -> Result<&mut SheetDrawing> {
        if self.sheet.drawing.is_none() {
            if self.sheet.part()?.element("drawing").is_some() {
                return Err(Error::InvalidFormat(format!(
                    "drawing of '{}' could not be read",
                    self.sheet.name()
                )));
            }
            let dir = self.sheet.package_dir();
            let uri = self.package.next_part_name(&format!("{}drawings/drawing", dir), "xml");
            let drawing = SheetDrawing::new(uri.as_str());
            self.package
                .add_part(&uri, content_types::DRAWING, drawing.to_bytes()?, AddMode::Create)?;
            let rel_id = self
                .package
                .add_relationship(&self.sheet.uri, rel_types::DRAWING, &uri, TargetMode::Internal)?;
            self.sheet.part_mut()?.link_element("drawing", &rel_id);
            self.sheet.drawing = Some(drawing);
        }
        match self.sheet.drawing.as_mut() {
            Some(drawing) => Ok(drawing),
            None => unreachable!(),
        }
    }

    /// Anchor a picture between two cells; returns its shape ID
    pub fn add_picture(&mut self, from: &str, to: &str, data: &[u8], ext: &str) -> Result<u32> {
        self.package.ensure_open()?;
        let (from, to) = (CellRef::parse(from)?, CellRef::parse(to)?);
        drawing::check_anchor(&from, &to)?;
        if data.is_empty() {
            return Err(Error::InvalidValue("image data cannot be empty".into()));
        }
        let (content_type, ext) = dml::image_type(ext)?;
        let dir = self.sheet.package_dir();
        let drawing_uri = self.drawing()?.uri().to_string();

        let media = self.package.next_part_name(&format!("{}media/image", dir), &ext);
        self.package
            .add_part(&media, content_type, data.to_vec(), AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&drawing_uri, rel_types::IMAGE, &media, TargetMode::Internal)?;

        let (cx, cy) = drawing::anchor_extent(&from, &to);
        let drawing = self.drawing()?;
        let id = drawing.next_shape_id()?;
        let pic = dml::picture("xdr", id, &format!("Picture {}", id), &rel_id, cx, cy);
        drawing.add_anchor(&from, &to, pic);
        Ok(id)
    }

    /// Anchor a bar chart titled `title`; returns its shape ID
    pub fn add_chart(&mut self, from: &str, to: &str, title: &str) -> Result<u32> {
        self.package.ensure_open()?;
        let (from, to) = (CellRef::parse(from)?, CellRef::parse(to)?);
        drawing::check_anchor(&from, &to)?;
        let dir = self.sheet.package_dir();
        let drawing_uri = self.drawing()?.uri().to_string();

        let chart = self.package.next_part_name(&format!("{}charts/chart", dir), "xml");
        self.package
            .add_part(&chart, content_types::CHART, dml::chart_part(title)?, AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&drawing_uri, rel_types::CHART, &chart, TargetMode::Internal)?;

        let drawing = self.drawing()?;
        let id = drawing.next_shape_id()?;
        let name = if title.is_empty() {
            format!("Chart {}", id)
        } else {
            title.to_string()
        };
        let frame = dml::graphic_frame(
            "xdr",
            id,
            &name,
            dml::graphic(dml::uri::CHART, dml::chart_reference(&rel_id)),
            (0, 0, 0, 0),
        );
        drawing.add_anchor(&from, &to, frame);
        Ok(id)
    }

    /// Anchor a one-node diagram; returns its shape ID
    pub fn add_diagram(&mut self, from: &str, to: &str) -> Result<u32> {
        self.package.ensure_open()?;
        let (from, to) = (CellRef::parse(from)?, CellRef::parse(to)?);
        drawing::check_anchor(&from, &to)?;
        let dir = format!("{}diagrams/", self.sheet.package_dir());
        let drawing_uri = self.drawing()?.uri().to_string();

        let parts = dml::diagram_parts()?;
        let package = &mut *self.package;
        let mut add = |name: &str, content_type: &str, rel_type: &str, data: Vec<u8>| -> Result<String> {
            let uri = package.next_part_name(&format!("{}{}", dir, name), "xml");
            package.add_part(&uri, content_type, data, AddMode::Create)?;
            package.add_relationship(&drawing_uri, rel_type, &uri, TargetMode::Internal)
        };
        let ids = dml::DiagramRelIds {
            data: add("data", content_types::DIAGRAM_DATA, rel_types::DIAGRAM_DATA, parts.data)?,
            layout: add("layout", content_types::DIAGRAM_LAYOUT, rel_types::DIAGRAM_LAYOUT, parts.layout)?,
            style: add("quickStyle", content_types::DIAGRAM_STYLE, rel_types::DIAGRAM_STYLE, parts.style)?,
            colors: add("colors", content_types::DIAGRAM_COLORS, rel_types::DIAGRAM_COLORS, parts.colors)?,
        };

        let drawing = self.drawing()?;
        let id = drawing.next_shape_id()?;
        let frame = dml::graphic_frame(
            "xdr",
            id,
            &format!("Diagram {}", id),
            dml::graphic(dml::uri::DIAGRAM, dml::diagram_reference(&ids)),
            (0, 0, 0, 0),
        );
        drawing.add_anchor(&from, &to, frame);
        Ok(id)
    }
}
