//! Workbook - high-level API for XLSX packages

use crate::drawing as dml;
use crate::error::{Error, Result};
use crate::opc::{content_types, rel_types, well_known, AddMode, CoreProperties, Package, TargetMode};
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell_ref::{CellRange, CellRef};
use crate::spreadsheet::comments::CommentsPart;
use crate::spreadsheet::drawing::SheetDrawing;
use crate::spreadsheet::named_range::{self, NamedRange};
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::spreadsheet::sheet::{Sheet, SheetMut, SheetState, Worksheet};
use crate::spreadsheet::styles::{CellStyle, Stylesheet};
use crate::spreadsheet::table::{check_name, Table, TableMut, TableView};
use crate::spreadsheet::worksheet::WorksheetPart;
use crate::xml::{self, RawXmlElement};
use std::path::Path;

/// Schema order of workbook children
const WORKBOOK_ORDER: &[&str] = &[
    "fileVersion",
    "fileSharing",
    "workbookPr",
    "workbookProtection",
    "bookViews",
    "sheets",
    "functionGroups",
    "externalReferences",
    "definedNames",
    "calcPr",
    "oleSize",
    "customWorkbookViews",
    "pivotCaches",
    "smartTagPr",
    "smartTagTypes",
    "webPublishing",
    "fileRecoveryPr",
    "webPublishObjects",
    "extLst",
];

const MAX_SHEET_NAME: usize = 31;
const SHEET_NAME_FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// An XLSX workbook
#[derive(Debug)]
pub struct Workbook {
    package: Package,
    /// Workbook part name
    uri: String,
    /// Workbook element; `sheets` and `definedNames` are rebuilt on save
    root: RawXmlElement,
    sheets: Vec<Worksheet>,
    names: Vec<NamedRange>,
    strings: SharedStrings,
    styles: Stylesheet,
    /// Write the stylesheet on save (loaded, created or edited)
    keep_styles: bool,
    /// Write the shared-string table on save even when empty
    keep_strings: bool,
    /// `None` once the ID space is used up
    next_sheet_id: Option<u32>,
    next_table_id: Option<u32>,
    /// Write core properties on first save
    seed_core_properties: bool,
}

impl Workbook {
    /// A workbook with one empty sheet named `Sheet1`
    pub fn new() -> Result<Self> {
        let mut package = Package::new();
        let uri = well_known::WORKBOOK.to_string();
        let root = RawXmlElement::new("workbook")
            .with_attr("xmlns", xml::S)
            .with_attr("xmlns:r", xml::R)
            .with_child(RawXmlElement::new("workbookPr").with_attr("defaultThemeVersion", "164011"))
            .with_child(
                RawXmlElement::new("bookViews").with_child(
                    RawXmlElement::new("workbookView")
                        .with_attr("xWindow", "0")
                        .with_attr("yWindow", "0")
                        .with_attr("windowWidth", "28800")
                        .with_attr("windowHeight", "12300"),
                ),
            )
            .with_child(RawXmlElement::new("sheets"))
            .with_child(RawXmlElement::new("calcPr").with_attr("calcId", "191029"));

        package.add_part(&uri, content_types::WORKBOOK, root.to_xml_bytes()?, AddMode::Create)?;
        package.add_relationship("", rel_types::OFFICE_DOCUMENT, &uri, TargetMode::Internal)?;
        package.add_part(
            well_known::XL_THEME,
            content_types::THEME,
            dml::theme_part("Office Theme")?,
            AddMode::Create,
        )?;
        package.add_relationship(&uri, rel_types::THEME, well_known::XL_THEME, TargetMode::Internal)?;

        let mut book = Workbook {
            package,
            uri,
            root,
            sheets: Vec::new(),
            names: Vec::new(),
            strings: SharedStrings::default(),
            styles: Stylesheet::default(),
            keep_styles: true,
            keep_strings: true,
            next_sheet_id: Some(1),
            next_table_id: Some(1),
            seed_core_properties: true,
        };
        book.add_sheet("Sheet1")?;
        Ok(book)
    }

    /// Open a workbook from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let package = Package::open(path)?;
        Self::from_package(package)
    }

    /// Open a workbook from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        Self::from_package(package)
    }

    /// Create a workbook from an OPC package
    pub fn from_package(package: Package) -> Result<Self> {
        let uri = package.main_document_uri()?.as_str().to_string();
        let root = RawXmlElement::parse(package.get_part(&uri)?.data())?;
        if root.local_name() != "workbook" {
            return Err(Error::InvalidFormat(format!("expected workbook, found {}", root.name)));
        }

        let styles = package.load_related(&uri, rel_types::STYLES, Stylesheet::from_bytes);
        let strings = package.load_related(&uri, rel_types::SHARED_STRINGS, SharedStrings::from_bytes);
        let (keep_styles, keep_strings) = (styles.is_some(), strings.is_some());

        let mut sheets = Vec::new();
        for entry in root.child("sheets").into_iter().flat_map(|s| s.elements()) {
            if entry.local_name() != "sheet" {
                continue;
            }
            sheets.push(load_sheet(&package, &uri, entry)?);
        }

        let names = root
            .child("definedNames")
            .into_iter()
            .flat_map(|d| d.elements())
            .filter(|e| e.local_name() == "definedName")
            .map(NamedRange::from_element)
            .collect();

        let next_sheet_id = sheets
            .iter()
            .filter_map(|s| s.entry.attr("sheetId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            .checked_add(1);
        let next_table_id = sheets
            .iter()
            .flat_map(|s| s.tables.iter().map(Table::id))
            .max()
            .unwrap_or(0)
            .checked_add(1);

        let book = Workbook {
            package,
            uri,
            root,
            sheets,
            names,
            strings: strings.unwrap_or_default(),
            styles: styles.unwrap_or_default(),
            keep_styles,
            keep_strings,
            next_sheet_id,
            next_table_id,
            seed_core_properties: false,
        };
        log::debug!(
            "opened workbook '{}' with {} sheets and {} shared strings",
            book.uri,
            book.sheets.len(),
            book.strings.len()
        );
        Ok(book)
    }

    /// Save to a file path
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.update_package()?;
        self.package.save(path)
    }

    /// Save to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.update_package()?;
        self.package.to_bytes()
    }

    /// Write every model back into its part
    fn update_package(&mut self) -> Result<()> {
        self.package.ensure_open()?;
        let uri = self.uri.clone();
        let dir = self.part_dir();

        let mut string_refs = 0;
        for sheet in &mut self.sheets {
            sync_comments(&mut self.package, sheet)?;
            for table in &sheet.tables {
                self.package.put_part(table.uri(), content_types::TABLE, table.to_bytes()?)?;
            }
            if let Some(drawing) = &sheet.drawing {
                self.package.put_part(drawing.uri(), content_types::DRAWING, drawing.to_bytes()?)?;
            }
            if let Some(part) = &sheet.part {
                string_refs += part.shared_string_refs();
                self.package.put_part(&sheet.uri, content_types::WORKSHEET, part.to_bytes()?)?;
            }
        }

        let data = self.workbook_bytes()?;
        self.package.put_part(&uri, content_types::WORKBOOK, data)?;
        if self.package.related_part_by_type("", rel_types::OFFICE_DOCUMENT).is_none() {
            self.package
                .add_relationship("", rel_types::OFFICE_DOCUMENT, &uri, TargetMode::Internal)?;
        }

        if self.keep_styles {
            let target = self.secondary_uri(rel_types::STYLES, &dir, "styles.xml");
            self.package
                .put_part(&target, content_types::SPREADSHEET_STYLES, self.styles.to_bytes()?)?;
            self.package.link_part(&uri, rel_types::STYLES, &target)?;
        }
        if self.keep_strings || !self.strings.is_empty() {
            self.strings.set_count(string_refs);
            let target = self.secondary_uri(rel_types::SHARED_STRINGS, &dir, "sharedStrings.xml");
            self.package
                .put_part(&target, content_types::SHARED_STRINGS, self.strings.to_bytes()?)?;
            self.package.link_part(&uri, rel_types::SHARED_STRINGS, &target)?;
        }

        if self.seed_core_properties {
            if self
                .package
                .related_part_by_type("", rel_types::CORE_PROPERTIES)
                .is_none()
            {
                self.package
                    .set_core_properties(&CoreProperties::created_now(""))?;
            }
            self.seed_core_properties = false;
        }
        Ok(())
    }

    fn workbook_bytes(&self) -> Result<Vec<u8>> {
        let mut root = self.root.clone();
        let entries: Vec<RawXmlElement> = self.sheets.iter().map(|s| s.entry.clone()).collect();
        match root.child_mut("sheets") {
            Some(list) => {
                list.remove_children("sheet");
                for entry in entries {
                    list.push_child(entry);
                }
            }
            None => {
                let mut list = RawXmlElement::new(self.tag("sheets"));
                for entry in entries {
                    list.push_child(entry);
                }
                root.insert_child_ordered(list, WORKBOOK_ORDER);
            }
        }

        root.remove_children("definedNames");
        if !self.names.is_empty() {
            let tag = self.tag("definedName");
            let mut list = RawXmlElement::new(self.tag("definedNames"));
            for name in &self.names {
                list.push_child(name.to_element(&tag));
            }
            root.insert_child_ordered(list, WORKBOOK_ORDER);
        }
        root.to_xml_bytes()
    }

    /// Qualified name for a workbook element
    fn tag(&self, local: &str) -> String {
        match self.root.name.split_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    /// Directory of the workbook part with a trailing slash, e.g. `xl/`
    fn part_dir(&self) -> String {
        match self.uri.rfind('/') {
            Some(i) => self.uri[..=i].to_string(),
            None => String::new(),
        }
    }

    /// Existing target of `rel_type`, or `<dir><name>` for a part not yet in the package
    fn secondary_uri(&self, rel_type: &str, dir: &str, name: &str) -> String {
        self.package
            .related_part_by_type(&self.uri, rel_type)
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|| format!("{}{}", dir, name))
    }

    /// Close the workbook; later mutating and saving calls fail with [`Error::Closed`]
    pub fn close(&mut self) {
        self.package.close();
    }

    pub fn is_closed(&self) -> bool {
        self.package.is_closed()
    }

    /// Get the underlying package
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Read core properties
    pub fn core_properties(&self) -> Result<CoreProperties> {
        self.package.core_properties()
    }

    /// Replace core properties
    pub fn set_core_properties(&mut self, props: &CoreProperties) -> Result<()> {
        self.package.set_core_properties(props)?;
        self.seed_core_properties = false;
        Ok(())
    }

    // === Sheets ===

    /// Position of a sheet, matching the name case-insensitively
    fn position(&self, name: &str) -> Result<usize> {
        let wanted = name.to_lowercase();
        self.sheets
            .iter()
            .position(|s| s.name().to_lowercase() == wanted)
            .ok_or_else(|| Error::InvalidReference(format!("no sheet named '{}'", name)))
    }

    fn view(&self, index: usize) -> Sheet<'_> {
        Sheet {
            sheet: &self.sheets[index],
            strings: &self.strings,
            styles: &self.styles,
        }
    }

    fn handle(&mut self, index: usize) -> SheetMut<'_> {
        SheetMut {
            sheet: &mut self.sheets[index],
            package: &mut self.package,
            strings: &mut self.strings,
            styles: &self.styles,
        }
    }

    pub fn sheet(&self, name: &str) -> Result<Sheet<'_>> {
        let index = self.position(name)?;
        Ok(self.view(index))
    }

    /// Sheet at a zero-based position in tab order
    pub fn sheet_by_index(&self, index: usize) -> Result<Sheet<'_>> {
        if index >= self.sheets.len() {
            return Err(Error::InvalidIndex(format!(
                "sheet {} out of range (have {})",
                index,
                self.sheets.len()
            )));
        }
        Ok(self.view(index))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<SheetMut<'_>> {
        self.package.ensure_open()?;
        let index = self.position(name)?;
        Ok(self.handle(index))
    }

    pub fn sheets(&self) -> Vec<Sheet<'_>> {
        (0..self.sheets.len()).map(|i| self.view(i)).collect()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Worksheet::name).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Validate a sheet name, ignoring the sheet at `except` when checking for duplicates
    fn check_sheet_name(&self, name: &str, except: Option<usize>) -> Result<()> {
        let len = name.chars().count();
        if len == 0 || len > MAX_SHEET_NAME {
            return Err(Error::validation(
                "name",
                format!("sheet name must be 1 to {} characters", MAX_SHEET_NAME),
                name,
            ));
        }
        if name.contains(SHEET_NAME_FORBIDDEN) || name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::validation("name", "sheet name contains a forbidden character", name));
        }
        let wanted = name.to_lowercase();
        let taken = self
            .sheets
            .iter()
            .enumerate()
            .any(|(i, s)| Some(i) != except && s.name().to_lowercase() == wanted);
        if taken {
            return Err(Error::validation("name", "sheet name already in use", name));
        }
        Ok(())
    }

    /// Append an empty worksheet
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetMut<'_>> {
        self.package.ensure_open()?;
        self.check_sheet_name(name, None)?;
        let sheet_id = self
            .next_sheet_id
            .ok_or_else(|| Error::InvalidValue("no sheet IDs left in workbook".into()))?;

        let dir = self.part_dir();
        let uri = self.package.next_part_name(&format!("{}worksheets/sheet", dir), "xml");
        let part = WorksheetPart::new();
        self.package
            .add_part(&uri, content_types::WORKSHEET, part.to_bytes()?, AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&self.uri, rel_types::WORKSHEET, &uri, TargetMode::Internal)?;

        let r = self.root.prefix_for(xml::R, "r");
        let entry = RawXmlElement::new(self.tag("sheet"))
            .with_attr("name", name)
            .with_attr("sheetId", sheet_id.to_string())
            .with_attr(format!("{}:id", r), rel_id);
        self.next_sheet_id = sheet_id.checked_add(1);
        self.sheets.push(Worksheet {
            entry,
            uri,
            part: Some(part),
            tables: Vec::new(),
            comments: None,
            drawing: None,
        });
        log::debug!("added sheet '{}'", name);
        let index = self.sheets.len() - 1;
        Ok(self.handle(index))
    }

    /// Rename a sheet and rewrite defined names that point at it
    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<()> {
        self.package.ensure_open()?;
        let index = self.position(old)?;
        self.check_sheet_name(new, Some(index))?;
        let current = self.sheets[index].name().to_string();
        self.sheets[index].entry.set_attr("name", new);
        for name in &mut self.names {
            name.rename_sheet(&current, new);
        }
        Ok(())
    }

    /// Remove a sheet with the parts only it references
    pub fn delete_sheet(&mut self, name: &str) -> Result<()> {
        self.package.ensure_open()?;
        let index = self.position(name)?;
        if self.sheets.len() == 1 {
            return Err(Error::validation("name", "a workbook must keep at least one sheet", name));
        }
        let visible = self
            .sheets
            .iter()
            .filter(|s| s.state() == SheetState::Visible)
            .count();
        if visible == 1 && self.sheets[index].state() == SheetState::Visible {
            return Err(Error::validation("name", "cannot delete the only visible sheet", name));
        }

        let sheet = self.sheets.remove(index);
        self.package.delete_part_tree(&sheet.uri)?;
        named_range::remove_sheet(&mut self.names, index as u32);

        let count = self.sheets.len();
        if let Some(view) = self.root.descendant_mut(&["bookViews", "workbookView"]) {
            let active = view.attr("activeTab").and_then(|v| v.parse::<usize>().ok());
            if active.is_some_and(|a| a >= count) {
                view.set_attr("activeTab", "0");
            }
        }
        log::debug!("deleted sheet '{}' ({})", name, sheet.uri);
        Ok(())
    }

    /// Show or hide a sheet; at least one sheet stays visible
    pub fn set_sheet_state(&mut self, name: &str, state: SheetState) -> Result<()> {
        self.package.ensure_open()?;
        let index = self.position(name)?;
        if state != SheetState::Visible {
            let others_visible = self
                .sheets
                .iter()
                .enumerate()
                .any(|(i, s)| i != index && s.state() == SheetState::Visible);
            if !others_visible {
                return Err(Error::validation("state", "cannot hide the last visible sheet", name));
            }
        }
        let entry = &mut self.sheets[index].entry;
        match state {
            SheetState::Visible => {
                entry.remove_attr("state");
            }
            _ => entry.set_attr("state", state.as_str()),
        }
        Ok(())
    }

    // === Strings and styles ===

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.strings
    }

    pub fn styles(&self) -> &Stylesheet {
        &self.styles
    }

    /// Register a cell format and return its index for [`SheetMut::set_style`]
    pub fn add_style(&mut self, style: &CellStyle) -> Result<u32> {
        self.package.ensure_open()?;
        let xf = self.styles.add_style(style)?;
        self.keep_styles = true;
        Ok(xf)
    }

    // === Tables ===

    fn find_table(&self, name: &str) -> Option<(usize, usize)> {
        self.sheets.iter().enumerate().find_map(|(s, sheet)| {
            sheet
                .tables
                .iter()
                .position(|t| t.name().eq_ignore_ascii_case(name))
                .map(|t| (s, t))
        })
    }

    /// Create a table over `range` on `sheet`; the first row becomes the header
    pub fn add_table(&mut self, sheet: &str, range: &str, name: &str) -> Result<TableMut<'_>> {
        self.package.ensure_open()?;
        let range = CellRange::parse(range)?;
        if range.rows() < 2 {
            return Err(Error::validation(
                "range",
                "a table needs a header row and at least one data row",
                range.to_string(),
            ));
        }
        check_name("name", name)?;
        let clash = self.find_table(name).is_some()
            || self.names.iter().any(|n| n.name.eq_ignore_ascii_case(name));
        if clash {
            return Err(Error::validation("name", "name already in use", name));
        }
        let index = self.position(sheet)?;
        self.sheets[index].part()?;
        for table in &self.sheets[index].tables {
            if table.range()?.intersects(&range) {
                return Err(Error::validation(
                    "range",
                    format!("overlaps table '{}'", table.name()),
                    range.to_string(),
                ));
            }
        }

        let dir = self.sheets[index].package_dir();
        let uri = self.package.next_part_name(&format!("{}tables/table", dir), "xml");
        let id = self
            .next_table_id
            .ok_or_else(|| Error::InvalidValue("no table IDs left in workbook".into()))?;
        let mut table = Table::new(uri.as_str(), "", id, name, range);
        self.package
            .add_part(&uri, content_types::TABLE, table.to_bytes()?, AddMode::Create)?;
        let rel_id = self.package.add_relationship(
            &self.sheets[index].uri,
            rel_types::TABLE,
            &uri,
            TargetMode::Internal,
        )?;
        table.set_rel_id(rel_id.as_str());
        self.next_table_id = id.checked_add(1);

        let Worksheet { tables, part, .. } = &mut self.sheets[index];
        let part = match part.as_mut() {
            Some(part) => part,
            None => unreachable!(),
        };
        for (i, column) in table.columns().iter().enumerate() {
            let at = CellRef::new(range.start.row, range.start.col + i as u32)?;
            part.set_value(&at, CellValue::from(column.as_str()), &mut self.strings)?;
        }
        part.add_table_part(&rel_id);
        log::debug!("added table '{}' over {} as {}", name, range, uri);

        tables.push(table);
        let table = match tables.last_mut() {
            Some(table) => table,
            None => unreachable!(),
        };
        Ok(TableMut {
            table,
            sheet: part,
            strings: &mut self.strings,
        })
    }

    /// Table by name, matched case-insensitively across all sheets
    pub fn table(&self, name: &str) -> Option<TableView<'_>> {
        let (s, t) = self.find_table(name)?;
        let sheet = &self.sheets[s];
        Some(TableView {
            table: &sheet.tables[t],
            sheet: sheet.part.as_ref()?,
            strings: &self.strings,
        })
    }

    pub fn table_mut(&mut self, name: &str) -> Result<TableMut<'_>> {
        self.package.ensure_open()?;
        let (s, t) = self
            .find_table(name)
            .ok_or_else(|| Error::InvalidReference(format!("no table named '{}'", name)))?;
        let Worksheet { tables, part, .. } = &mut self.sheets[s];
        let part = part
            .as_mut()
            .ok_or_else(|| Error::InvalidReference(format!("table '{}' is not on a worksheet", name)))?;
        Ok(TableMut {
            table: &mut tables[t],
            sheet: part,
            strings: &mut self.strings,
        })
    }

    /// Every table, in sheet order
    pub fn tables(&self) -> Vec<TableView<'_>> {
        self.sheets
            .iter()
            .flat_map(|sheet| {
                let part = sheet.part.as_ref();
                sheet.tables.iter().filter_map(move |table| {
                    Some(TableView {
                        table,
                        sheet: part?,
                        strings: &self.strings,
                    })
                })
            })
            .collect()
    }

    // === Named ranges ===

    fn add_name(&mut self, name: &str, refers_to: &str, local: Option<u32>) -> Result<()> {
        self.package.ensure_open()?;
        named_range::check_new(&self.names, name, refers_to, local)?;
        if self.find_table(name).is_some() {
            return Err(Error::validation("name", "a table already uses this name", name));
        }
        self.names.push(NamedRange {
            local_sheet_id: local,
            ..NamedRange::new(name, refers_to)
        });
        Ok(())
    }

    /// Define a workbook-level name, e.g. `Rates` for `Sheet1!$B$2:$B$9`
    pub fn add_named_range(&mut self, name: &str, refers_to: &str) -> Result<()> {
        self.add_name(name, refers_to, None)
    }

    /// Define a name visible only within `sheet`
    pub fn add_local_named_range(&mut self, sheet: &str, name: &str, refers_to: &str) -> Result<()> {
        let index = self.position(sheet)?;
        self.add_name(name, refers_to, Some(index as u32))
    }

    pub fn named_ranges(&self) -> &[NamedRange] {
        &self.names
    }

    /// Named range by name; a workbook-level definition wins over sheet-local ones
    pub fn named_range(&self, name: &str) -> Option<&NamedRange> {
        let matches = |n: &&NamedRange| n.name.eq_ignore_ascii_case(name);
        self.names
            .iter()
            .filter(matches)
            .find(|n| !n.is_local())
            .or_else(|| self.names.iter().find(matches))
    }

    fn name_position(&self, name: &str) -> Result<usize> {
        let found = self
            .names
            .iter()
            .position(|n| !n.is_local() && n.name.eq_ignore_ascii_case(name))
            .or_else(|| self.names.iter().position(|n| n.name.eq_ignore_ascii_case(name)));
        found.ok_or_else(|| Error::InvalidReference(format!("no defined name '{}'", name)))
    }

    pub fn delete_named_range(&mut self, name: &str) -> Result<()> {
        self.package.ensure_open()?;
        let index = self.name_position(name)?;
        self.names.remove(index);
        Ok(())
    }

    pub fn set_named_range_hidden(&mut self, name: &str, hidden: bool) -> Result<()> {
        self.package.ensure_open()?;
        let index = self.name_position(name)?;
        self.names[index].hidden = hidden;
        Ok(())
    }
}

/// Load a `sheet` entry of workbook.xml with the parts hanging off it
fn load_sheet(package: &Package, workbook: &str, entry: &RawXmlElement) -> Result<Worksheet> {
    let name = entry.attr("name").unwrap_or_default();
    let rel_id = entry
        .attr_local("id")
        .ok_or_else(|| Error::Corrupted(format!("sheet '{}' has no relationship id", name)))?;
    let rels = package.relationships_of(workbook)?;
    let rel = rels
        .get(rel_id)
        .ok_or_else(|| Error::Corrupted(format!("sheet '{}' points at unknown relationship '{}'", name, rel_id)))?;
    let uri = package.related_part(workbook, rel_id)?.as_str().to_string();
    if !package.part_exists(&uri) {
        return Err(Error::Corrupted(format!("part '{}' of sheet '{}' is missing", uri, name)));
    }

    let mut sheet = Worksheet {
        entry: entry.clone(),
        uri: uri.clone(),
        part: None,
        tables: Vec::new(),
        comments: None,
        drawing: None,
    };
    if rel.rel_type != rel_types::WORKSHEET {
        log::debug!("keeping sheet '{}' ({}) opaque", name, rel.rel_type);
        return Ok(sheet);
    }
    sheet.part = Some(WorksheetPart::from_bytes(package.get_part(&uri)?.data())?);

    for rel in package.relationships_of(&uri)?.all_by_type(rel_types::TABLE) {
        if rel.is_external() {
            continue;
        }
        let Ok(part) = package.get_part(&rel.target) else {
            log::warn!("table '{}' of sheet '{}' is missing", rel.target, name);
            continue;
        };
        match Table::from_bytes(rel.target.as_str(), rel.id.as_str(), part.data()) {
            Ok(table) => sheet.tables.push(table),
            Err(e) => log::warn!("failed to parse '{}': {}", rel.target, e),
        }
    }

    if let Some(target) = package.related_part_by_type(&uri, rel_types::COMMENTS) {
        sheet.comments = package.load_related(&uri, rel_types::COMMENTS, |data| {
            CommentsPart::from_bytes(target.as_str(), data)
        });
        if let (Some(comments), Some(vml)) = (
            sheet.comments.as_mut(),
            package.related_part_by_type(&uri, rel_types::VML_DRAWING),
        ) {
            comments.set_vml_uri(vml.as_str());
        }
    }
    if let Some(target) = package.related_part_by_type(&uri, rel_types::DRAWING) {
        sheet.drawing = package.load_related(&uri, rel_types::DRAWING, |data| {
            SheetDrawing::from_bytes(target.as_str(), data)
        });
    }
    Ok(sheet)
}

/// Store a sheet's comments and rebuild their VML anchors when they changed
fn sync_comments(package: &mut Package, sheet: &mut Worksheet) -> Result<()> {
    let sheet_uri = sheet.uri.clone();
    let dir = sheet.package_dir();
    let Some(comments) = sheet.comments.as_mut() else {
        return Ok(());
    };

    if comments.is_empty() {
        let uris: Vec<String> = std::iter::once(comments.uri().to_string())
            .chain(comments.vml_uri().map(str::to_string))
            .collect();
        for uri in uris {
            if package.part_exists(&uri) {
                package.delete_part(&uri)?;
            }
        }
        if let Some(part) = sheet.part.as_mut() {
            part.remove_element("legacyDrawing");
        }
        sheet.comments = None;
        return Ok(());
    }

    package.put_part(comments.uri(), content_types::SPREADSHEET_COMMENTS, comments.to_bytes()?)?;
    package.link_part(&sheet_uri, rel_types::COMMENTS, comments.uri())?;
    if comments.is_dirty() {
        let vml = match comments.vml_uri() {
            Some(uri) => uri.to_string(),
            None => package.next_part_name(&format!("{}drawings/vmlDrawing", dir), "vml"),
        };
        package.put_part(&vml, content_types::VML, comments.vml_bytes()?)?;
        let rel_id = package.link_part(&sheet_uri, rel_types::VML_DRAWING, &vml)?;
        if let Some(part) = sheet.part.as_mut() {
            part.link_element("legacyDrawing", &rel_id);
        }
        comments.set_vml_uri(vml);
        comments.mark_clean();
    }
    Ok(())
}
