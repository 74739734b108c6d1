//! Defined names (workbook definedNames)

use crate::error::{Error, Result};
use crate::spreadsheet::cell_ref::quote_sheet_name;
use crate::spreadsheet::table::check_name;
use crate::xml::{self, RawXmlElement};

/// A workbook-level or sheet-local defined name
#[derive(Clone, Debug, PartialEq)]
pub struct NamedRange {
    pub name: String,
    /// Formula text, e.g. `Sheet1!$A$1:$B$4`
    pub refers_to: String,
    /// Zero-based sheet position for a local name
    pub local_sheet_id: Option<u32>,
    pub hidden: bool,
    /// Other attributes such as comment or function (preserved)
    pub unknown_attrs: Vec<(String, String)>,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        NamedRange {
            name: name.into(),
            refers_to: refers_to.into(),
            local_sheet_id: None,
            hidden: false,
            unknown_attrs: Vec::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.local_sheet_id.is_some()
    }

    pub(crate) fn from_element(elem: &RawXmlElement) -> Self {
        let mut range = NamedRange::new("", elem.text());
        for (key, value) in &elem.attributes {
            match key.as_str() {
                "name" => range.name = value.clone(),
                "localSheetId" => match value.parse() {
                    Ok(id) => range.local_sheet_id = Some(id),
                    Err(_) => range.unknown_attrs.push((key.clone(), value.clone())),
                },
                "hidden" => range.hidden = xml::parse_bool_str(value),
                _ => range.unknown_attrs.push((key.clone(), value.clone())),
            }
        }
        range
    }

    pub(crate) fn to_element(&self, tag: &str) -> RawXmlElement {
        let mut elem = RawXmlElement::new(tag).with_attr("name", self.name.as_str());
        if let Some(id) = self.local_sheet_id {
            elem.set_attr("localSheetId", id.to_string());
        }
        if self.hidden {
            elem.set_attr("hidden", "1");
        }
        for (key, value) in &self.unknown_attrs {
            elem.set_attr(key, value.as_str());
        }
        elem.with_text(self.refers_to.as_str())
    }

    /// Rewrite `Old!` and `'Old'!` prefixes in the formula
    pub(crate) fn rename_sheet(&mut self, old: &str, new: &str) {
        let new_prefix = format!("{}!", quote_sheet_name(new));
        let mut forms = vec![format!("'{}'!", old.replace('\'', "''"))];
        if quote_sheet_name(old) == old {
            forms.push(format!("{}!", old));
        }
        for form in forms {
            self.refers_to = replace_sheet_prefix(&self.refers_to, &form, &new_prefix);
        }
    }
}

/// Replace `prefix` where it starts a sheet reference, not inside a longer name
fn replace_sheet_prefix(formula: &str, prefix: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut rest = formula;
    while let Some(pos) = rest.find(prefix) {
        let boundary = match rest[..pos].chars().last() {
            None => out.chars().last().map_or(true, |c| !is_name_char(c)),
            Some(c) => !is_name_char(c),
        };
        out.push_str(&rest[..pos]);
        if boundary {
            out.push_str(replacement);
        } else {
            out.push_str(prefix);
        }
        rest = &rest[pos + prefix.len()..];
    }
    out.push_str(rest);
    out
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '\''
}

/// Validate a new name against the names already in its scope
pub(crate) fn check_new(existing: &[NamedRange], name: &str, refers_to: &str, local: Option<u32>) -> Result<()> {
    check_name("name", name)?;
    if refers_to.trim().is_empty() {
        return Err(Error::validation("refers_to", "reference cannot be empty", refers_to));
    }
    if existing
        .iter()
        .any(|n| n.local_sheet_id == local && n.name.eq_ignore_ascii_case(name))
    {
        return Err(Error::validation("name", "name already defined in this scope", name));
    }
    Ok(())
}

/// Drop names local to a deleted sheet and shift the positions of later sheets
pub(crate) fn remove_sheet(names: &mut Vec<NamedRange>, position: u32) {
    names.retain(|n| n.local_sheet_id != Some(position));
    for name in names.iter_mut() {
        if let Some(id) = name.local_sheet_id.as_mut() {
            if *id > position {
                *id -= 1;
            }
        }
    }
}
