//! Stylesheet (xl/styles.xml) and the cell style builder

use crate::error::{Error, Result};
use crate::spreadsheet::cell::format_number;
use crate::xml::{self, RawXmlElement};

/// Schema order of styleSheet children
const STYLESHEET_ORDER: &[&str] = &[
    "numFmts", "fonts", "fills", "borders", "cellStyleXfs", "cellXfs", "cellStyles", "dxfs",
    "tableStyles", "colors", "extLst",
];

/// First ID available to custom number formats
pub const FIRST_CUSTOM_NUM_FMT: u32 = 164;

/// Built-in number formats that need no numFmt entry
const BUILTIN_NUM_FMTS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (14, "m/d/yyyy"),
    (22, "m/d/yyyy h:mm"),
    (49, "@"),
];

/// Border line style
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderStyle {
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

impl BorderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderStyle::Thin => "thin",
            BorderStyle::Medium => "medium",
            BorderStyle::Thick => "thick",
            BorderStyle::Dashed => "dashed",
            BorderStyle::Dotted => "dotted",
            BorderStyle::Double => "double",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HorizontalAlignment {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

impl HorizontalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Fill => "fill",
            HorizontalAlignment::Justify => "justify",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
}

impl VerticalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }
}

/// Formatting for [`Stylesheet::add_style`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellStyle {
    pub font_name: Option<String>,
    /// Points
    pub font_size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// RGB hex, e.g. `FF0000`
    pub font_color: Option<String>,
    /// RGB hex solid fill
    pub fill_color: Option<String>,
    pub border: Option<BorderStyle>,
    pub horizontal: Option<HorizontalAlignment>,
    pub vertical: Option<VerticalAlignment>,
    pub wrap_text: bool,
    /// Format code, e.g. `0.00%` or `yyyy-mm-dd`
    pub number_format: Option<String>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font(mut self, name: impl Into<String>, size: f64) -> Self {
        self.font_name = Some(name.into());
        self.font_size = Some(size);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn font_color(mut self, rgb: impl Into<String>) -> Self {
        self.font_color = Some(rgb.into());
        self
    }

    pub fn fill(mut self, rgb: impl Into<String>) -> Self {
        self.fill_color = Some(rgb.into());
        self
    }

    pub fn border(mut self, style: BorderStyle) -> Self {
        self.border = Some(style);
        self
    }

    pub fn align(mut self, horizontal: HorizontalAlignment) -> Self {
        self.horizontal = Some(horizontal);
        self
    }

    pub fn valign(mut self, vertical: VerticalAlignment) -> Self {
        self.vertical = Some(vertical);
        self
    }

    pub fn wrap(mut self) -> Self {
        self.wrap_text = true;
        self
    }

    pub fn number_format(mut self, code: impl Into<String>) -> Self {
        self.number_format = Some(code.into());
        self
    }

    fn has_font(&self) -> bool {
        self.font_name.is_some()
            || self.font_size.is_some()
            || self.bold
            || self.italic
            || self.underline
            || self.font_color.is_some()
    }
}

/// `FFRRGGBB` from `RRGGBB`, `#RRGGBB` or `AARRGGBB`
fn argb(field: &str, value: &str) -> Result<String> {
    let hex = value.trim_start_matches('#');
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::validation(field, "invalid color hex", value));
    }
    match hex.len() {
        6 => Ok(format!("FF{}", hex.to_ascii_uppercase())),
        8 => Ok(hex.to_ascii_uppercase()),
        _ => Err(Error::validation(field, "invalid color hex", value)),
    }
}

/// The workbook stylesheet; cell styles are appended, never rewritten
#[derive(Clone, Debug)]
pub struct Stylesheet {
    root: RawXmlElement,
    /// `None` once the ID space is used up
    next_num_fmt: Option<u32>,
}

impl Default for Stylesheet {
    fn default() -> Self {
        let font = RawXmlElement::new("font")
            .with_child(RawXmlElement::new("sz").with_attr("val", "11"))
            .with_child(RawXmlElement::new("color").with_attr("theme", "1"))
            .with_child(RawXmlElement::new("name").with_attr("val", "Calibri"))
            .with_child(RawXmlElement::new("family").with_attr("val", "2"))
            .with_child(RawXmlElement::new("scheme").with_attr("val", "minor"));
        let fill = |pattern: &str| {
            RawXmlElement::new("fill")
                .with_child(RawXmlElement::new("patternFill").with_attr("patternType", pattern))
        };
        let base_xf = || {
            RawXmlElement::new("xf")
                .with_attr("numFmtId", "0")
                .with_attr("fontId", "0")
                .with_attr("fillId", "0")
                .with_attr("borderId", "0")
        };

        let root = RawXmlElement::new("styleSheet")
            .with_attr("xmlns", xml::S)
            .with_child(list("fonts", vec![font]))
            .with_child(list("fills", vec![fill("none"), fill("gray125")]))
            .with_child(list("borders", vec![border(None)]))
            .with_child(list("cellStyleXfs", vec![base_xf()]))
            .with_child(list("cellXfs", vec![base_xf().with_attr("xfId", "0")]))
            .with_child(list(
                "cellStyles",
                vec![RawXmlElement::new("cellStyle")
                    .with_attr("name", "Normal")
                    .with_attr("xfId", "0")
                    .with_attr("builtinId", "0")],
            ))
            .with_child(RawXmlElement::new("dxfs").with_attr("count", "0"))
            .with_child(
                RawXmlElement::new("tableStyles")
                    .with_attr("count", "0")
                    .with_attr("defaultTableStyle", "TableStyleMedium2")
                    .with_attr("defaultPivotStyle", "PivotStyleLight16"),
            );
        Stylesheet {
            root,
            next_num_fmt: Some(FIRST_CUSTOM_NUM_FMT),
        }
    }
}

fn list(name: &str, items: Vec<RawXmlElement>) -> RawXmlElement {
    let mut elem = RawXmlElement::new(name).with_attr("count", items.len().to_string());
    for item in items {
        elem.push_child(item);
    }
    elem
}

fn border(style: Option<BorderStyle>) -> RawXmlElement {
    let mut elem = RawXmlElement::new("border");
    for side in ["left", "right", "top", "bottom"] {
        let mut edge = RawXmlElement::new(side);
        if let Some(style) = style {
            edge.set_attr("style", style.as_str());
            edge.push_child(RawXmlElement::new("color").with_attr("indexed", "64"));
        }
        elem.push_child(edge);
    }
    elem.with_child(RawXmlElement::new("diagonal"))
}

impl Stylesheet {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let root = RawXmlElement::parse(data)?;
        let max_loaded = root
            .child("numFmts")
            .into_iter()
            .flat_map(|n| n.elements())
            .filter_map(|f| f.attr("numFmtId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(Stylesheet {
            root,
            next_num_fmt: max_loaded.max(FIRST_CUSTOM_NUM_FMT - 1).checked_add(1),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }

    fn tag(&self, local: &str) -> String {
        match self.root.name.split_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    /// Qualify every element of a freshly built subtree with the stylesheet prefix
    fn qualify(&self, mut elem: RawXmlElement) -> RawXmlElement {
        if self.root.name.contains(':') {
            elem.name = self.tag(&elem.name);
            for child in &mut elem.children {
                if let xml::RawXmlNode::Element(e) = child {
                    *e = self.qualify(std::mem::replace(e, RawXmlElement::new("")));
                }
            }
        }
        elem
    }

    /// Number of cell formats (cellXfs entries)
    pub fn cell_xf_count(&self) -> u32 {
        self.root
            .child("cellXfs")
            .map_or(0, |x| x.elements().filter(|e| e.local_name() == "xf").count() as u32)
    }

    /// Number format ID used by cell format `xf`
    pub fn num_fmt_id(&self, xf: u32) -> Option<u32> {
        self.root
            .child("cellXfs")?
            .elements()
            .filter(|e| e.local_name() == "xf")
            .nth(xf as usize)?
            .attr("numFmtId")?
            .parse()
            .ok()
    }

    /// Format code of a number format ID, custom or built-in
    pub fn number_format_code(&self, id: u32) -> Option<String> {
        let custom = self
            .root
            .child("numFmts")
            .into_iter()
            .flat_map(|n| n.elements())
            .find(|f| f.attr("numFmtId").and_then(|v| v.parse().ok()) == Some(id))
            .and_then(|f| f.attr("formatCode"))
            .map(str::to_string);
        custom.or_else(|| {
            BUILTIN_NUM_FMTS
                .iter()
                .find(|(builtin, _)| *builtin == id)
                .map(|(_, code)| code.to_string())
        })
    }

    /// Whether cell format `xf` uses a bold font
    pub fn is_bold(&self, xf: u32) -> bool {
        let font_id = self
            .root
            .child("cellXfs")
            .and_then(|x| x.elements().filter(|e| e.local_name() == "xf").nth(xf as usize))
            .and_then(|x| x.attr("fontId")?.parse::<usize>().ok());
        let Some(font_id) = font_id else {
            return false;
        };
        self.root
            .child("fonts")
            .and_then(|f| f.elements().filter(|e| e.local_name() == "font").nth(font_id))
            .and_then(|font| font.child("b"))
            .map_or(false, |b| b.attr("val").map_or(true, xml::parse_bool_str))
    }

    /// Append `item` to the `container` list, creating it when absent; returns the item index
    fn append(&mut self, container: &str, item: RawXmlElement) -> u32 {
        if self.root.child(container).is_none() {
            let list = RawXmlElement::new(self.tag(container)).with_attr("count", "0");
            self.root.insert_child_ordered(list, STYLESHEET_ORDER);
        }
        let item = self.qualify(item);
        let item_local = item.local_name().to_string();
        match self.root.child_mut(container) {
            Some(list) => {
                list.push_child(item);
                let count = list.elements().filter(|e| e.local_name() == item_local).count();
                list.set_attr("count", count.to_string());
                count as u32 - 1
            }
            None => unreachable!(),
        }
    }

    /// ID for a number format code, registering a custom format when needed
    fn num_fmt_for(&mut self, code: &str) -> Result<u32> {
        if let Some((id, _)) = BUILTIN_NUM_FMTS.iter().find(|(_, c)| *c == code) {
            return Ok(*id);
        }
        let existing = self
            .root
            .child("numFmts")
            .into_iter()
            .flat_map(|n| n.elements())
            .find(|f| f.attr("formatCode") == Some(code))
            .and_then(|f| f.attr("numFmtId")?.parse().ok());
        if let Some(id) = existing {
            return Ok(id);
        }
        let id = self
            .next_num_fmt
            .ok_or_else(|| Error::InvalidValue("no number format IDs left".into()))?;
        self.next_num_fmt = id.checked_add(1);
        self.append(
            "numFmts",
            RawXmlElement::new("numFmt")
                .with_attr("numFmtId", id.to_string())
                .with_attr("formatCode", code),
        );
        Ok(id)
    }

    /// Register a cell format; returns the cellXfs index to put in a cell's `s`
    pub fn add_style(&mut self, style: &CellStyle) -> Result<u32> {
        let font_color = style
            .font_color
            .as_deref()
            .map(|c| argb("font_color", c))
            .transpose()?;
        let fill_color = style
            .fill_color
            .as_deref()
            .map(|c| argb("fill_color", c))
            .transpose()?;
        if let Some(size) = style.font_size {
            if !(1.0..=409.0).contains(&size) {
                return Err(Error::validation("font_size", "size must be between 1 and 409 points", size.to_string()));
            }
        }
        if style.number_format.as_deref() == Some("") {
            return Err(Error::validation("number_format", "format code cannot be empty", ""));
        }
        let num_fmt_id = style
            .number_format
            .as_deref()
            .map(|code| self.num_fmt_for(code))
            .transpose()?;

        let font_id = if style.has_font() {
            let mut font = RawXmlElement::new("font");
            if style.bold {
                font.push_child(RawXmlElement::new("b"));
            }
            if style.italic {
                font.push_child(RawXmlElement::new("i"));
            }
            if style.underline {
                font.push_child(RawXmlElement::new("u"));
            }
            let size = style.font_size.unwrap_or(11.0);
            font.push_child(RawXmlElement::new("sz").with_attr("val", format_number(size)));
            match &font_color {
                Some(rgb) => font.push_child(RawXmlElement::new("color").with_attr("rgb", rgb.as_str())),
                None => font.push_child(RawXmlElement::new("color").with_attr("theme", "1")),
            }
            let name = style.font_name.as_deref().unwrap_or("Calibri");
            font.push_child(RawXmlElement::new("name").with_attr("val", name));
            font.push_child(RawXmlElement::new("family").with_attr("val", "2"));
            Some(self.append("fonts", font))
        } else {
            None
        };

        let fill_id = fill_color.map(|rgb| {
            let fill = RawXmlElement::new("fill").with_child(
                RawXmlElement::new("patternFill")
                    .with_attr("patternType", "solid")
                    .with_child(RawXmlElement::new("fgColor").with_attr("rgb", rgb))
                    .with_child(RawXmlElement::new("bgColor").with_attr("indexed", "64")),
            );
            self.append("fills", fill)
        });

        let border_id = style.border.map(|b| self.append("borders", border(Some(b))));

        let mut xf = RawXmlElement::new("xf")
            .with_attr("numFmtId", num_fmt_id.unwrap_or(0).to_string())
            .with_attr("fontId", font_id.unwrap_or(0).to_string())
            .with_attr("fillId", fill_id.unwrap_or(0).to_string())
            .with_attr("borderId", border_id.unwrap_or(0).to_string())
            .with_attr("xfId", "0");
        if num_fmt_id.is_some() {
            xf.set_attr("applyNumberFormat", "1");
        }
        if font_id.is_some() {
            xf.set_attr("applyFont", "1");
        }
        if fill_id.is_some() {
            xf.set_attr("applyFill", "1");
        }
        if border_id.is_some() {
            xf.set_attr("applyBorder", "1");
        }
        if style.horizontal.is_some() || style.vertical.is_some() || style.wrap_text {
            xf.set_attr("applyAlignment", "1");
            let mut alignment = RawXmlElement::new("alignment");
            if let Some(h) = style.horizontal {
                alignment.set_attr("horizontal", h.as_str());
            }
            if let Some(v) = style.vertical {
                alignment.set_attr("vertical", v.as_str());
            }
            if style.wrap_text {
                alignment.set_attr("wrapText", "1");
            }
            xf.push_child(alignment);
        }

        let index = self.append("cellXfs", xf);
        log::debug!("added cell format {}", index);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_stylesheet() {
        let styles = Stylesheet::default();
        assert_eq!(styles.cell_xf_count(), 1);
        let out = String::from_utf8(styles.to_bytes().unwrap()).unwrap();
        assert!(out.contains(r#"<fills count="2">"#));
        assert!(out.contains(r#"<patternFill patternType="gray125"/>"#));
        assert!(out.contains(r#"<cellStyle name="Normal" xfId="0" builtinId="0"/>"#));
    }

    #[test]
    fn test_add_style() {
        let mut styles = Stylesheet::default();
        let style = CellStyle::new()
            .bold()
            .fill("#ffcc00")
            .border(BorderStyle::Thin)
            .align(HorizontalAlignment::Center)
            .number_format("0.000");
        let xf = styles.add_style(&style).unwrap();
        assert_eq!(xf, 1);
        assert!(styles.is_bold(1));
        assert!(!styles.is_bold(0));
        assert_eq!(styles.num_fmt_id(1), Some(164));
        assert_eq!(styles.number_format_code(164).as_deref(), Some("0.000"));

        let again = styles.add_style(&CellStyle::new().number_format("0.000")).unwrap();
        assert_eq!(styles.num_fmt_id(again), Some(164));
        let other = styles.add_style(&CellStyle::new().number_format("0.0")).unwrap();
        assert_eq!(styles.num_fmt_id(other), Some(165));
        let builtin = styles.add_style(&CellStyle::new().number_format("0%")).unwrap();
        assert_eq!(styles.num_fmt_id(builtin), Some(9));

        let out = String::from_utf8(styles.to_bytes().unwrap()).unwrap();
        assert!(out.contains(r#"<fgColor rgb="FFFFCC00"/>"#));
        assert!(out.find("<numFmts").unwrap() < out.find("<fonts").unwrap());
    }

    #[test]
    fn test_custom_formats_continue_after_load() {
        let data = br#"<styleSheet xmlns="s"><numFmts count="1"><numFmt numFmtId="170" formatCode="0.0000"/></numFmts><cellXfs count="1"><xf numFmtId="0"/></cellXfs></styleSheet>"#;
        let mut styles = Stylesheet::from_bytes(data).unwrap();
        let xf = styles.add_style(&CellStyle::new().number_format("#,##0.000")).unwrap();
        assert_eq!(styles.num_fmt_id(xf), Some(171));
        let reused = styles.add_style(&CellStyle::new().number_format("0.0000")).unwrap();
        assert_eq!(styles.num_fmt_id(reused), Some(170));
    }

    #[test]
    fn test_custom_format_ids_run_out() {
        let data = br#"<styleSheet xmlns="s"><numFmts count="1"><numFmt numFmtId="4294967295" formatCode="0.0000"/></numFmts><fonts count="1"><font/></fonts><cellXfs count="1"><xf numFmtId="0"/></cellXfs></styleSheet>"#;
        let mut styles = Stylesheet::from_bytes(data).unwrap();
        let err = styles.add_style(&CellStyle::new().bold().number_format("0.00000")).unwrap_err();
        assert_eq!(err.code(), "invalid-value");
        assert_eq!(styles.cell_xf_count(), 1);
        let out = String::from_utf8(styles.to_bytes().unwrap()).unwrap();
        assert!(out.contains(r#"<fonts count="1">"#));

        let reused = styles.add_style(&CellStyle::new().number_format("0.0000")).unwrap();
        assert_eq!(styles.num_fmt_id(reused), Some(u32::MAX));
    }

    #[test]
    fn test_rejects_bad_colors() {
        let mut styles = Stylesheet::default();
        let err = styles.add_style(&CellStyle::new().fill("12345")).unwrap_err();
        assert_eq!(err.code(), "validation");
        let err = styles.add_style(&CellStyle::new().font_color("GGGGGG")).unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
