//! DrawingML text bodies (p:txBody, a:txBody)
//!
//! A text body is `a:bodyPr`, an optional `a:lstStyle` and one or more `a:p`.
//! Paragraph and run properties are typed where this crate edits them; every
//! other attribute and child is preserved in `unknown_*` fields.

use crate::error::{Error, Result};
use crate::xml::{self, RawXmlElement};

/// Schema order of `a:pPr` children
const PPR_ORDER: &[&str] = &[
    "lnSpc", "spcBef", "spcAft", "buClrTx", "buClr", "buSzTx", "buSzPct", "buSzPts", "buFontTx",
    "buFont", "buNone", "buAutoNum", "buChar", "buBlip", "tabLst", "defRPr", "extLst",
];

/// Schema order of `a:rPr` children
const RPR_ORDER: &[&str] = &[
    "ln", "noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill", "effectLst",
    "effectDag", "highlight", "uLnTx", "uLn", "uFillTx", "uFill", "latin", "ea", "cs", "sym",
    "hlinkClick", "hlinkMouseOver", "rtl", "extLst",
];

const FILLS: &[&str] = &["noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill"];
const BULLETS: &[&str] = &["buNone", "buAutoNum", "buChar", "buBlip"];

/// Normalize a six-digit RGB hex color, rejecting anything else
pub(crate) fn check_rgb(field: &str, value: &str) -> Result<String> {
    let hex = value.trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::validation(field, "invalid color hex", value));
    }
    Ok(hex.to_ascii_uppercase())
}

/// `<a:solidFill><a:srgbClr val=../></a:solidFill>`
pub(crate) fn solid_fill(tag: &str, rgb: &str) -> RawXmlElement {
    RawXmlElement::new(tag).with_child(RawXmlElement::new("a:srgbClr").with_attr("val", rgb))
}

/// RGB value of an `srgbClr` directly inside `elem`
pub(crate) fn srgb_of(elem: &RawXmlElement) -> Option<&str> {
    elem.child("srgbClr")?.attr("val")
}

/// Paragraph alignment (`algn`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distributed,
}

impl Alignment {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "l" => Some(Self::Left),
            "ctr" => Some(Self::Center),
            "r" => Some(Self::Right),
            "just" => Some(Self::Justify),
            "dist" => Some(Self::Distributed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "l",
            Self::Center => "ctr",
            Self::Right => "r",
            Self::Justify => "just",
            Self::Distributed => "dist",
        }
    }
}

/// Paragraph bullet
#[derive(Clone, Debug, PartialEq)]
pub enum Bullet {
    /// `a:buNone`
    None,
    /// `a:buAutoNum`, e.g. scheme `arabicPeriod`
    AutoNumber { scheme: String, start_at: Option<u32> },
    /// `a:buChar`
    Character(String),
    /// `a:buBlip` (preserved as-is)
    Picture(RawXmlElement),
}

impl Bullet {
    fn from_element(elem: &RawXmlElement) -> Option<Self> {
        match elem.local_name() {
            "buNone" => Some(Bullet::None),
            "buAutoNum" => Some(Bullet::AutoNumber {
                scheme: elem.attr("type").unwrap_or("arabicPeriod").to_string(),
                start_at: elem.attr("startAt").and_then(|v| v.parse().ok()),
            }),
            "buChar" => Some(Bullet::Character(elem.attr("char").unwrap_or("").to_string())),
            "buBlip" => Some(Bullet::Picture(elem.clone())),
            _ => None,
        }
    }

    fn to_element(&self) -> RawXmlElement {
        match self {
            Bullet::None => RawXmlElement::new("a:buNone"),
            Bullet::AutoNumber { scheme, start_at } => {
                let mut elem = RawXmlElement::new("a:buAutoNum").with_attr("type", scheme.as_str());
                if let Some(start) = start_at {
                    elem.set_attr("startAt", start.to_string());
                }
                elem
            }
            Bullet::Character(c) => RawXmlElement::new("a:buChar").with_attr("char", c.as_str()),
            Bullet::Picture(elem) => elem.clone(),
        }
    }
}

/// Paragraph properties (a:pPr)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphProperties {
    pub alignment: Option<Alignment>,
    /// Outline level, 0-8
    pub level: Option<u32>,
    pub bullet: Option<Bullet>,
    /// Unknown attributes (preserved)
    pub unknown_attrs: Vec<(String, String)>,
    /// Unknown children (preserved)
    pub unknown_children: Vec<RawXmlElement>,
}

impl ParagraphProperties {
    fn from_element(elem: &RawXmlElement) -> Self {
        let mut props = ParagraphProperties::default();
        for (key, value) in &elem.attributes {
            match key.as_str() {
                "algn" => match Alignment::parse(value) {
                    Some(a) => props.alignment = Some(a),
                    None => props.unknown_attrs.push((key.clone(), value.clone())),
                },
                "lvl" => match value.parse() {
                    Ok(level) => props.level = Some(level),
                    Err(_) => props.unknown_attrs.push((key.clone(), value.clone())),
                },
                _ => props.unknown_attrs.push((key.clone(), value.clone())),
            }
        }
        for child in elem.elements() {
            match Bullet::from_element(child) {
                Some(bullet) => props.bullet = Some(bullet),
                None => props.unknown_children.push(child.clone()),
            }
        }
        props
    }

    fn to_element(&self) -> RawXmlElement {
        let mut elem = RawXmlElement::new("a:pPr");
        if let Some(level) = self.level {
            elem.set_attr("lvl", level.to_string());
        }
        if let Some(alignment) = self.alignment {
            elem.set_attr("algn", alignment.as_str());
        }
        for (key, value) in &self.unknown_attrs {
            elem.set_attr(key, value.as_str());
        }
        for child in &self.unknown_children {
            elem.push_child(child.clone());
        }
        if let Some(bullet) = &self.bullet {
            elem.insert_child_ordered(bullet.to_element(), PPR_ORDER);
        }
        elem
    }

    fn is_empty(&self) -> bool {
        *self == ParagraphProperties::default()
    }
}

/// Run properties (a:rPr)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunProperties {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    /// Underline style (`sng`, `dbl`, `none`, ...)
    pub underline: Option<String>,
    /// Font size in hundredths of a point
    pub size: Option<u32>,
    /// Latin typeface
    pub font: Option<String>,
    /// Solid RGB fill, e.g. `FF0000`
    pub color: Option<String>,
    /// RGB highlight
    pub highlight: Option<String>,
    /// Unknown attributes (preserved)
    pub unknown_attrs: Vec<(String, String)>,
    /// Unknown children (preserved)
    pub unknown_children: Vec<RawXmlElement>,
}

impl RunProperties {
    pub(crate) fn from_element(elem: &RawXmlElement) -> Self {
        let mut props = RunProperties::default();
        for (key, value) in &elem.attributes {
            match key.as_str() {
                "b" => props.bold = Some(xml::parse_bool_str(value)),
                "i" => props.italic = Some(xml::parse_bool_str(value)),
                "u" => props.underline = Some(value.clone()),
                "sz" => match value.parse() {
                    Ok(size) => props.size = Some(size),
                    Err(_) => props.unknown_attrs.push((key.clone(), value.clone())),
                },
                _ => props.unknown_attrs.push((key.clone(), value.clone())),
            }
        }
        for child in elem.elements() {
            match child.local_name() {
                "solidFill" if srgb_of(child).is_some() => {
                    props.color = srgb_of(child).map(str::to_string);
                }
                "highlight" if srgb_of(child).is_some() => {
                    props.highlight = srgb_of(child).map(str::to_string);
                }
                "latin" if child.attr("typeface").is_some() && child.attributes.len() == 1 => {
                    props.font = child.attr("typeface").map(str::to_string);
                }
                _ => props.unknown_children.push(child.clone()),
            }
        }
        props
    }

    pub(crate) fn to_element(&self, tag: &str) -> RawXmlElement {
        let mut elem = RawXmlElement::new(tag);
        for (key, value) in &self.unknown_attrs {
            elem.set_attr(key, value.as_str());
        }
        if let Some(size) = self.size {
            elem.set_attr("sz", size.to_string());
        }
        if let Some(bold) = self.bold {
            elem.set_attr("b", if bold { "1" } else { "0" });
        }
        if let Some(italic) = self.italic {
            elem.set_attr("i", if italic { "1" } else { "0" });
        }
        if let Some(underline) = &self.underline {
            elem.set_attr("u", underline.as_str());
        }
        for child in &self.unknown_children {
            if self.color.is_some() && FILLS.contains(&child.local_name()) {
                continue;
            }
            elem.push_child(child.clone());
        }
        if let Some(color) = &self.color {
            elem.insert_child_ordered(solid_fill("a:solidFill", color), RPR_ORDER);
        }
        if let Some(highlight) = &self.highlight {
            elem.insert_child_ordered(solid_fill("a:highlight", highlight), RPR_ORDER);
        }
        if let Some(font) = &self.font {
            elem.insert_child_ordered(
                RawXmlElement::new("a:latin").with_attr("typeface", font.as_str()),
                RPR_ORDER,
            );
        }
        elem
    }

    /// Set the solid text color
    pub fn set_color(&mut self, rgb: &str) -> Result<()> {
        self.color = Some(check_rgb("color", rgb)?);
        Ok(())
    }

    /// Set the highlight color
    pub fn set_highlight(&mut self, rgb: &str) -> Result<()> {
        self.highlight = Some(check_rgb("highlight", rgb)?);
        Ok(())
    }

    /// Set the size in points; stored in hundredths
    pub fn set_size_points(&mut self, points: f64) -> Result<()> {
        let size = (points * 100.0).round();
        if !(100.0..=400_000.0).contains(&size) {
            return Err(Error::validation("size", "font size out of range", points.to_string()));
        }
        self.size = Some(size as u32);
        Ok(())
    }
}

/// A text run (a:r)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextRun {
    pub properties: RunProperties,
    pub text: String,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        TextRun {
            properties: RunProperties::default(),
            text: text.into(),
        }
    }

    fn from_element(elem: &RawXmlElement) -> Self {
        let mut run = TextRun::default();
        for child in elem.elements() {
            match child.local_name() {
                "rPr" => run.properties = RunProperties::from_element(child),
                "t" => run.text.push_str(&child.text()),
                _ => {}
            }
        }
        run
    }

    fn to_element(&self) -> RawXmlElement {
        let mut elem = RawXmlElement::new("a:r");
        if self.properties != RunProperties::default() {
            elem.push_child(self.properties.to_element("a:rPr"));
        }
        elem.with_child(RawXmlElement::new("a:t").with_text(self.text.as_str()))
    }
}

/// Content of a paragraph
#[derive(Clone, Debug, PartialEq)]
pub enum TextContent {
    /// a:r
    Run(TextRun),
    /// a:br
    Break(RawXmlElement),
    /// a:fld (slide number, date, ...)
    Field(RawXmlElement),
    /// Unknown (preserved)
    Unknown(RawXmlElement),
}

/// A paragraph (a:p)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextParagraph {
    pub properties: ParagraphProperties,
    pub content: Vec<TextContent>,
    /// Properties of the paragraph end mark (a:endParaRPr)
    pub end_properties: Option<RawXmlElement>,
}

impl TextParagraph {
    /// A paragraph holding one run, or none for empty text
    pub fn new(text: &str) -> Self {
        let mut para = TextParagraph::default();
        if !text.is_empty() {
            para.content.push(TextContent::Run(TextRun::new(text)));
        }
        para
    }

    fn from_element(elem: &RawXmlElement) -> Self {
        let mut para = TextParagraph::default();
        for child in elem.elements() {
            match child.local_name() {
                "pPr" => para.properties = ParagraphProperties::from_element(child),
                "r" => para.content.push(TextContent::Run(TextRun::from_element(child))),
                "br" => para.content.push(TextContent::Break(child.clone())),
                "fld" => para.content.push(TextContent::Field(child.clone())),
                "endParaRPr" => para.end_properties = Some(child.clone()),
                _ => para.content.push(TextContent::Unknown(child.clone())),
            }
        }
        para
    }

    fn to_element(&self) -> RawXmlElement {
        let mut elem = RawXmlElement::new("a:p");
        if !self.properties.is_empty() {
            elem.push_child(self.properties.to_element());
        }
        for item in &self.content {
            match item {
                TextContent::Run(run) => elem.push_child(run.to_element()),
                TextContent::Break(e) | TextContent::Field(e) | TextContent::Unknown(e) => {
                    elem.push_child(e.clone())
                }
            }
        }
        if let Some(end) = &self.end_properties {
            elem.push_child(end.clone());
        }
        elem
    }

    /// Plain text; line breaks read as `\n`
    pub fn text(&self) -> String {
        let mut out = String::new();
        for item in &self.content {
            match item {
                TextContent::Run(run) => out.push_str(&run.text),
                TextContent::Break(_) => out.push('\n'),
                TextContent::Field(e) => {
                    if let Some(t) = e.child("t") {
                        out.push_str(&t.text());
                    }
                }
                TextContent::Unknown(_) => {}
            }
        }
        out
    }

    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.content.iter().filter_map(|c| match c {
            TextContent::Run(run) => Some(run),
            _ => None,
        })
    }

    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut TextRun> {
        self.content.iter_mut().filter_map(|c| match c {
            TextContent::Run(run) => Some(run),
            _ => None,
        })
    }

    /// Append a run and return it for formatting
    pub fn add_run(&mut self, text: &str) -> &mut TextRun {
        self.content.push(TextContent::Run(TextRun::new(text)));
        match self.content.last_mut() {
            Some(TextContent::Run(run)) => run,
            _ => unreachable!(),
        }
    }

    pub fn alignment(&self) -> Option<Alignment> {
        self.properties.alignment
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.properties.alignment = Some(alignment);
    }

    pub fn level(&self) -> u32 {
        self.properties.level.unwrap_or(0)
    }

    /// Set the outline level (0-8)
    pub fn set_level(&mut self, level: u32) -> Result<()> {
        if level > 8 {
            return Err(Error::validation("level", "outline level must be 0-8", level.to_string()));
        }
        self.properties.level = Some(level);
        Ok(())
    }

    pub fn bullet(&self) -> Option<&Bullet> {
        self.properties.bullet.as_ref()
    }

    pub fn set_bullet(&mut self, bullet: Bullet) {
        self.properties.unknown_children.retain(|c| !BULLETS.contains(&c.local_name()));
        self.properties.bullet = Some(bullet);
    }
}

/// A text body
#[derive(Clone, Debug, PartialEq)]
pub struct TextBody {
    /// a:bodyPr (preserved)
    pub body_properties: RawXmlElement,
    /// a:lstStyle (preserved)
    pub list_style: Option<RawXmlElement>,
    pub paragraphs: Vec<TextParagraph>,
    /// Children after the paragraphs, e.g. extLst (preserved)
    pub unknown_children: Vec<RawXmlElement>,
}

impl Default for TextBody {
    fn default() -> Self {
        TextBody {
            body_properties: RawXmlElement::new("a:bodyPr"),
            list_style: Some(RawXmlElement::new("a:lstStyle")),
            paragraphs: vec![TextParagraph::default()],
            unknown_children: Vec::new(),
        }
    }
}

impl TextBody {
    /// A body with one paragraph per line of `text`
    pub fn new(text: &str) -> Self {
        let mut body = TextBody::default();
        body.set_text(text);
        body
    }

    pub(crate) fn from_element(elem: &RawXmlElement) -> Self {
        let mut body = TextBody {
            body_properties: RawXmlElement::new("a:bodyPr"),
            list_style: None,
            paragraphs: Vec::new(),
            unknown_children: Vec::new(),
        };
        for child in elem.elements() {
            match child.local_name() {
                "bodyPr" => body.body_properties = child.clone(),
                "lstStyle" => body.list_style = Some(child.clone()),
                "p" => body.paragraphs.push(TextParagraph::from_element(child)),
                _ => body.unknown_children.push(child.clone()),
            }
        }
        body
    }

    /// Serialize as `tag` (`p:txBody` in shapes, `a:txBody` in table cells)
    pub(crate) fn to_element(&self, tag: &str) -> RawXmlElement {
        let mut elem = RawXmlElement::new(tag).with_child(self.body_properties.clone());
        if let Some(list_style) = &self.list_style {
            elem.push_child(list_style.clone());
        }
        for para in &self.paragraphs {
            elem.push_child(para.to_element());
        }
        if self.paragraphs.is_empty() {
            elem.push_child(RawXmlElement::new("a:p"));
        }
        for child in &self.unknown_children {
            elem.push_child(child.clone());
        }
        elem
    }

    /// Paragraph texts joined by `\n`
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(TextParagraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replace the content with one paragraph per line.
    ///
    /// Each new paragraph takes the first paragraph's properties and its first
    /// run's formatting.
    pub fn set_text(&mut self, text: &str) {
        let template = self.paragraphs.first();
        let props = template.map(|p| p.properties.clone()).unwrap_or_default();
        let run_props = template
            .and_then(|p| p.runs().next())
            .map(|r| r.properties.clone())
            .unwrap_or_default();
        let end = template.and_then(|p| p.end_properties.clone());

        self.paragraphs = text
            .split('\n')
            .map(|line| {
                let mut para = TextParagraph::new(line);
                para.properties = props.clone();
                para.end_properties = end.clone();
                for run in para.runs_mut() {
                    run.properties = run_props.clone();
                }
                para
            })
            .collect();
    }

    /// Append a paragraph and return it
    pub fn add_paragraph(&mut self, text: &str) -> &mut TextParagraph {
        if self.paragraphs.len() == 1 && self.paragraphs[0].content.is_empty() {
            self.paragraphs.clear();
        }
        self.paragraphs.push(TextParagraph::new(text));
        match self.paragraphs.last_mut() {
            Some(para) => para,
            None => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(xml: &str) -> TextBody {
        TextBody::from_element(&RawXmlElement::parse(xml.as_bytes()).unwrap())
    }

    #[test]
    fn test_parse_runs_and_properties() {
        let tb = body(
            r#"<p:txBody xmlns:p="p" xmlns:a="a"><a:bodyPr wrap="square"/><a:lstStyle/>
            <a:p><a:pPr algn="ctr" lvl="1"><a:buChar char="-"/></a:pPr>
            <a:r><a:rPr lang="en-US" sz="2400" b="1"><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill><a:latin typeface="Arial"/></a:rPr><a:t>Hello</a:t></a:r>
            <a:br/><a:r><a:t>World</a:t></a:r></a:p></p:txBody>"#,
        );
        assert_eq!(tb.paragraphs.len(), 1);
        let para = &tb.paragraphs[0];
        assert_eq!(para.alignment(), Some(Alignment::Center));
        assert_eq!(para.level(), 1);
        assert_eq!(para.bullet(), Some(&Bullet::Character("-".into())));
        let run = para.runs().next().unwrap();
        assert_eq!(run.properties.bold, Some(true));
        assert_eq!(run.properties.size, Some(2400));
        assert_eq!(run.properties.color.as_deref(), Some("FF0000"));
        assert_eq!(run.properties.font.as_deref(), Some("Arial"));
        assert_eq!(run.properties.unknown_attrs, vec![("lang".to_string(), "en-US".to_string())]);
        assert_eq!(tb.text(), "Hello\nWorld");
        assert_eq!(tb.body_properties.attr("wrap"), Some("square"));
    }

    #[test]
    fn test_write_orders_run_children() {
        let mut props = RunProperties::default();
        props.font = Some("Calibri".into());
        props.set_color("00ff00").unwrap();
        props.set_highlight("FFFF00").unwrap();
        let elem = props.to_element("a:rPr");
        let names: Vec<&str> = elem.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["solidFill", "highlight", "latin"]);
        assert_eq!(elem.descendant(&["solidFill", "srgbClr"]).unwrap().attr("val"), Some("00FF00"));
    }

    #[test]
    fn test_set_text_keeps_formatting() {
        let mut tb = body(
            r#"<p:txBody xmlns:p="p" xmlns:a="a"><a:bodyPr/><a:p><a:r><a:rPr i="1"/><a:t>old</a:t></a:r></a:p></p:txBody>"#,
        );
        tb.set_text("one\ntwo");
        assert_eq!(tb.paragraphs.len(), 2);
        assert_eq!(tb.text(), "one\ntwo");
        for para in &tb.paragraphs {
            assert_eq!(para.runs().next().unwrap().properties.italic, Some(true));
        }
    }

    #[test]
    fn test_empty_body_writes_a_paragraph() {
        let mut tb = TextBody::default();
        tb.paragraphs.clear();
        let elem = tb.to_element("p:txBody");
        assert!(elem.child("p").is_some());
    }

    #[test]
    fn test_bullet_replaces_preserved_bullet() {
        let mut tb = body(
            r#"<p:txBody xmlns:p="p" xmlns:a="a"><a:bodyPr/><a:p><a:pPr><a:buFont typeface="Arial"/><a:buChar char="x"/></a:pPr><a:r><a:t>item</a:t></a:r></a:p></p:txBody>"#,
        );
        tb.paragraphs[0].set_bullet(Bullet::AutoNumber {
            scheme: "arabicPeriod".into(),
            start_at: Some(3),
        });
        let elem = tb.to_element("p:txBody");
        let ppr = elem.descendant(&["p", "pPr"]).unwrap();
        let names: Vec<&str> = ppr.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["buFont", "buAutoNum"]);
        assert_eq!(ppr.child("buAutoNum").unwrap().attr("startAt"), Some("3"));
    }

    #[test]
    fn test_invalid_values() {
        let mut props = RunProperties::default();
        assert_eq!(props.set_color("red").unwrap_err().code(), "validation");
        assert!(props.set_size_points(0.5).is_err());
        props.set_size_points(18.0).unwrap();
        assert_eq!(props.size, Some(1800));
        let mut para = TextParagraph::new("x");
        assert!(para.set_level(9).is_err());
    }
}
