//! Run element (w:r) - a contiguous run of text with uniform formatting

use crate::document::drawing::Drawing;
use crate::error::Result;
use crate::xml::{self, get_attr, get_w_val, parse_bool, RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Run element (w:r)
#[derive(Clone, Debug, Default)]
pub struct Run {
    /// Run properties
    pub properties: Option<RunProperties>,
    /// Run content
    pub content: Vec<RunContent>,
    /// Unknown attributes (preserved)
    pub unknown_attrs: Vec<(String, String)>,
}

/// Content within a run
#[derive(Clone, Debug)]
pub enum RunContent {
    /// Text (w:t)
    Text(String),
    /// Deleted text inside a tracked deletion (w:delText)
    DeletedText(String),
    /// Tab (w:tab)
    Tab,
    /// Break (w:br)
    Break(BreakType),
    /// Carriage return (w:cr)
    CarriageReturn,
    /// Soft hyphen
    SoftHyphen,
    /// Non-breaking hyphen
    NoBreakHyphen,
    /// Complex field character (w:fldChar)
    FieldChar(FieldCharType),
    /// Field instruction (w:instrText)
    InstrText(String),
    /// Inline or anchored drawing (w:drawing)
    Drawing(Drawing),
    /// Comment reference mark (w:commentReference)
    CommentReference(u32),
    /// Unknown (preserved)
    Unknown(RawXmlNode),
}

/// Break type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BreakType {
    #[default]
    TextWrapping,
    Page,
    Column,
}

/// Complex field character type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldCharType {
    Begin,
    Separate,
    End,
}

impl FieldCharType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "begin" => Some(Self::Begin),
            "separate" => Some(Self::Separate),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    /// Value of the `w:fldCharType` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Separate => "separate",
            Self::End => "end",
        }
    }
}

/// Run properties (w:rPr)
#[derive(Clone, Debug, Default)]
pub struct RunProperties {
    /// Style ID
    pub style: Option<String>,
    /// Bold
    pub bold: Option<bool>,
    /// Italic
    pub italic: Option<bool>,
    /// Underline type
    pub underline: Option<String>,
    /// Strike-through
    pub strike: Option<bool>,
    /// Double strike-through
    pub double_strike: Option<bool>,
    /// Font size (in half-points, e.g., 24 = 12pt)
    pub size: Option<u32>,
    /// Color (RGB hex)
    pub color: Option<String>,
    /// Highlight color
    pub highlight: Option<String>,
    /// Font (ASCII)
    pub font_ascii: Option<String>,
    /// Font (high ANSI)
    pub font_h_ansi: Option<String>,
    /// Font (East Asia)
    pub font_east_asia: Option<String>,
    /// Other rFonts attributes (theme fonts, hints)
    pub font_attrs: Vec<(String, String)>,
    /// Vertical alignment (superscript/subscript)
    pub vertical_align: Option<String>,
    /// Unknown children (preserved)
    pub unknown_children: Vec<RawXmlNode>,
}

/// Schema order of rPr children
const RPR_ORDER: &[&str] = &[
    "ins", "del", "moveFrom", "moveTo", "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps",
    "smallCaps", "strike", "dstrike", "outline", "shadow", "emboss", "imprint", "noProof",
    "snapToGrid", "vanish", "webHidden", "color", "spacing", "w", "kern", "position", "sz",
    "szCs", "highlight", "u", "effect", "bdr", "shd", "fitText", "vertAlign", "rtl", "cs", "em",
    "lang", "eastAsianLayout", "specVanish", "oMath",
];

impl Run {
    /// Parse from reader (after w:r start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut run = Run {
            unknown_attrs: xml::attributes_of(start),
            ..Default::default()
        };

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let name = e.name();
                    let local = name.local_name();

                    match local.as_ref() {
                        b"rPr" => {
                            run.properties = Some(RunProperties::from_reader(reader)?);
                        }
                        b"t" => {
                            let text = xml::read_text(reader, &e)?;
                            run.content.push(RunContent::Text(text));
                        }
                        b"delText" => {
                            let text = xml::read_text(reader, &e)?;
                            run.content.push(RunContent::DeletedText(text));
                        }
                        b"instrText" => {
                            let text = xml::read_text(reader, &e)?;
                            run.content.push(RunContent::InstrText(text));
                        }
                        b"drawing" => {
                            let raw = RawXmlElement::from_reader(reader, &e)?;
                            run.content.push(RunContent::Drawing(Drawing::new(raw)));
                        }
                        _ => {
                            let raw = RawXmlElement::from_reader(reader, &e)?;
                            run.content.push(RunContent::Unknown(RawXmlNode::Element(raw)));
                        }
                    }
                }
                Event::Empty(e) => {
                    let name = e.name();
                    let local = name.local_name();

                    match local.as_ref() {
                        b"t" => run.content.push(RunContent::Text(String::new())),
                        b"delText" => run.content.push(RunContent::DeletedText(String::new())),
                        b"instrText" => run.content.push(RunContent::InstrText(String::new())),
                        b"tab" => run.content.push(RunContent::Tab),
                        b"br" => {
                            let break_type = match get_attr(&e, "w:type").as_deref() {
                                Some("page") => BreakType::Page,
                                Some("column") => BreakType::Column,
                                _ => BreakType::TextWrapping,
                            };
                            // clear="all" and friends only survive as raw
                            if e.attributes().count() > usize::from(break_type != BreakType::TextWrapping) {
                                run.content
                                    .push(RunContent::Unknown(RawXmlNode::Element(RawXmlElement::from_empty(&e))));
                            } else {
                                run.content.push(RunContent::Break(break_type));
                            }
                        }
                        b"cr" => run.content.push(RunContent::CarriageReturn),
                        b"softHyphen" => run.content.push(RunContent::SoftHyphen),
                        b"noBreakHyphen" => run.content.push(RunContent::NoBreakHyphen),
                        b"fldChar" => {
                            let kind = get_attr(&e, "w:fldCharType")
                                .as_deref()
                                .and_then(FieldCharType::parse);
                            match kind {
                                Some(kind) if e.attributes().count() == 1 => {
                                    run.content.push(RunContent::FieldChar(kind))
                                }
                                _ => run.content.push(RunContent::Unknown(RawXmlNode::Element(
                                    RawXmlElement::from_empty(&e),
                                ))),
                            }
                        }
                        b"commentReference" => {
                            match get_attr(&e, "w:id").and_then(|v| v.parse().ok()) {
                                Some(id) => run.content.push(RunContent::CommentReference(id)),
                                None => run.content.push(RunContent::Unknown(RawXmlNode::Element(
                                    RawXmlElement::from_empty(&e),
                                ))),
                            }
                        }
                        _ => {
                            let raw = RawXmlElement::from_empty(&e);
                            run.content.push(RunContent::Unknown(RawXmlNode::Element(raw)));
                        }
                    }
                }
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"r" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(run)
    }

    /// Create from empty element
    pub fn from_empty(start: &BytesStart) -> Self {
        Run {
            unknown_attrs: xml::attributes_of(start),
            ..Default::default()
        }
    }

    /// Get all visible text in this run
    pub fn text(&self) -> String {
        let mut result = String::new();
        for content in &self.content {
            match content {
                RunContent::Text(t) => result.push_str(t),
                RunContent::Tab => result.push('\t'),
                RunContent::Break(BreakType::TextWrapping) => result.push('\n'),
                RunContent::CarriageReturn => result.push('\n'),
                RunContent::NoBreakHyphen => result.push('-'),
                _ => {}
            }
        }
        result
    }

    /// Text held in deleted-text nodes
    pub fn deleted_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                RunContent::DeletedText(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Check if bold
    pub fn bold(&self) -> bool {
        self.properties.as_ref().and_then(|p| p.bold).unwrap_or(false)
    }

    /// Check if italic
    pub fn italic(&self) -> bool {
        self.properties.as_ref().and_then(|p| p.italic).unwrap_or(false)
    }

    /// Get font size in points (None if not specified)
    pub fn font_size_pt(&self) -> Option<f32> {
        self.properties.as_ref()?.size.map(|s| s as f32 / 2.0)
    }

    /// Font size in half-points
    pub fn font_size(&self) -> Option<u32> {
        self.properties.as_ref()?.size
    }

    /// Get color (RGB hex string)
    pub fn color(&self) -> Option<&str> {
        self.properties.as_ref()?.color.as_deref()
    }

    /// Get underline type
    pub fn underline(&self) -> Option<&str> {
        self.properties.as_ref()?.underline.as_deref()
    }

    /// Check if has strike-through
    pub fn strike(&self) -> bool {
        self.properties.as_ref().and_then(|p| p.strike).unwrap_or(false)
    }

    /// Highlight color name
    pub fn highlight(&self) -> Option<&str> {
        self.properties.as_ref()?.highlight.as_deref()
    }

    /// ASCII font name
    pub fn font(&self) -> Option<&str> {
        self.properties.as_ref()?.font_ascii.as_deref()
    }

    /// Character style ID
    pub fn style(&self) -> Option<&str> {
        self.properties.as_ref()?.style.as_deref()
    }

    /// Drawings held by this run
    pub fn drawings(&self) -> impl Iterator<Item = &Drawing> {
        self.content.iter().filter_map(|c| match c {
            RunContent::Drawing(d) => Some(d),
            _ => None,
        })
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:r");
        for (key, value) in &self.unknown_attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let props = self.properties.as_ref().filter(|p| !p.is_empty());
        if props.is_none() && self.content.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(props) = props {
            props.write_to(writer)?;
        }
        for content in &self.content {
            content.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:r")))?;

        Ok(())
    }

    /// Create a new run with text
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            content: vec![RunContent::Text(text.into())],
            ..Default::default()
        }
    }

    /// Replace all text content with `text`, keeping formatting
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content.retain(|c| {
            !matches!(
                c,
                RunContent::Text(_)
                    | RunContent::Tab
                    | RunContent::Break(_)
                    | RunContent::CarriageReturn
            )
        });
        self.content.push(RunContent::Text(text.into()));
    }

    /// Append text
    pub fn add_text(&mut self, text: impl Into<String>) {
        self.content.push(RunContent::Text(text.into()));
    }

    /// Append a break
    pub fn add_break(&mut self, kind: BreakType) {
        self.content.push(RunContent::Break(kind));
    }

    /// Append a tab
    pub fn add_tab(&mut self) {
        self.content.push(RunContent::Tab);
    }

    /// Set bold
    pub fn set_bold(&mut self, bold: bool) {
        self.properties.get_or_insert_with(Default::default).bold = Some(bold);
    }

    /// Set italic
    pub fn set_italic(&mut self, italic: bool) {
        self.properties.get_or_insert_with(Default::default).italic = Some(italic);
    }

    /// Set underline (`single`, `double`, ...); `none` removes it
    pub fn set_underline(&mut self, kind: impl Into<String>) {
        let kind = kind.into();
        let props = self.properties.get_or_insert_with(Default::default);
        props.underline = if kind == "none" { None } else { Some(kind) };
    }

    /// Set strike-through
    pub fn set_strike(&mut self, strike: bool) {
        self.properties.get_or_insert_with(Default::default).strike = Some(strike);
    }

    /// Set font size in points
    pub fn set_font_size_pt(&mut self, size: f32) {
        self.set_font_size((size * 2.0).round() as u32);
    }

    /// Set font size in half-points
    pub fn set_font_size(&mut self, half_points: u32) {
        self.properties.get_or_insert_with(Default::default).size = Some(half_points);
    }

    /// Set color (RGB hex string)
    pub fn set_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        let color = color.trim_start_matches('#').to_ascii_uppercase();
        self.properties.get_or_insert_with(Default::default).color = Some(color);
    }

    /// Set highlight color (`yellow`, `green`, ...)
    pub fn set_highlight(&mut self, color: impl Into<String>) {
        self.properties.get_or_insert_with(Default::default).highlight = Some(color.into());
    }

    /// Set the Latin font for both ASCII and high-ANSI ranges
    pub fn set_font(&mut self, name: impl Into<String>) {
        let name = name.into();
        let props = self.properties.get_or_insert_with(Default::default);
        props.font_ascii = Some(name.clone());
        props.font_h_ansi = Some(name);
    }

    /// Set character style
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.properties.get_or_insert_with(Default::default).style = Some(style.into());
    }

    /// Turn visible text into deleted text
    pub(crate) fn mark_deleted(&mut self) {
        for content in &mut self.content {
            if let RunContent::Text(t) = content {
                *content = RunContent::DeletedText(std::mem::take(t));
            }
        }
    }

    /// Turn deleted text back into visible text
    pub(crate) fn restore_deleted(&mut self) {
        for content in &mut self.content {
            if let RunContent::DeletedText(t) = content {
                *content = RunContent::Text(std::mem::take(t));
            }
        }
    }
}

impl RunContent {
    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            RunContent::Text(text) => xml::write_text_element(writer, "w:t", text)?,
            RunContent::DeletedText(text) => xml::write_text_element(writer, "w:delText", text)?,
            RunContent::InstrText(text) => xml::write_text_element(writer, "w:instrText", text)?,
            RunContent::Tab => {
                writer.write_event(Event::Empty(BytesStart::new("w:tab")))?;
            }
            RunContent::Break(break_type) => {
                let mut start = BytesStart::new("w:br");
                match break_type {
                    BreakType::Page => start.push_attribute(("w:type", "page")),
                    BreakType::Column => start.push_attribute(("w:type", "column")),
                    BreakType::TextWrapping => {}
                }
                writer.write_event(Event::Empty(start))?;
            }
            RunContent::CarriageReturn => {
                writer.write_event(Event::Empty(BytesStart::new("w:cr")))?;
            }
            RunContent::SoftHyphen => {
                writer.write_event(Event::Empty(BytesStart::new("w:softHyphen")))?;
            }
            RunContent::NoBreakHyphen => {
                writer.write_event(Event::Empty(BytesStart::new("w:noBreakHyphen")))?;
            }
            RunContent::FieldChar(kind) => {
                xml::write_val_element(writer, "w:fldChar", "w:fldCharType", kind.as_str())?;
            }
            RunContent::Drawing(drawing) => drawing.write_to(writer)?,
            RunContent::CommentReference(id) => {
                xml::write_val_element(writer, "w:commentReference", "w:id", &id.to_string())?;
            }
            RunContent::Unknown(node) => node.write_to(writer)?,
        }
        Ok(())
    }

    /// Field character type, including fldChar elements kept raw
    pub fn field_char(&self) -> Option<FieldCharType> {
        match self {
            RunContent::FieldChar(kind) => Some(*kind),
            RunContent::Unknown(RawXmlNode::Element(e)) if e.local_name() == "fldChar" => {
                e.attr_local("fldCharType").and_then(FieldCharType::parse)
            }
            _ => None,
        }
    }
}

impl RunProperties {
    /// Parse from reader (after w:rPr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut props = RunProperties::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    // Typed properties are always empty elements
                    let raw = RawXmlElement::from_reader(reader, &e)?;
                    props.unknown_children.push(RawXmlNode::Element(raw));
                }
                Event::Empty(e) => {
                    let name = e.name();
                    let local = name.local_name();

                    match local.as_ref() {
                        b"rStyle" => props.style = get_w_val(&e),
                        b"b" => props.bold = Some(parse_bool(&e)),
                        b"i" => props.italic = Some(parse_bool(&e)),
                        b"u" => {
                            props.underline = get_w_val(&e).or(Some("single".into()));
                            if e.attributes().count() > 1 {
                                // underline color and theme attributes
                                props.underline = None;
                                props
                                    .unknown_children
                                    .push(RawXmlNode::Element(RawXmlElement::from_empty(&e)));
                            }
                        }
                        b"strike" => props.strike = Some(parse_bool(&e)),
                        b"dstrike" => props.double_strike = Some(parse_bool(&e)),
                        b"sz" => props.size = get_w_val(&e).and_then(|v| v.parse().ok()),
                        b"color" if e.attributes().count() == 1 => props.color = get_w_val(&e),
                        b"highlight" => props.highlight = get_w_val(&e),
                        b"vertAlign" => props.vertical_align = get_w_val(&e),
                        b"rFonts" => {
                            for (key, value) in xml::attributes_of(&e) {
                                match key.as_str() {
                                    "w:ascii" => props.font_ascii = Some(value),
                                    "w:hAnsi" => props.font_h_ansi = Some(value),
                                    "w:eastAsia" => props.font_east_asia = Some(value),
                                    _ => props.font_attrs.push((key, value)),
                                }
                            }
                        }
                        _ => {
                            let raw = RawXmlElement::from_empty(&e);
                            props.unknown_children.push(RawXmlNode::Element(raw));
                        }
                    }
                }
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"rPr" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(props)
    }

    /// Whether nothing would be written
    pub fn is_empty(&self) -> bool {
        self.to_elements().is_empty()
    }

    fn to_elements(&self) -> Vec<RawXmlElement> {
        let mut items = Vec::new();
        let on_off = |name: &str, value: bool| {
            let elem = RawXmlElement::new(name);
            if value {
                elem
            } else {
                elem.with_attr("w:val", "0")
            }
        };

        if let Some(style) = &self.style {
            items.push(RawXmlElement::new("w:rStyle").with_attr("w:val", style.as_str()));
        }
        if self.font_ascii.is_some()
            || self.font_h_ansi.is_some()
            || self.font_east_asia.is_some()
            || !self.font_attrs.is_empty()
        {
            let mut fonts = RawXmlElement::new("w:rFonts");
            for (key, value) in [
                ("w:ascii", &self.font_ascii),
                ("w:hAnsi", &self.font_h_ansi),
                ("w:eastAsia", &self.font_east_asia),
            ] {
                if let Some(value) = value {
                    fonts.set_attr(key, value.as_str());
                }
            }
            for (key, value) in &self.font_attrs {
                fonts.set_attr(key, value.as_str());
            }
            items.push(fonts);
        }
        if let Some(bold) = self.bold {
            items.push(on_off("w:b", bold));
        }
        if let Some(italic) = self.italic {
            items.push(on_off("w:i", italic));
        }
        if let Some(strike) = self.strike {
            items.push(on_off("w:strike", strike));
        }
        if let Some(dstrike) = self.double_strike {
            items.push(on_off("w:dstrike", dstrike));
        }
        if let Some(color) = &self.color {
            items.push(RawXmlElement::new("w:color").with_attr("w:val", color.as_str()));
        }
        if let Some(size) = self.size {
            items.push(RawXmlElement::new("w:sz").with_attr("w:val", size.to_string()));
        }
        if let Some(highlight) = &self.highlight {
            items.push(RawXmlElement::new("w:highlight").with_attr("w:val", highlight.as_str()));
        }
        if let Some(underline) = &self.underline {
            items.push(RawXmlElement::new("w:u").with_attr("w:val", underline.as_str()));
        }
        if let Some(valign) = &self.vertical_align {
            items.push(RawXmlElement::new("w:vertAlign").with_attr("w:val", valign.as_str()));
        }
        for child in &self.unknown_children {
            if let RawXmlNode::Element(e) = child {
                items.push(e.clone());
            }
        }

        let rank = |e: &RawXmlElement| {
            RPR_ORDER
                .iter()
                .position(|n| *n == e.local_name())
                .unwrap_or(RPR_ORDER.len())
        };
        items.sort_by_key(rank);
        items
    }

    /// Write to XML writer, children in schema order
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let items = self.to_elements();
        if items.is_empty() {
            return Ok(());
        }

        writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        for item in &items {
            item.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_run(xml: &str) -> Run {
        let mut reader = xml::reader_from_bytes(xml.as_bytes());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) if e.local_name().as_ref() == b"r" => {
                    let e = e.into_owned();
                    return Run::from_reader(&mut reader, &e).unwrap();
                }
                Event::Eof => panic!("no run"),
                _ => {}
            }
            buf.clear();
        }
    }

    fn write_run(run: &Run) -> String {
        let mut out = Vec::new();
        run.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_formatting() {
        let run = parse_run(
            r#"<w:r xmlns:w="w"><w:rPr><w:b/><w:i w:val="0"/><w:u w:val="double"/><w:sz w:val="28"/><w:highlight w:val="yellow"/><w:rFonts w:ascii="Arial" w:hint="eastAsia"/></w:rPr><w:t>Hi</w:t></w:r>"#,
        );
        assert!(run.bold());
        assert!(!run.italic());
        assert_eq!(run.underline(), Some("double"));
        assert_eq!(run.font_size_pt(), Some(14.0));
        assert_eq!(run.highlight(), Some("yellow"));
        assert_eq!(run.font(), Some("Arial"));
        assert_eq!(run.text(), "Hi");
    }

    #[test]
    fn test_properties_written_in_schema_order() {
        let mut run = Run::new("x");
        run.set_underline("single");
        run.set_font_size(24);
        run.set_bold(true);
        run.set_font("Calibri");
        let out = write_run(&run);
        let b = out.find("<w:b/>").unwrap();
        let fonts = out.find("<w:rFonts").unwrap();
        let sz = out.find("<w:sz").unwrap();
        let u = out.find("<w:u ").unwrap();
        assert!(fonts < b && b < sz && sz < u, "{}", out);
    }

    #[test]
    fn test_field_and_deleted_text() {
        let run = parse_run(
            r#"<w:r xmlns:w="w"><w:fldChar w:fldCharType="begin"/><w:instrText xml:space="preserve"> PAGE </w:instrText><w:delText>gone</w:delText></w:r>"#,
        );
        assert_eq!(run.content[0].field_char(), Some(FieldCharType::Begin));
        assert!(matches!(&run.content[1], RunContent::InstrText(t) if t == " PAGE "));
        assert_eq!(run.deleted_text(), "gone");
        assert_eq!(run.text(), "");

        let out = write_run(&run);
        assert!(out.contains(r#"<w:instrText xml:space="preserve"> PAGE </w:instrText>"#));
    }

    #[test]
    fn test_space_preserved_text() {
        let run = Run::new("  two  spaces ");
        let out = write_run(&run);
        assert!(out.contains(r#"<w:t xml:space="preserve">  two  spaces </w:t>"#));
        assert_eq!(parse_run(&out.replace("<w:r>", r#"<w:r xmlns:w="w">"#)).text(), "  two  spaces ");
    }

    #[test]
    fn test_mark_deleted_and_restore() {
        let mut run = Run::new("abc");
        run.mark_deleted();
        assert_eq!(run.text(), "");
        assert_eq!(run.deleted_text(), "abc");
        run.restore_deleted();
        assert_eq!(run.text(), "abc");
    }

    #[test]
    fn test_unknown_content_preserved() {
        let run = parse_run(r#"<w:r xmlns:w="w"><w:sym w:font="Wingdings" w:char="F04A"/></w:r>"#);
        let out = write_run(&run);
        assert!(out.contains(r#"<w:sym w:font="Wingdings" w:char="F04A"/>"#));
    }
}
