//! Paragraph element (w:p)

use crate::document::hyperlink::Hyperlink;
use crate::document::revision::Revision;
use crate::document::sdt::InlineSdt;
use crate::document::{FieldCharType, Run, RunContent};
use crate::error::{Error, Result};
use crate::xml::{self, get_w_val, RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Paragraph element (w:p)
#[derive(Clone, Debug, Default)]
pub struct Paragraph {
    /// Paragraph properties
    pub properties: Option<ParagraphProperties>,
    /// Paragraph content (runs, hyperlinks, etc.)
    pub content: Vec<ParagraphContent>,
    /// Unknown attributes (preserved for round-trip)
    pub unknown_attrs: Vec<(String, String)>,
}

/// Content within a paragraph
#[derive(Clone, Debug)]
pub enum ParagraphContent {
    /// Text run
    Run(Run),
    /// Hyperlink
    Hyperlink(Hyperlink),
    /// Tracked insertion (w:ins)
    Insert(Revision),
    /// Tracked deletion (w:del)
    Delete(Revision),
    /// Start of a commented range
    CommentRangeStart(u32),
    /// End of a commented range
    CommentRangeEnd(u32),
    /// Bookmark start
    BookmarkStart { id: u32, name: String },
    /// Bookmark end
    BookmarkEnd { id: u32 },
    /// Inline content control
    ContentControl(InlineSdt),
    /// Unknown element (preserved)
    Unknown(RawXmlNode),
}

/// A complex field read back from a paragraph
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Field code, e.g. `PAGE` or `HYPERLINK "..."`
    pub instruction: String,
    /// Last computed result text
    pub result: String,
}

/// Paragraph properties (w:pPr)
#[derive(Clone, Debug, Default)]
pub struct ParagraphProperties {
    /// Style ID
    pub style: Option<String>,
    /// Justification/alignment
    pub justification: Option<String>,
    /// Numbering properties
    pub num_id: Option<u32>,
    pub num_level: Option<u32>,
    /// Outline level (for headings)
    pub outline_level: Option<u8>,
    /// Unknown children (preserved)
    pub unknown_children: Vec<RawXmlNode>,
}

/// Schema order of pPr children
const PPR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku", "wordWrap",
    "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi", "adjustRightInd",
    "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents", "suppressOverlap", "jc",
    "textDirection", "textAlignment", "textboxTightWrap", "outlineLvl", "divId", "cnfStyle",
    "rPr", "sectPr", "pPrChange",
];

impl Paragraph {
    /// Parse paragraph from reader (after w:p start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut para = Paragraph {
            unknown_attrs: xml::attributes_of(start),
            ..Default::default()
        };

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    if e.name().local_name().as_ref() == b"pPr" {
                        para.properties = Some(ParagraphProperties::from_reader(reader)?);
                    } else {
                        para.content.push(ParagraphContent::from_start(reader, &e)?);
                    }
                }
                Event::Empty(e) => {
                    if e.name().local_name().as_ref() != b"pPr" {
                        para.content.push(ParagraphContent::from_empty(&e));
                    }
                }
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"p" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(para)
    }

    /// Create from empty element
    pub fn from_empty(start: &BytesStart) -> Self {
        Paragraph {
            unknown_attrs: xml::attributes_of(start),
            ..Default::default()
        }
    }

    /// Get all visible text in this paragraph
    pub fn text(&self) -> String {
        self.content.iter().map(ParagraphContent::text).collect()
    }

    /// Get style ID
    pub fn style(&self) -> Option<&str> {
        self.properties.as_ref()?.style.as_deref()
    }

    /// Get justification (`left`, `center`, `right`, `both`, ...)
    pub fn alignment(&self) -> Option<&str> {
        self.properties.as_ref()?.justification.as_deref()
    }

    /// Numbering as (numId, level)
    pub fn numbering(&self) -> Option<(u32, u32)> {
        let props = self.properties.as_ref()?;
        Some((props.num_id?, props.num_level.unwrap_or(0)))
    }

    /// Get direct runs
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.content.iter().filter_map(|c| match c {
            ParagraphContent::Run(r) => Some(r),
            _ => None,
        })
    }

    /// Runs at any depth, including those inside hyperlinks, tracked changes and inline content controls
    pub fn all_runs(&self) -> Vec<&Run> {
        let mut out = Vec::new();
        collect_runs(&self.content, &mut out);
        out
    }

    /// Get direct runs mutably
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.content.iter_mut().filter_map(|c| match c {
            ParagraphContent::Run(r) => Some(r),
            _ => None,
        })
    }

    /// Get hyperlinks
    pub fn hyperlinks(&self) -> impl Iterator<Item = &Hyperlink> {
        self.content.iter().filter_map(|c| match c {
            ParagraphContent::Hyperlink(h) => Some(h),
            _ => None,
        })
    }

    /// Bookmarks started in this paragraph as (id, name)
    pub fn bookmarks(&self) -> impl Iterator<Item = (u32, &str)> {
        self.content.iter().filter_map(|c| match c {
            ParagraphContent::BookmarkStart { id, name } => Some((*id, name.as_str())),
            _ => None,
        })
    }

    /// Check if this is a heading (has outline level or heading style)
    pub fn is_heading(&self) -> bool {
        if let Some(ref props) = self.properties {
            if props.outline_level.is_some() {
                return true;
            }
            if let Some(ref style) = props.style {
                return style.starts_with("Heading") || style.starts_with("heading");
            }
        }
        false
    }

    /// The `w14:paraId` of this paragraph
    pub fn para_id(&self) -> Option<&str> {
        self.unknown_attrs
            .iter()
            .find(|(k, _)| k == "w14:paraId")
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_para_id(&mut self, id: &str) {
        match self.unknown_attrs.iter_mut().find(|(k, _)| k == "w14:paraId") {
            Some(slot) => slot.1 = id.to_string(),
            None => self.unknown_attrs.push(("w14:paraId".into(), id.to_string())),
        }
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:p");
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
        writer.write_event(Event::End(BytesEnd::new("w:p")))?;

        Ok(())
    }

    /// Create a new paragraph with text
    pub fn new(text: impl Into<String>) -> Self {
        Paragraph {
            content: vec![ParagraphContent::Run(Run::new(text))],
            ..Default::default()
        }
    }

    /// Add a run to this paragraph
    pub fn add_run(&mut self, run: Run) -> &mut Run {
        self.content.push(ParagraphContent::Run(run));
        match self.content.last_mut() {
            Some(ParagraphContent::Run(run)) => run,
            _ => unreachable!(),
        }
    }

    /// Set style
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.properties.get_or_insert_with(Default::default).style = Some(style.into());
    }

    /// Set justification (`left`, `center`, `right`, `both`, `distribute`)
    pub fn set_alignment(&mut self, alignment: &str) -> Result<()> {
        const ALLOWED: &[&str] = &["left", "start", "center", "right", "end", "both", "distribute"];
        if !ALLOWED.contains(&alignment) {
            return Err(Error::validation("alignment", "unsupported paragraph alignment", alignment));
        }
        self.properties.get_or_insert_with(Default::default).justification =
            Some(alignment.to_string());
        Ok(())
    }

    /// Make this paragraph a list item of `num_id` at indent `level` (0-8)
    pub fn set_numbering(&mut self, num_id: u32, level: u32) -> Result<()> {
        if level > 8 {
            return Err(Error::validation("level", "list level must be 0-8", level.to_string()));
        }
        let props = self.properties.get_or_insert_with(Default::default);
        props.num_id = Some(num_id);
        props.num_level = Some(level);
        Ok(())
    }

    /// Remove list membership
    pub fn clear_numbering(&mut self) {
        if let Some(props) = self.properties.as_mut() {
            props.num_id = None;
            props.num_level = None;
        }
    }

    /// Append an external hyperlink; its relationship is created when the document is saved
    pub fn add_hyperlink(&mut self, url: &str, text: &str) -> Result<&mut Hyperlink> {
        if url.is_empty() {
            return Err(Error::InvalidValue("hyperlink URL cannot be empty".into()));
        }
        self.content
            .push(ParagraphContent::Hyperlink(Hyperlink::external(url, text)));
        Ok(self.last_hyperlink())
    }

    /// Append a hyperlink to a bookmark in this document
    pub fn add_anchor_link(&mut self, anchor: &str, text: &str) -> Result<&mut Hyperlink> {
        if anchor.is_empty() {
            return Err(Error::InvalidValue("hyperlink anchor cannot be empty".into()));
        }
        self.content
            .push(ParagraphContent::Hyperlink(Hyperlink::internal(anchor, text)));
        Ok(self.last_hyperlink())
    }

    fn last_hyperlink(&mut self) -> &mut Hyperlink {
        match self.content.last_mut() {
            Some(ParagraphContent::Hyperlink(link)) => link,
            _ => unreachable!(),
        }
    }

    /// Append a complex field: begin, instruction, separate, placeholder result, end
    pub fn add_field(&mut self, instruction: &str, placeholder: &str) -> Result<()> {
        if instruction.trim().is_empty() {
            return Err(Error::InvalidValue("field instruction cannot be empty".into()));
        }
        let char_run = |kind| Run {
            content: vec![RunContent::FieldChar(kind)],
            ..Default::default()
        };
        let instr = format!(" {} ", instruction.trim());

        self.content.push(ParagraphContent::Run(char_run(FieldCharType::Begin)));
        self.content.push(ParagraphContent::Run(Run {
            content: vec![RunContent::InstrText(instr)],
            ..Default::default()
        }));
        self.content.push(ParagraphContent::Run(char_run(FieldCharType::Separate)));
        if !placeholder.is_empty() {
            self.content.push(ParagraphContent::Run(Run::new(placeholder)));
        }
        self.content.push(ParagraphContent::Run(char_run(FieldCharType::End)));
        Ok(())
    }

    /// Complex fields found in this paragraph's direct runs
    pub fn fields(&self) -> Vec<Field> {
        #[derive(PartialEq)]
        enum State {
            Outside,
            Instruction,
            Result,
        }

        let mut fields = Vec::new();
        let mut state = State::Outside;
        let mut current = Field {
            instruction: String::new(),
            result: String::new(),
        };

        for run in self.runs() {
            for content in &run.content {
                match content.field_char() {
                    Some(FieldCharType::Begin) => {
                        state = State::Instruction;
                        current.instruction.clear();
                        current.result.clear();
                    }
                    Some(FieldCharType::Separate) if state == State::Instruction => {
                        state = State::Result;
                    }
                    Some(FieldCharType::End) if state != State::Outside => {
                        fields.push(Field {
                            instruction: current.instruction.trim().to_string(),
                            result: std::mem::take(&mut current.result),
                        });
                        state = State::Outside;
                    }
                    _ => match (content, &state) {
                        (RunContent::InstrText(t), State::Instruction) => {
                            current.instruction.push_str(t)
                        }
                        (RunContent::Text(t), State::Result) => current.result.push_str(t),
                        _ => {}
                    },
                }
            }
        }

        fields
    }

    /// Ids of comment ranges opened in this paragraph
    pub fn comment_ids(&self) -> Vec<u32> {
        self.content
            .iter()
            .filter_map(|c| match c {
                ParagraphContent::CommentRangeStart(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl ParagraphContent {
    /// Parse paragraph-level content from a start tag
    pub fn from_start<R: BufRead>(reader: &mut Reader<R>, e: &BytesStart) -> Result<Self> {
        let local = e.name().local_name();
        let item = match local.as_ref() {
            b"r" => ParagraphContent::Run(Run::from_reader(reader, e)?),
            b"hyperlink" => ParagraphContent::Hyperlink(Hyperlink::from_reader(reader, e)?),
            b"ins" => ParagraphContent::Insert(Revision::from_reader(reader, e)?),
            b"del" => ParagraphContent::Delete(Revision::from_reader(reader, e)?),
            b"sdt" => ParagraphContent::ContentControl(InlineSdt::from_reader(reader, e)?),
            _ => {
                let raw = RawXmlElement::from_reader(reader, e)?;
                match Self::from_marker(&raw) {
                    Some(marker) if raw.elements().next().is_none() => marker,
                    _ => ParagraphContent::Unknown(RawXmlNode::Element(raw)),
                }
            }
        };
        Ok(item)
    }

    /// Parse paragraph-level content from an empty tag
    pub fn from_empty(e: &BytesStart) -> Self {
        let local = e.name().local_name();
        match local.as_ref() {
            b"r" => ParagraphContent::Run(Run::from_empty(e)),
            _ => {
                let raw = RawXmlElement::from_empty(e);
                Self::from_marker(&raw).unwrap_or(ParagraphContent::Unknown(RawXmlNode::Element(raw)))
            }
        }
    }

    /// Comment and bookmark markers that carry nothing beyond their typed attributes
    fn from_marker(raw: &RawXmlElement) -> Option<Self> {
        let id = raw.attr("w:id")?.parse().ok()?;
        let only = |names: &[&str]| raw.attributes.iter().all(|(k, _)| names.contains(&k.as_str()));
        match raw.local_name() {
            "commentRangeStart" if only(&["w:id"]) => Some(ParagraphContent::CommentRangeStart(id)),
            "commentRangeEnd" if only(&["w:id"]) => Some(ParagraphContent::CommentRangeEnd(id)),
            "bookmarkStart" if only(&["w:id", "w:name"]) => Some(ParagraphContent::BookmarkStart {
                id,
                name: raw.attr("w:name").unwrap_or_default().to_string(),
            }),
            "bookmarkEnd" if only(&["w:id"]) => Some(ParagraphContent::BookmarkEnd { id }),
            _ => None,
        }
    }

    /// Visible text of this item
    pub fn text(&self) -> String {
        match self {
            ParagraphContent::Run(run) => run.text(),
            ParagraphContent::Hyperlink(link) => link.text(),
            ParagraphContent::Insert(rev) => rev.content.iter().map(Self::text).collect(),
            ParagraphContent::ContentControl(sdt) => sdt.text(),
            _ => String::new(),
        }
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            ParagraphContent::Run(run) => run.write_to(writer),
            ParagraphContent::Hyperlink(link) => link.write_to(writer),
            ParagraphContent::Insert(rev) => rev.write_to(writer, "w:ins"),
            ParagraphContent::Delete(rev) => rev.write_to(writer, "w:del"),
            ParagraphContent::CommentRangeStart(id) => {
                xml::write_val_element(writer, "w:commentRangeStart", "w:id", &id.to_string())
            }
            ParagraphContent::CommentRangeEnd(id) => {
                xml::write_val_element(writer, "w:commentRangeEnd", "w:id", &id.to_string())
            }
            ParagraphContent::BookmarkStart { id, name } => {
                let mut elem = BytesStart::new("w:bookmarkStart");
                elem.push_attribute(("w:id", id.to_string().as_str()));
                elem.push_attribute(("w:name", name.as_str()));
                writer.write_event(Event::Empty(elem))?;
                Ok(())
            }
            ParagraphContent::BookmarkEnd { id } => {
                xml::write_val_element(writer, "w:bookmarkEnd", "w:id", &id.to_string())
            }
            ParagraphContent::ContentControl(sdt) => sdt.write_to(writer),
            ParagraphContent::Unknown(node) => node.write_to(writer),
        }
    }
}

impl ParagraphProperties {
    /// Parse from reader (after w:pPr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut props = ParagraphProperties::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let raw = RawXmlElement::from_reader(reader, &e)?;
                    let typed = raw.local_name() == "numPr" && apply_num_pr(&raw, &mut props);
                    if !typed {
                        props.unknown_children.push(RawXmlNode::Element(raw));
                    }
                }
                Event::Empty(e) => {
                    let name = e.name();
                    let local = name.local_name();

                    match local.as_ref() {
                        b"pStyle" => props.style = get_w_val(&e),
                        b"jc" => props.justification = get_w_val(&e),
                        b"outlineLvl" => {
                            props.outline_level = get_w_val(&e).and_then(|v| v.parse().ok())
                        }
                        _ => {
                            let raw = RawXmlElement::from_empty(&e);
                            props.unknown_children.push(RawXmlNode::Element(raw));
                        }
                    }
                }
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"pPr" {
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
        self.style.is_none()
            && self.justification.is_none()
            && self.num_id.is_none()
            && self.num_level.is_none()
            && self.outline_level.is_none()
            && self.unknown_children.is_empty()
    }

    /// Write to XML writer, children in schema order
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let mut items = Vec::new();
        if let Some(style) = &self.style {
            items.push(RawXmlElement::new("w:pStyle").with_attr("w:val", style.as_str()));
        }
        if self.num_id.is_some() || self.num_level.is_some() {
            let mut num_pr = RawXmlElement::new("w:numPr");
            if let Some(level) = self.num_level {
                num_pr.push_child(RawXmlElement::new("w:ilvl").with_attr("w:val", level.to_string()));
            }
            if let Some(num_id) = self.num_id {
                num_pr.push_child(RawXmlElement::new("w:numId").with_attr("w:val", num_id.to_string()));
            }
            items.push(num_pr);
        }
        if let Some(jc) = &self.justification {
            items.push(RawXmlElement::new("w:jc").with_attr("w:val", jc.as_str()));
        }
        if let Some(level) = self.outline_level {
            items.push(RawXmlElement::new("w:outlineLvl").with_attr("w:val", level.to_string()));
        }
        items.extend(self.unknown_children.iter().filter_map(|c| c.as_element().cloned()));

        let rank = |e: &RawXmlElement| {
            PPR_ORDER
                .iter()
                .position(|n| *n == e.local_name())
                .unwrap_or(PPR_ORDER.len())
        };
        items.sort_by_key(rank);

        writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        for item in &items {
            item.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
        Ok(())
    }
}

/// Read numId/ilvl out of a numPr element; false when it carries anything else
fn apply_num_pr(num_pr: &RawXmlElement, props: &mut ParagraphProperties) -> bool {
    let mut typed = true;
    for child in num_pr.elements() {
        let value = child.attr("w:val").and_then(|v| v.parse().ok());
        match (child.local_name(), value) {
            ("numId", Some(v)) => props.num_id = Some(v),
            ("ilvl", Some(v)) => props.num_level = Some(v),
            _ => typed = false,
        }
    }
    if !typed {
        props.num_id = None;
        props.num_level = None;
    }
    typed
}

fn collect_runs<'a>(content: &'a [ParagraphContent], out: &mut Vec<&'a Run>) {
    for item in content {
        match item {
            ParagraphContent::Run(run) => out.push(run),
            ParagraphContent::Hyperlink(link) => out.extend(link.runs.iter()),
            ParagraphContent::Insert(rev) | ParagraphContent::Delete(rev) => collect_runs(&rev.content, out),
            ParagraphContent::ContentControl(sdt) => collect_runs(&sdt.content, out),
            _ => {}
        }
    }
}

/// Largest drawing (`docPr`) and bookmark IDs seen so far, preserved XML included
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct UsedIds {
    pub doc_pr: Option<u32>,
    pub bookmark: Option<u32>,
}

impl UsedIds {
    pub(crate) fn observe(&mut self, content: &[ParagraphContent]) {
        for item in content {
            match item {
                ParagraphContent::Run(run) => self.observe_run(run),
                ParagraphContent::Hyperlink(link) => link.runs.iter().for_each(|r| self.observe_run(r)),
                ParagraphContent::Insert(rev) | ParagraphContent::Delete(rev) => self.observe(&rev.content),
                ParagraphContent::ContentControl(sdt) => {
                    self.observe(&sdt.content);
                    sdt.unknown_children.iter().for_each(|n| self.observe_raw(n));
                }
                ParagraphContent::BookmarkStart { id, .. } => self.bookmark = self.bookmark.max(Some(*id)),
                ParagraphContent::Unknown(node) => self.observe_raw(node),
                _ => {}
            }
        }
    }

    fn observe_run(&mut self, run: &Run) {
        for item in &run.content {
            match item {
                RunContent::Drawing(drawing) => {
                    self.doc_pr = self.doc_pr.max(drawing.doc_pr_id());
                    self.observe_element(&drawing.element);
                }
                RunContent::Unknown(node) => self.observe_raw(node),
                _ => {}
            }
        }
    }

    pub(crate) fn observe_raw(&mut self, node: &RawXmlNode) {
        if let RawXmlNode::Element(element) = node {
            self.observe_element(element);
        }
    }

    fn observe_element(&mut self, element: &RawXmlElement) {
        let mut found = vec![element];
        element.find_all("docPr", &mut found);
        element.find_all("bookmarkStart", &mut found);
        for e in found {
            let id = e.attr_local("id").and_then(|v| v.parse::<u32>().ok());
            match e.local_name() {
                "docPr" => self.doc_pr = self.doc_pr.max(id),
                "bookmarkStart" => self.bookmark = self.bookmark.max(id),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(xml_text: &str) -> Paragraph {
        let mut reader = xml::reader_from_bytes(xml_text.as_bytes());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) if e.local_name().as_ref() == b"p" => {
                    let e = e.into_owned();
                    return Paragraph::from_reader(&mut reader, &e).unwrap();
                }
                Event::Eof => panic!("no paragraph"),
                _ => {}
            }
            buf.clear();
        }
    }

    fn write(para: &Paragraph) -> String {
        let mut out = Vec::new();
        para.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_used_ids_look_inside_wrappers() {
        let para = parse(
            r#"<w:p xmlns:w="w" xmlns:wp="wp" xmlns:mc="mc">
            <w:ins w:id="1" w:author="Ann"><w:r><w:drawing><wp:inline><wp:docPr id="7" name="Picture 7"/></wp:inline></w:drawing></w:r></w:ins>
            <w:hyperlink w:anchor="top"><w:r><w:drawing><wp:inline><wp:docPr id="4" name="Picture 4"/></wp:inline></w:drawing></w:r></w:hyperlink>
            <w:sdt><w:sdtContent><w:bookmarkStart w:id="12" w:name="inner"/><w:r><w:t>x</w:t></w:r></w:sdtContent></w:sdt>
            <w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:drawing><wp:anchor><wp:docPr id="9" name="Shape 9"/></wp:anchor></w:drawing></mc:Choice></mc:AlternateContent></w:r>
            <w:bookmarkStart w:id="15" w:name="cols" w:colFirst="0" w:colLast="1"/>
            </w:p>"#,
        );
        let mut used = UsedIds::default();
        used.observe(&para.content);
        assert_eq!(used.doc_pr, Some(9));
        assert_eq!(used.bookmark, Some(15));
        assert_eq!(para.all_runs().len(), 4);
    }

    #[test]
    fn test_mixed_content_order() {
        let para = parse(
            r#"<w:p xmlns:w="w" w:rsidR="00AB"><w:pPr><w:jc w:val="center"/><w:pStyle w:val="Title"/></w:pPr><w:bookmarkStart w:id="3" w:name="top"/><w:r><w:t>A</w:t></w:r><w:commentRangeStart w:id="0"/><w:r><w:t>B</w:t></w:r><w:commentRangeEnd w:id="0"/><w:bookmarkEnd w:id="3"/></w:p>"#,
        );
        assert_eq!(para.text(), "AB");
        assert_eq!(para.style(), Some("Title"));
        assert_eq!(para.alignment(), Some("center"));
        assert_eq!(para.bookmarks().collect::<Vec<_>>(), vec![(3, "top")]);
        assert_eq!(para.comment_ids(), vec![0]);
        assert!(matches!(para.content[2], ParagraphContent::CommentRangeStart(0)));

        let out = write(&para);
        assert!(
            out.contains(r#"<w:pPr><w:pStyle w:val="Title"/><w:jc w:val="center"/></w:pPr><w:bookmarkStart"#),
            "{}",
            out
        );
    }

    #[test]
    fn test_insert_text_is_visible_delete_is_not() {
        let para = parse(
            r#"<w:p xmlns:w="w"><w:r><w:t>keep </w:t></w:r><w:ins w:id="1" w:author="A"><w:r><w:t>new</w:t></w:r></w:ins><w:del w:id="2" w:author="A"><w:r><w:delText>old</w:delText></w:r></w:del></w:p>"#,
        );
        assert_eq!(para.text(), "keep new");
    }

    #[test]
    fn test_add_field_reads_back() {
        let mut para = Paragraph::default();
        para.add_field("PAGE", "1").unwrap();
        let fields = para.fields();
        assert_eq!(
            fields,
            vec![Field {
                instruction: "PAGE".into(),
                result: "1".into()
            }]
        );
        assert!(para.add_field("  ", "x").is_err());

        let reparsed = parse(&write(&para).replacen("<w:p>", r#"<w:p xmlns:w="w">"#, 1));
        assert_eq!(reparsed.fields(), fields);
    }

    #[test]
    fn test_numbering_roundtrip() {
        let mut para = Paragraph::new("item");
        para.set_numbering(4, 1).unwrap();
        assert!(para.set_numbering(4, 9).is_err());
        let out = write(&para);
        assert!(out.contains(r#"<w:numPr><w:ilvl w:val="1"/><w:numId w:val="4"/></w:numPr>"#));
        let reparsed = parse(&out.replacen("<w:p>", r#"<w:p xmlns:w="w">"#, 1));
        assert_eq!(reparsed.numbering(), Some((4, 1)));
    }

    #[test]
    fn test_marker_with_extra_attributes_kept_raw() {
        let para = parse(
            r#"<w:p xmlns:w="w"><w:bookmarkStart w:id="1" w:name="t" w:colFirst="0"/></w:p>"#,
        );
        assert!(matches!(para.content[0], ParagraphContent::Unknown(_)));
        assert!(write(&para).contains(r#"w:colFirst="0""#));
    }

    #[test]
    fn test_invalid_alignment() {
        let mut para = Paragraph::default();
        let err = para.set_alignment("middle").unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
