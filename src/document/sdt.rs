//! Structured document tags (content controls), block and inline

use crate::document::body::BlockContent;
use crate::document::{Paragraph, ParagraphContent, Run};
use crate::error::{Error, Result};
use crate::xml::{RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Deepest SDT nesting that lookups descend into
pub const MAX_SDT_DEPTH: usize = 64;

/// Schema order of sdtPr children
const SDT_PR_ORDER: &[&str] = &[
    "rPr", "alias", "tag", "id", "lock", "placeholder", "temporary", "showingPlcHdr",
    "dataBinding", "label", "tabIndex", "equation", "comboBox", "date", "docPartObj",
    "docPartList", "dropDownList", "picture", "richText", "text", "citation", "group",
    "bibliography",
];

/// Lock setting of a content control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdtLock {
    SdtLocked,
    ContentLocked,
    SdtContentLocked,
    Unlocked,
}

impl SdtLock {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "sdtLocked" => Some(SdtLock::SdtLocked),
            "contentLocked" => Some(SdtLock::ContentLocked),
            "sdtContentLocked" => Some(SdtLock::SdtContentLocked),
            "unlocked" => Some(SdtLock::Unlocked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SdtLock::SdtLocked => "sdtLocked",
            SdtLock::ContentLocked => "contentLocked",
            SdtLock::SdtContentLocked => "sdtContentLocked",
            SdtLock::Unlocked => "unlocked",
        }
    }
}

/// Kind of choice list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    DropDown,
    ComboBox,
}

impl ListKind {
    fn element(&self) -> &'static str {
        match self {
            ListKind::DropDown => "w:dropDownList",
            ListKind::ComboBox => "w:comboBox",
        }
    }
}

/// One entry of a drop-down or combo-box list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    pub display_text: String,
    pub value: String,
}

impl ListItem {
    pub fn new(display_text: impl Into<String>, value: impl Into<String>) -> Self {
        ListItem {
            display_text: display_text.into(),
            value: value.into(),
        }
    }
}

/// Content control properties (w:sdtPr)
#[derive(Clone, Debug, Default)]
pub struct SdtProperties {
    /// Numeric ID
    pub id: Option<i64>,
    /// Tag
    pub tag: Option<String>,
    /// Friendly name
    pub alias: Option<String>,
    /// Lock setting
    pub lock: Option<SdtLock>,
    /// Everything else, including list and date configuration
    pub unknown_children: Vec<RawXmlElement>,
}

/// Settings for a new content control
#[derive(Clone, Debug, Default)]
pub struct ContentControlOptions {
    pub tag: String,
    pub alias: Option<String>,
    pub id: Option<i64>,
    pub lock: Option<SdtLock>,
    pub list: Option<(ListKind, Vec<ListItem>)>,
    pub date_format: Option<String>,
}

impl ContentControlOptions {
    /// Options with just a tag
    pub fn new(tag: impl Into<String>) -> Self {
        ContentControlOptions {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn lock(mut self, lock: SdtLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn list(mut self, kind: ListKind, items: Vec<ListItem>) -> Self {
        self.list = Some((kind, items));
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }
}

impl SdtProperties {
    /// Build from an `sdtPr` element
    pub fn from_raw(raw: RawXmlElement) -> Self {
        let mut props = SdtProperties::default();
        for node in raw.children {
            let RawXmlNode::Element(child) = node else { continue };
            let val = child.attr("w:val").map(str::to_string);
            let plain = child.attributes.len() == 1 && child.children.is_empty() && val.is_some();
            match child.local_name() {
                "tag" if plain => props.tag = val,
                "alias" if plain => props.alias = val,
                "id" if plain => match val.as_deref().and_then(|v| v.parse().ok()) {
                    Some(id) => props.id = Some(id),
                    None => props.unknown_children.push(child),
                },
                "lock" if plain => match val.as_deref().and_then(SdtLock::parse) {
                    Some(lock) => props.lock = Some(lock),
                    None => props.unknown_children.push(child),
                },
                _ => props.unknown_children.push(child),
            }
        }
        props
    }

    /// Build from options; the ID must be positive when given
    pub fn from_options(options: &ContentControlOptions) -> Result<Self> {
        let mut props = SdtProperties {
            tag: Some(options.tag.clone()),
            alias: options.alias.clone(),
            lock: options.lock,
            ..Default::default()
        };
        if let Some(id) = options.id {
            props.set_id(id)?;
        }
        if let Some((kind, items)) = &options.list {
            props.set_list(*kind, items);
        }
        if let Some(format) = &options.date_format {
            props.set_date_format(format);
        }
        Ok(props)
    }

    /// Set the ID (must be > 0)
    pub fn set_id(&mut self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(Error::validation("id", "content control id must be positive", id.to_string()));
        }
        self.id = Some(id);
        Ok(())
    }

    /// Drop-down or combo-box configuration
    pub fn list(&self) -> Option<(ListKind, Vec<ListItem>)> {
        let (kind, elem) = self.unknown_children.iter().find_map(|c| match c.local_name() {
            "dropDownList" => Some((ListKind::DropDown, c)),
            "comboBox" => Some((ListKind::ComboBox, c)),
            _ => None,
        })?;
        let items = elem
            .elements()
            .filter(|e| e.local_name() == "listItem")
            .map(|e| ListItem {
                display_text: e.attr("w:displayText").unwrap_or_default().to_string(),
                value: e.attr("w:value").unwrap_or_default().to_string(),
            })
            .collect();
        Some((kind, items))
    }

    /// Replace any list configuration
    pub fn set_list(&mut self, kind: ListKind, items: &[ListItem]) {
        self.unknown_children
            .retain(|c| !matches!(c.local_name(), "dropDownList" | "comboBox"));
        let mut list = RawXmlElement::new(kind.element());
        for item in items {
            list.push_child(
                RawXmlElement::new("w:listItem")
                    .with_attr("w:displayText", item.display_text.as_str())
                    .with_attr("w:value", item.value.as_str()),
            );
        }
        self.unknown_children.push(list);
    }

    /// Date picker display format
    pub fn date_format(&self) -> Option<&str> {
        self.unknown_children
            .iter()
            .find(|c| c.local_name() == "date")?
            .child("dateFormat")?
            .attr("w:val")
    }

    /// Turn this control into a date picker with the given display format
    pub fn set_date_format(&mut self, format: &str) {
        let format_elem = RawXmlElement::new("w:dateFormat").with_attr("w:val", format);
        match self.unknown_children.iter_mut().find(|c| c.local_name() == "date") {
            Some(date) => {
                date.remove_children("dateFormat");
                date.insert_child_ordered(format_elem, &["dateFormat", "lid", "storeMappedDataAs", "calendar"]);
            }
            None => self
                .unknown_children
                .push(RawXmlElement::new("w:date").with_child(format_elem)),
        }
    }

    /// Write to XML writer, children in schema order
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut items = Vec::new();
        if let Some(alias) = &self.alias {
            items.push(RawXmlElement::new("w:alias").with_attr("w:val", alias.as_str()));
        }
        if let Some(tag) = &self.tag {
            items.push(RawXmlElement::new("w:tag").with_attr("w:val", tag.as_str()));
        }
        if let Some(id) = self.id {
            items.push(RawXmlElement::new("w:id").with_attr("w:val", id.to_string()));
        }
        if let Some(lock) = self.lock {
            items.push(RawXmlElement::new("w:lock").with_attr("w:val", lock.as_str()));
        }
        items.extend(self.unknown_children.iter().cloned());
        let rank = |e: &RawXmlElement| {
            SDT_PR_ORDER
                .iter()
                .position(|n| *n == e.local_name())
                .unwrap_or(SDT_PR_ORDER.len())
        };
        items.sort_by_key(rank);

        if items.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new("w:sdtPr")))?;
            return Ok(());
        }
        writer.write_event(Event::Start(BytesStart::new("w:sdtPr")))?;
        for item in &items {
            item.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:sdtPr")))?;
        Ok(())
    }
}

/// Pieces of a w:sdt shared by the block and inline forms
struct SdtParts<T> {
    properties: SdtProperties,
    end_properties: Option<RawXmlElement>,
    content: Vec<T>,
    unknown_children: Vec<RawXmlNode>,
}

fn read_sdt<R, T, S, E>(reader: &mut Reader<R>, on_start: S, on_empty: E) -> Result<SdtParts<T>>
where
    R: BufRead,
    S: Fn(&mut Reader<R>, &BytesStart) -> Result<T>,
    E: Fn(&BytesStart) -> T,
{
    let mut parts = SdtParts {
        properties: SdtProperties::default(),
        end_properties: None,
        content: Vec::new(),
        unknown_children: Vec::new(),
    };
    let mut in_content = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let local = e.name().local_name();
                match local.as_ref() {
                    _ if in_content => parts.content.push(on_start(reader, &e)?),
                    b"sdtContent" => in_content = true,
                    b"sdtPr" => {
                        let raw = RawXmlElement::from_reader(reader, &e)?;
                        parts.properties = SdtProperties::from_raw(raw);
                    }
                    b"sdtEndPr" => {
                        parts.end_properties = Some(RawXmlElement::from_reader(reader, &e)?);
                    }
                    _ => {
                        let raw = RawXmlElement::from_reader(reader, &e)?;
                        parts.unknown_children.push(RawXmlNode::Element(raw));
                    }
                }
            }
            Event::Empty(e) => {
                let local = e.name().local_name();
                match local.as_ref() {
                    _ if in_content => parts.content.push(on_empty(&e)),
                    b"sdtPr" | b"sdtContent" => {}
                    b"sdtEndPr" => parts.end_properties = Some(RawXmlElement::from_empty(&e)),
                    _ => {
                        let raw = RawXmlElement::from_empty(&e);
                        parts.unknown_children.push(RawXmlNode::Element(raw));
                    }
                }
            }
            Event::End(e) => match e.name().local_name().as_ref() {
                b"sdtContent" => in_content = false,
                b"sdt" if !in_content => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(parts)
}

fn write_sdt<W, T, F>(
    writer: &mut Writer<W>,
    properties: &SdtProperties,
    end_properties: Option<&RawXmlElement>,
    content: &[T],
    unknown_children: &[RawXmlNode],
    write_item: F,
) -> Result<()>
where
    W: std::io::Write,
    F: Fn(&T, &mut Writer<W>) -> Result<()>,
{
    writer.write_event(Event::Start(BytesStart::new("w:sdt")))?;
    properties.write_to(writer)?;
    if let Some(end) = end_properties {
        end.write_to(writer)?;
    }
    writer.write_event(Event::Start(BytesStart::new("w:sdtContent")))?;
    for item in content {
        write_item(item, writer)?;
    }
    writer.write_event(Event::End(BytesEnd::new("w:sdtContent")))?;
    for child in unknown_children {
        child.write_to(writer)?;
    }
    writer.write_event(Event::End(BytesEnd::new("w:sdt")))?;
    Ok(())
}

/// Inline content control inside a paragraph
#[derive(Clone, Debug, Default)]
pub struct InlineSdt {
    pub properties: SdtProperties,
    pub end_properties: Option<RawXmlElement>,
    pub content: Vec<ParagraphContent>,
    pub unknown_children: Vec<RawXmlNode>,
}

impl InlineSdt {
    /// A control wrapping a single run of text
    pub fn new(properties: SdtProperties, text: &str) -> Self {
        InlineSdt {
            properties,
            content: vec![ParagraphContent::Run(Run::new(text))],
            ..Default::default()
        }
    }

    /// Parse from reader (after w:sdt start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, _start: &BytesStart) -> Result<Self> {
        let parts = read_sdt(reader, ParagraphContent::from_start, ParagraphContent::from_empty)?;
        Ok(InlineSdt {
            properties: parts.properties,
            end_properties: parts.end_properties,
            content: parts.content,
            unknown_children: parts.unknown_children,
        })
    }

    /// Visible text
    pub fn text(&self) -> String {
        self.content.iter().map(ParagraphContent::text).collect()
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        write_sdt(
            writer,
            &self.properties,
            self.end_properties.as_ref(),
            &self.content,
            &self.unknown_children,
            |item, w| item.write_to(w),
        )
    }
}

/// Block-level content control
#[derive(Clone, Debug, Default)]
pub struct BlockSdt {
    pub properties: SdtProperties,
    pub end_properties: Option<RawXmlElement>,
    pub content: Vec<BlockContent>,
    pub unknown_children: Vec<RawXmlNode>,
}

impl BlockSdt {
    /// A control wrapping a single paragraph
    pub fn new(properties: SdtProperties, text: &str) -> Self {
        BlockSdt {
            properties,
            content: vec![BlockContent::Paragraph(Paragraph::new(text))],
            ..Default::default()
        }
    }

    /// Parse from reader (after w:sdt start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, _start: &BytesStart) -> Result<Self> {
        let parts = read_sdt(reader, BlockContent::from_start, BlockContent::from_empty)?;
        Ok(BlockSdt {
            properties: parts.properties,
            end_properties: parts.end_properties,
            content: parts.content,
            unknown_children: parts.unknown_children,
        })
    }

    /// Paragraph texts joined with newlines
    pub fn text(&self) -> String {
        crate::document::body::blocks_text(&self.content)
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        write_sdt(
            writer,
            &self.properties,
            self.end_properties.as_ref(),
            &self.content,
            &self.unknown_children,
            |item, w| item.write_to(w),
        )
    }
}

/// A content control found in a document, block or inline
#[derive(Clone, Copy, Debug)]
pub enum ContentControl<'a> {
    Block(&'a BlockSdt),
    Inline(&'a InlineSdt),
}

impl<'a> ContentControl<'a> {
    pub fn properties(&self) -> &'a SdtProperties {
        match self {
            ContentControl::Block(sdt) => &sdt.properties,
            ContentControl::Inline(sdt) => &sdt.properties,
        }
    }

    pub fn tag(&self) -> Option<&'a str> {
        self.properties().tag.as_deref()
    }

    pub fn alias(&self) -> Option<&'a str> {
        self.properties().alias.as_deref()
    }

    pub fn id(&self) -> Option<i64> {
        self.properties().id
    }

    pub fn lock(&self) -> Option<SdtLock> {
        self.properties().lock
    }

    pub fn is_block(&self) -> bool {
        matches!(self, ContentControl::Block(_))
    }

    pub fn text(&self) -> String {
        match self {
            ContentControl::Block(sdt) => sdt.text(),
            ContentControl::Inline(sdt) => sdt.text(),
        }
    }
}

/// Collect content controls in document order, descending through tables,
/// hyperlinks, revisions and nested controls up to [`MAX_SDT_DEPTH`]
pub(crate) fn collect_controls<'a>(blocks: &'a [BlockContent], out: &mut Vec<ContentControl<'a>>) {
    collect_in_blocks(blocks, 0, out);
}

fn collect_in_blocks<'a>(blocks: &'a [BlockContent], depth: usize, out: &mut Vec<ContentControl<'a>>) {
    if depth > MAX_SDT_DEPTH {
        return;
    }
    for block in blocks {
        match block {
            BlockContent::Paragraph(para) => collect_in_paragraph(&para.content, depth, out),
            BlockContent::Table(table) => {
                for cell in table.rows.iter().flat_map(|r| r.cells.iter()) {
                    collect_in_blocks(&cell.content, depth + 1, out);
                }
            }
            BlockContent::ContentControl(sdt) => {
                out.push(ContentControl::Block(sdt));
                collect_in_blocks(&sdt.content, depth + 1, out);
            }
            BlockContent::Unknown(_) => {}
        }
    }
}

fn collect_in_paragraph<'a>(
    content: &'a [ParagraphContent],
    depth: usize,
    out: &mut Vec<ContentControl<'a>>,
) {
    if depth > MAX_SDT_DEPTH {
        return;
    }
    for item in content {
        match item {
            ParagraphContent::ContentControl(sdt) => {
                out.push(ContentControl::Inline(sdt));
                collect_in_paragraph(&sdt.content, depth + 1, out);
            }
            ParagraphContent::Insert(rev) | ParagraphContent::Delete(rev) => {
                collect_in_paragraph(&rev.content, depth + 1, out)
            }
            _ => {}
        }
    }
}

/// Remove the first control tagged `tag`, keeping its content in place
pub(crate) fn unwrap_control(blocks: &mut Vec<BlockContent>, tag: &str, depth: usize) -> bool {
    if depth > MAX_SDT_DEPTH {
        return false;
    }
    let hit = blocks.iter().position(|b| match b {
        BlockContent::ContentControl(sdt) => sdt.properties.tag.as_deref() == Some(tag),
        _ => false,
    });
    if let Some(pos) = hit {
        if let BlockContent::ContentControl(sdt) = blocks.remove(pos) {
            blocks.splice(pos..pos, sdt.content);
        }
        return true;
    }
    for block in blocks.iter_mut() {
        let found = match block {
            BlockContent::Paragraph(para) => unwrap_inline(&mut para.content, tag, depth),
            BlockContent::Table(table) => table
                .rows
                .iter_mut()
                .flat_map(|r| r.cells.iter_mut())
                .any(|cell| unwrap_control(&mut cell.content, tag, depth + 1)),
            BlockContent::ContentControl(sdt) => unwrap_control(&mut sdt.content, tag, depth + 1),
            BlockContent::Unknown(_) => false,
        };
        if found {
            return true;
        }
    }
    false
}

fn unwrap_inline(content: &mut Vec<ParagraphContent>, tag: &str, depth: usize) -> bool {
    if depth > MAX_SDT_DEPTH {
        return false;
    }
    let hit = content.iter().position(|c| match c {
        ParagraphContent::ContentControl(sdt) => sdt.properties.tag.as_deref() == Some(tag),
        _ => false,
    });
    if let Some(pos) = hit {
        if let ParagraphContent::ContentControl(sdt) = content.remove(pos) {
            content.splice(pos..pos, sdt.content);
        }
        return true;
    }
    content.iter_mut().any(|item| match item {
        ParagraphContent::ContentControl(sdt) => unwrap_inline(&mut sdt.content, tag, depth + 1),
        ParagraphContent::Insert(rev) | ParagraphContent::Delete(rev) => {
            unwrap_inline(&mut rev.content, tag, depth + 1)
        }
        _ => false,
    })
}

/// Highest positive control ID in a block list
pub(crate) fn max_id(blocks: &[BlockContent]) -> Option<i64> {
    let mut controls = Vec::new();
    collect_controls(blocks, &mut controls);
    controls.iter().filter_map(|c| c.id()).filter(|id| *id > 0).max()
}

impl Paragraph {
    /// Append an inline content control holding `text`
    pub fn add_content_control(&mut self, tag: &str, alias: &str, text: &str) -> &mut InlineSdt {
        let properties = SdtProperties {
            tag: Some(tag.to_string()),
            alias: (!alias.is_empty()).then(|| alias.to_string()),
            ..Default::default()
        };
        self.content
            .push(ParagraphContent::ContentControl(InlineSdt::new(properties, text)));
        match self.content.last_mut() {
            Some(ParagraphContent::ContentControl(sdt)) => sdt,
            _ => unreachable!(),
        }
    }

    /// Inline content controls directly in this paragraph
    pub fn content_controls(&self) -> impl Iterator<Item = &InlineSdt> {
        self.content.iter().filter_map(|c| match c {
            ParagraphContent::ContentControl(sdt) => Some(sdt),
            _ => None,
        })
    }
}
