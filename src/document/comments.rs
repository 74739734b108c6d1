//! Comments (comments.xml) and reply threading (commentsExtended.xml)

use crate::document::body::{self, BlockContent};
use crate::document::revision::revision_date;
use crate::document::{Paragraph, ParagraphContent, Run, RunContent};
use crate::error::{Error, Result};
use crate::xml::{self, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// A comment (w:comment)
#[derive(Clone, Debug, Default)]
pub struct Comment {
    pub id: u32,
    pub author: String,
    pub initials: Option<String>,
    pub date: Option<String>,
    /// Comment body (paragraphs)
    pub content: Vec<BlockContent>,
    /// Unknown attributes (preserved)
    pub unknown_attrs: Vec<(String, String)>,
}

/// Summary of one comment
#[derive(Clone, Debug, PartialEq)]
pub struct CommentInfo {
    pub id: u32,
    pub author: String,
    pub initials: Option<String>,
    pub date: Option<String>,
    pub text: String,
    /// ID of the comment this one replies to
    pub parent_id: Option<u32>,
}

impl Comment {
    /// A one-paragraph comment whose paragraph carries `para_id`
    pub fn new(id: u32, author: &str, text: &str, para_id: &str) -> Self {
        let mut para = Paragraph::new(text);
        para.set_para_id(para_id);
        Comment {
            id,
            author: author.to_string(),
            initials: Some(initials(author)),
            date: Some(revision_date()),
            content: vec![BlockContent::Paragraph(para)],
            unknown_attrs: Vec::new(),
        }
    }

    /// Parse from reader (after w:comment start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut comment = Comment::default();
        for (key, value) in xml::attributes_of(start) {
            match key.as_str() {
                "w:id" => match value.parse() {
                    Ok(id) => comment.id = id,
                    Err(_) => comment.unknown_attrs.push((key, value)),
                },
                "w:author" => comment.author = value,
                "w:initials" => comment.initials = Some(value),
                "w:date" => comment.date = Some(value),
                _ => comment.unknown_attrs.push((key, value)),
            }
        }
        comment.content = body::read_blocks(reader, b"comment")?;
        Ok(comment)
    }

    /// Paragraph text joined with newlines
    pub fn text(&self) -> String {
        body::blocks_text(&self.content)
    }

    /// The `w14:paraId` of the last paragraph, which commentsExtended refers to
    pub fn para_id(&self) -> Option<&str> {
        self.content.iter().rev().find_map(|b| match b {
            BlockContent::Paragraph(p) => p.para_id(),
            _ => None,
        })
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:comment");
        start.push_attribute(("w:id", self.id.to_string().as_str()));
        start.push_attribute(("w:author", self.author.as_str()));
        if let Some(date) = &self.date {
            start.push_attribute(("w:date", date.as_str()));
        }
        if let Some(initials) = &self.initials {
            start.push_attribute(("w:initials", initials.as_str()));
        }
        for (key, value) in &self.unknown_attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        for block in &self.content {
            block.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:comment")))?;
        Ok(())
    }
}

/// The comments part
#[derive(Clone, Debug)]
pub(crate) struct CommentsPart {
    root_attrs: Vec<(String, String)>,
    pub comments: Vec<Comment>,
}

impl Default for CommentsPart {
    fn default() -> Self {
        let root_attrs = xml::story_namespaces()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CommentsPart {
            root_attrs,
            comments: Vec::new(),
        }
    }
}

impl CommentsPart {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut part = CommentsPart {
            root_attrs: Vec::new(),
            comments: Vec::new(),
        };
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"comments" => part.root_attrs = xml::attributes_of(&e),
                    b"comment" => part.comments.push(Comment::from_reader(&mut reader, &e)?),
                    _ => xml::skip_element(&mut reader, &e)?,
                },
                Event::Empty(e) if e.name().local_name().as_ref() == b"comments" => {
                    part.root_attrs = xml::attributes_of(&e);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        xml::declare_namespaces(&mut part.root_attrs, &xml::story_namespaces());
        Ok(part)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        xml::write_part(|writer| {
            let mut start = BytesStart::new("w:comments");
            for (key, value) in &self.root_attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Start(start))?;
            for comment in &self.comments {
                comment.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new("w:comments")))?;
            Ok(())
        })
    }

    pub fn next_id(&self) -> u64 {
        self.comments.iter().map(|c| u64::from(c.id) + 1).max().unwrap_or(0)
    }

    /// Next free paragraph ID across the comments; IDs stay below 0x80000000
    pub fn next_para_id(&self) -> String {
        let max = self
            .comments
            .iter()
            .flat_map(|c| c.content.iter())
            .filter_map(|b| match b {
                BlockContent::Paragraph(p) => p.para_id(),
                _ => None,
            })
            .filter_map(|id| u32::from_str_radix(id, 16).ok())
            .max()
            .unwrap_or(0);
        format!("{:08X}", (max + 1) & 0x7FFF_FFFF)
    }
}

/// One `w15:commentEx` entry
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CommentEx {
    pub para_id: String,
    pub parent_para_id: Option<String>,
    pub done: bool,
}

/// The commentsExtended part
#[derive(Clone, Debug)]
pub(crate) struct CommentsExtended {
    root_attrs: Vec<(String, String)>,
    pub entries: Vec<CommentEx>,
}

impl Default for CommentsExtended {
    fn default() -> Self {
        CommentsExtended {
            root_attrs: vec![
                ("xmlns:w15".to_string(), xml::W15.to_string()),
                ("xmlns:mc".to_string(), xml::MC.to_string()),
                ("mc:Ignorable".to_string(), "w15".to_string()),
            ],
            entries: Vec::new(),
        }
    }
}

impl CommentsExtended {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut part = CommentsExtended {
            root_attrs: Vec::new(),
            entries: Vec::new(),
        };
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"commentsEx" => part.root_attrs = xml::attributes_of(&e),
                    b"commentEx" => {
                        if let Some(para_id) = xml::get_attr_local(&e, "paraId") {
                            part.entries.push(CommentEx {
                                para_id,
                                parent_para_id: xml::get_attr_local(&e, "paraIdParent"),
                                done: xml::get_attr_local(&e, "done")
                                    .map_or(false, |v| xml::parse_bool_str(&v)),
                            });
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(part)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        xml::write_part(|writer| {
            let mut start = BytesStart::new("w15:commentsEx");
            for (key, value) in &self.root_attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Start(start))?;
            for entry in &self.entries {
                let mut elem = BytesStart::new("w15:commentEx");
                elem.push_attribute(("w15:paraId", entry.para_id.as_str()));
                if let Some(parent) = &entry.parent_para_id {
                    elem.push_attribute(("w15:paraIdParent", parent.as_str()));
                }
                elem.push_attribute(("w15:done", if entry.done { "1" } else { "0" }));
                writer.write_event(Event::Empty(elem))?;
            }
            writer.write_event(Event::End(BytesEnd::new("w15:commentsEx")))?;
            Ok(())
        })
    }

    pub fn parent_of(&self, para_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.para_id == para_id)?
            .parent_para_id
            .as_deref()
    }

    /// Record `para_id` (with its parent) unless already present
    pub fn record(&mut self, para_id: &str, parent: Option<&str>) {
        match self.entries.iter_mut().find(|e| e.para_id == para_id) {
            Some(entry) => entry.parent_para_id = parent.map(str::to_string),
            None => self.entries.push(CommentEx {
                para_id: para_id.to_string(),
                parent_para_id: parent.map(str::to_string),
                done: false,
            }),
        }
    }

    pub fn forget(&mut self, para_id: &str) {
        self.entries.retain(|e| e.para_id != para_id);
    }
}

/// Initials from the first letter of each word in a name
pub fn initials(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '.' || c == '-')
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

fn reference_run(id: u32) -> Run {
    Run {
        content: vec![RunContent::CommentReference(id)],
        ..Default::default()
    }
}

/// Wrap the first occurrence of `anchor` in the paragraph's direct runs with comment markers.
///
/// A run holding more than the anchor is split so the range covers exactly the anchor text.
/// An empty anchor covers the whole paragraph.
pub(crate) fn anchor_comment(para: &mut Paragraph, anchor: &str, id: u32) -> Result<()> {
    if anchor.is_empty() {
        para.content.insert(0, ParagraphContent::CommentRangeStart(id));
        para.content.push(ParagraphContent::CommentRangeEnd(id));
        para.content.push(ParagraphContent::Run(reference_run(id)));
        return Ok(());
    }

    let found = para.content.iter().enumerate().find_map(|(i, item)| match item {
        ParagraphContent::Run(run) => run.text().find(anchor).map(|pos| (i, pos)),
        _ => None,
    });
    let (index, pos) = found.ok_or_else(|| {
        Error::InvalidValue(format!("anchor text '{}' not found in paragraph", anchor))
    })?;

    let ParagraphContent::Run(run) = para.content.remove(index) else {
        unreachable!()
    };
    let plain = run.content.iter().all(|c| matches!(c, RunContent::Text(_)));

    let mut replacement = Vec::with_capacity(5);
    if plain {
        let text = run.text();
        let (before, rest) = text.split_at(pos);
        let (middle, after) = rest.split_at(anchor.len());
        let piece = |s: &str| Run {
            content: vec![RunContent::Text(s.to_string())],
            ..run.clone()
        };
        if !before.is_empty() {
            replacement.push(ParagraphContent::Run(piece(before)));
        }
        replacement.push(ParagraphContent::CommentRangeStart(id));
        replacement.push(ParagraphContent::Run(piece(middle)));
        replacement.push(ParagraphContent::CommentRangeEnd(id));
        replacement.push(ParagraphContent::Run(reference_run(id)));
        if !after.is_empty() {
            replacement.push(ParagraphContent::Run(piece(after)));
        }
    } else {
        replacement.push(ParagraphContent::CommentRangeStart(id));
        replacement.push(ParagraphContent::Run(run));
        replacement.push(ParagraphContent::CommentRangeEnd(id));
        replacement.push(ParagraphContent::Run(reference_run(id)));
    }

    para.content.splice(index..index, replacement);
    Ok(())
}

/// Give a reply the same range as its parent; returns false when the parent has no markers
pub(crate) fn anchor_reply(blocks: &mut [BlockContent], parent: u32, id: u32) -> bool {
    let mut placed = false;
    body::for_each_paragraph_mut(blocks, &mut |para| {
        let mut i = 0;
        while i < para.content.len() {
            let follower = match &para.content[i] {
                ParagraphContent::CommentRangeStart(p) if *p == parent => {
                    Some(ParagraphContent::CommentRangeStart(id))
                }
                ParagraphContent::CommentRangeEnd(p) if *p == parent => {
                    Some(ParagraphContent::CommentRangeEnd(id))
                }
                ParagraphContent::Run(run)
                    if run
                        .content
                        .iter()
                        .any(|c| matches!(c, RunContent::CommentReference(p) if *p == parent)) =>
                {
                    placed = true;
                    Some(ParagraphContent::Run(reference_run(id)))
                }
                _ => None,
            };
            if let Some(item) = follower {
                i += 1;
                para.content.insert(i, item);
            }
            i += 1;
        }
    });
    placed
}

/// Drop range markers and reference runs of the given comments
pub(crate) fn remove_markers(blocks: &mut [BlockContent], ids: &[u32]) {
    body::for_each_paragraph_mut(blocks, &mut |para| {
        para.content.retain_mut(|item| match item {
            ParagraphContent::CommentRangeStart(id) | ParagraphContent::CommentRangeEnd(id) => {
                !ids.contains(id)
            }
            ParagraphContent::Run(run) => {
                let before = run.content.len();
                run.content
                    .retain(|c| !matches!(c, RunContent::CommentReference(id) if ids.contains(id)));
                before == run.content.len() || !run.content.is_empty()
            }
            ParagraphContent::Unknown(RawXmlNode::Element(e))
                if matches!(e.local_name(), "commentRangeStart" | "commentRangeEnd") =>
            {
                let id = e.attr("w:id").and_then(|v| v.parse::<u32>().ok());
                !id.map_or(false, |id| ids.contains(&id))
            }
            _ => true,
        });
    });
}

/// Highest comment ID referenced from content
pub(crate) fn max_marker_id(blocks: &[BlockContent]) -> Option<u32> {
    let mut max = None;
    body::for_each_paragraph(blocks, &mut |para| {
        for id in para.comment_ids() {
            max = max.max(Some(id));
        }
    });
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_initials() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("jean-luc picard"), "JLP");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_anchor_splits_run() {
        let mut para = Paragraph::new("The quick fox");
        para.runs_mut().for_each(|r| r.set_bold(true));
        anchor_comment(&mut para, "quick", 4).unwrap();

        let texts: Vec<String> = para.runs().map(Run::text).collect();
        assert_eq!(texts, vec!["The ", "quick", "", " fox"]);
        assert!(para.runs().take(2).all(Run::bold));
        assert!(matches!(para.content[1], ParagraphContent::CommentRangeStart(4)));
        assert!(matches!(para.content[3], ParagraphContent::CommentRangeEnd(4)));
        assert_eq!(para.text(), "The quick fox");
        assert_eq!(para.comment_ids(), vec![4]);

        let err = anchor_comment(&mut para, "missing", 5).unwrap_err();
        assert_eq!(err.kind().code(), "invalid-value");
    }

    #[test]
    fn test_reply_and_removal() {
        let mut para = Paragraph::new("Hello world");
        anchor_comment(&mut para, "", 0).unwrap();
        let mut blocks = vec![BlockContent::Paragraph(para)];

        assert!(anchor_reply(&mut blocks, 0, 1));
        assert_eq!(max_marker_id(&blocks), Some(1));

        remove_markers(&mut blocks, &[0, 1]);
        let BlockContent::Paragraph(para) = &blocks[0] else {
            panic!("expected paragraph")
        };
        assert_eq!(para.content.len(), 1);
        assert_eq!(para.text(), "Hello world");
    }

    #[test]
    fn test_comments_part_roundtrip() {
        let mut part = CommentsPart::default();
        let para_id = part.next_para_id();
        assert_eq!(para_id, "00000001");
        part.comments.push(Comment::new(0, "Ada Lovelace", "Check this", &para_id));
        assert_eq!(part.next_para_id(), "00000002");

        let reparsed = CommentsPart::from_bytes(&part.to_bytes().unwrap()).unwrap();
        let comment = reparsed.comments.iter().find(|c| c.id == 0).unwrap();
        assert_eq!(comment.author, "Ada Lovelace");
        assert_eq!(comment.initials.as_deref(), Some("AL"));
        assert_eq!(comment.text(), "Check this");
        assert_eq!(comment.para_id(), Some("00000001"));
        assert_eq!(reparsed.next_id(), 1);
    }

    #[test]
    fn test_comments_extended_roundtrip() {
        let mut ext = CommentsExtended::default();
        ext.record("00000001", None);
        ext.record("00000002", Some("00000001"));
        let reparsed = CommentsExtended::from_bytes(&ext.to_bytes().unwrap()).unwrap();
        assert_eq!(reparsed.entries.len(), 2);
        assert_eq!(reparsed.parent_of("00000002"), Some("00000001"));
        assert_eq!(reparsed.parent_of("00000001"), None);
    }
}
