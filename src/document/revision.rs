//! Tracked changes: w:ins / w:del wrappers and their resolution

use crate::document::body::BlockContent;
use crate::document::{ParagraphContent, Run};
use crate::error::Result;
use crate::xml;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// A tracked insertion or deletion
#[derive(Clone, Debug, Default)]
pub struct Revision {
    /// Revision ID
    pub id: u32,
    /// Author
    pub author: Option<String>,
    /// ISO-8601 date
    pub date: Option<String>,
    /// Wrapped content
    pub content: Vec<ParagraphContent>,
    /// Unknown attributes (preserved)
    pub unknown_attrs: Vec<(String, String)>,
}

/// Kind of tracked change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisionKind {
    Insert,
    Delete,
}

/// Summary of one tracked change
#[derive(Clone, Debug, PartialEq)]
pub struct RevisionInfo {
    pub id: u32,
    pub kind: RevisionKind,
    pub author: Option<String>,
    pub date: Option<String>,
    /// Inserted or deleted text
    pub text: String,
}

impl Revision {
    /// A revision stamped with the current time
    pub fn new(id: u32, author: &str, content: Vec<ParagraphContent>) -> Self {
        Revision {
            id,
            author: Some(author.to_string()),
            date: Some(revision_date()),
            content,
            unknown_attrs: Vec::new(),
        }
    }

    /// Parse from reader (after w:ins / w:del start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut rev = Revision::default();
        for (key, value) in xml::attributes_of(start) {
            match key.as_str() {
                "w:id" => match value.parse() {
                    Ok(id) => rev.id = id,
                    Err(_) => rev.unknown_attrs.push((key, value)),
                },
                "w:author" => rev.author = Some(value),
                "w:date" => rev.date = Some(value),
                _ => rev.unknown_attrs.push((key, value)),
            }
        }

        let end = start.name().as_ref().to_vec();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => rev.content.push(ParagraphContent::from_start(reader, &e)?),
                Event::Empty(e) => rev.content.push(ParagraphContent::from_empty(&e)),
                Event::End(e) => {
                    if e.name().as_ref() == end.as_slice() {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rev)
    }

    /// Write as `name` (`w:ins` or `w:del`)
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>, name: &str) -> Result<()> {
        let mut start = BytesStart::new(name);
        start.push_attribute(("w:id", self.id.to_string().as_str()));
        if let Some(author) = &self.author {
            start.push_attribute(("w:author", author.as_str()));
        }
        if let Some(date) = &self.date {
            start.push_attribute(("w:date", date.as_str()));
        }
        for (key, value) in &self.unknown_attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.content.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for item in &self.content {
            item.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Inserted text, or deleted text for a deletion
    fn text(&self, kind: RevisionKind) -> String {
        let mut out = String::new();
        for item in &self.content {
            match (item, kind) {
                (ParagraphContent::Run(run), RevisionKind::Delete) => out.push_str(&run.deleted_text()),
                (other, _) => out.push_str(&other.text()),
            }
        }
        out
    }
}

/// Current UTC time in the form used for `w:date`
pub(crate) fn revision_date() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Wrap runs in a deletion, turning their text into deleted text
pub(crate) fn deletion(id: u32, author: &str, mut run: Run) -> Revision {
    run.mark_deleted();
    Revision::new(id, author, vec![ParagraphContent::Run(run)])
}

/// Collect revisions in document order
pub(crate) fn collect(content: &[ParagraphContent], out: &mut Vec<RevisionInfo>) {
    for item in content {
        match item {
            ParagraphContent::Insert(rev) | ParagraphContent::Delete(rev) => {
                let kind = if matches!(item, ParagraphContent::Insert(_)) {
                    RevisionKind::Insert
                } else {
                    RevisionKind::Delete
                };
                out.push(RevisionInfo {
                    id: rev.id,
                    kind,
                    author: rev.author.clone(),
                    date: rev.date.clone(),
                    text: rev.text(kind),
                });
                collect(&rev.content, out);
            }
            ParagraphContent::ContentControl(sdt) => collect(&sdt.content, out),
            _ => {}
        }
    }
}

/// Accept or reject revisions; `only` restricts to one ID. Returns how many were resolved.
pub(crate) fn resolve(content: &mut Vec<ParagraphContent>, only: Option<u32>, accept: bool) -> usize {
    let mut resolved = 0;
    let mut out = Vec::with_capacity(content.len());

    for item in content.drain(..) {
        match item {
            ParagraphContent::Insert(mut rev) if only.map_or(true, |id| id == rev.id) => {
                resolved += 1;
                if accept {
                    resolved += resolve(&mut rev.content, only, accept);
                    out.extend(rev.content);
                }
            }
            ParagraphContent::Delete(mut rev) if only.map_or(true, |id| id == rev.id) => {
                resolved += 1;
                if !accept {
                    resolved += resolve(&mut rev.content, only, accept);
                    for mut inner in rev.content {
                        if let ParagraphContent::Run(run) = &mut inner {
                            run.restore_deleted();
                        }
                        out.push(inner);
                    }
                }
            }
            ParagraphContent::Insert(mut rev) => {
                resolved += resolve(&mut rev.content, only, accept);
                out.push(ParagraphContent::Insert(rev));
            }
            ParagraphContent::Delete(mut rev) => {
                resolved += resolve(&mut rev.content, only, accept);
                out.push(ParagraphContent::Delete(rev));
            }
            ParagraphContent::ContentControl(mut sdt) => {
                resolved += resolve(&mut sdt.content, only, accept);
                out.push(ParagraphContent::ContentControl(sdt));
            }
            other => out.push(other),
        }
    }

    *content = out;
    resolved
}

/// Resolve revisions in every paragraph of a block list
pub(crate) fn resolve_blocks(blocks: &mut [BlockContent], only: Option<u32>, accept: bool) -> usize {
    let mut resolved = 0;
    crate::document::body::for_each_paragraph_mut(blocks, &mut |para| {
        resolved += resolve(&mut para.content, only, accept);
    });
    resolved
}

/// Highest revision ID in a block list
pub(crate) fn max_id(blocks: &[BlockContent]) -> Option<u32> {
    let mut infos = Vec::new();
    crate::document::body::for_each_paragraph(blocks, &mut |para| collect(&para.content, &mut infos));
    infos.iter().map(|r| r.id).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Paragraph;
    use pretty_assertions::assert_eq;

    fn tracked_paragraph() -> Paragraph {
        let mut para = Paragraph::new("Hello ");
        para.content.push(ParagraphContent::Insert(Revision::new(
            1,
            "Ann",
            vec![ParagraphContent::Run(Run::new("brave "))],
        )));
        para.content
            .push(ParagraphContent::Delete(deletion(2, "Ann", Run::new("old "))));
        para.content.push(ParagraphContent::Run(Run::new("world")));
        para
    }

    #[test]
    fn test_collect_revisions() {
        let para = tracked_paragraph();
        let mut infos = Vec::new();
        collect(&para.content, &mut infos);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].kind, RevisionKind::Insert);
        assert_eq!(infos[0].text, "brave ");
        assert_eq!(infos[1].kind, RevisionKind::Delete);
        assert_eq!(infos[1].text, "old ");
        assert_eq!(infos[1].author.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_accept_all() {
        let mut para = tracked_paragraph();
        assert_eq!(resolve(&mut para.content, None, true), 2);
        assert_eq!(para.text(), "Hello brave world");
        assert!(para.runs().all(|r| r.deleted_text().is_empty()));
    }

    #[test]
    fn test_reject_all_restores_original() {
        let mut para = tracked_paragraph();
        assert_eq!(resolve(&mut para.content, None, false), 2);
        assert_eq!(para.text(), "Hello old world");
    }

    #[test]
    fn test_resolve_single_id() {
        let mut para = tracked_paragraph();
        assert_eq!(resolve(&mut para.content, Some(2), true), 1);
        assert_eq!(para.text(), "Hello brave world");
        let mut infos = Vec::new();
        collect(&para.content, &mut infos);
        assert_eq!(infos.len(), 1);
        assert_eq!(resolve(&mut para.content, Some(7), true), 0);
    }

    #[test]
    fn test_revision_date_format() {
        let date = revision_date();
        assert_eq!(date.len(), 20);
        assert!(date.ends_with('Z'));
    }
}
