//! Document model - high-level API for DOCX documents

mod body;
mod comments;
mod drawing;
mod header_footer;
mod hyperlink;
pub mod numbering;
mod paragraph;
mod revision;
mod run;
mod sdt;
mod settings;
mod styles;
mod table;

pub use body::{BlockContent, Body};
pub use comments::{initials, Comment, CommentInfo};
pub use drawing::{Drawing, DrawingInfo};
pub use header_footer::{HeaderFooter, HeaderFooterKind};
pub use hyperlink::Hyperlink;
pub use numbering::Numbering;
pub use paragraph::{Field, Paragraph, ParagraphContent, ParagraphProperties};
pub use revision::{Revision, RevisionInfo, RevisionKind};
pub use run::{BreakType, FieldCharType, Run, RunContent, RunProperties};
pub use sdt::{
    BlockSdt, ContentControl, ContentControlOptions, InlineSdt, ListItem, ListKind, SdtLock,
    SdtProperties, MAX_SDT_DEPTH,
};
pub use settings::Settings;
pub use styles::{StyleInfo, Styles};
pub use table::{Table, TableCell, TableRow, VMerge, VerticalAlignment};

use crate::drawing as dml;
use crate::error::{Error, Result};
use crate::opc::{
    content_types, rel_types, well_known, AddMode, CoreProperties, Package, Relationships,
    TargetMode,
};
use crate::xml::{self, RawXmlElement, RawXmlNode};
use comments::{CommentsExtended, CommentsPart};
use paragraph::UsedIds;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::path::Path;

/// Next free value of each numeric ID family in the document.
///
/// The u32 families count in u64 so a loaded `u32::MAX` leaves the family exhausted instead of wrapping.
#[derive(Clone, Copy, Debug)]
struct IdCounters {
    revision: u64,
    comment: u64,
    bookmark: u64,
    doc_pr: u64,
    sdt: i64,
}

impl IdCounters {
    fn fresh() -> Self {
        IdCounters {
            revision: 1,
            comment: 0,
            bookmark: 1,
            doc_pr: 1,
            sdt: 1,
        }
    }

    fn peek(next: u64, family: &str) -> Result<u32> {
        u32::try_from(next).map_err(|_| Error::InvalidValue(format!("no {} IDs left", family)))
    }

    fn take(next: &mut u64, family: &str) -> Result<u32> {
        let id = IdCounters::peek(*next, family)?;
        *next += 1;
        Ok(id)
    }
}

/// A DOCX document
#[derive(Debug)]
pub struct Document {
    /// Underlying OPC package
    package: Package,
    /// Main document part name
    uri: String,
    /// Attributes of w:document
    root_attrs: Vec<(String, String)>,
    /// Children of w:document other than the body, e.g. w:background
    extra: Vec<RawXmlNode>,
    /// Parsed document body
    body: Body,
    styles: Option<Styles>,
    settings: Option<Settings>,
    numbering: Option<Numbering>,
    comments: Option<CommentsPart>,
    comments_ext: Option<CommentsExtended>,
    /// Headers and footers
    stories: Vec<HeaderFooter>,
    ids: IdCounters,
    /// Write core properties on first save
    seed_core_properties: bool,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        let mut root_attrs = Vec::new();
        xml::declare_namespaces(&mut root_attrs, &xml::document_namespaces());
        Self {
            package: Package::new(),
            uri: well_known::DOCUMENT.to_string(),
            root_attrs,
            extra: Vec::new(),
            body: Body {
                content: Vec::new(),
                section_properties: Some(default_section()),
            },
            styles: Some(Styles::default_styles()),
            settings: Some(Settings::default()),
            numbering: None,
            comments: None,
            comments_ext: None,
            stories: Vec::new(),
            ids: IdCounters::fresh(),
            seed_core_properties: true,
        }
    }

    /// Open a document from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let package = Package::open(path)?;
        Self::from_package(package)
    }

    /// Open a document from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        Self::from_package(package)
    }

    /// Create document from an OPC package
    pub fn from_package(package: Package) -> Result<Self> {
        let uri = package.main_document_uri()?.as_str().to_string();
        let (mut root_attrs, extra, mut body) = parse_document(package.get_part(&uri)?.data())?;
        xml::declare_namespaces(&mut root_attrs, &xml::document_namespaces());
        bind_hyperlinks(&mut body.content, package.relationships_of(&uri)?);

        let styles = package.load_related(&uri, rel_types::STYLES, Styles::from_bytes);
        let settings = package.load_related(&uri, rel_types::SETTINGS, Settings::from_bytes);
        let numbering = package.load_related(&uri, rel_types::NUMBERING, Numbering::from_bytes);
        let comments_ext =
            package.load_related(&uri, rel_types::COMMENTS_EXTENDED, CommentsExtended::from_bytes);
        let mut comments = package.load_related(&uri, rel_types::COMMENTS, CommentsPart::from_bytes);
        if let (Some(part), Some(target)) = (
            comments.as_mut(),
            package.related_part_by_type(&uri, rel_types::COMMENTS),
        ) {
            let rels = package.relationships_of(target.as_str())?;
            for comment in &mut part.comments {
                bind_hyperlinks(&mut comment.content, rels);
            }
        }

        let mut stories = Vec::new();
        for rel in package.relationships_of(&uri)?.iter().filter(|r| !r.is_external()) {
            let is_header = match rel.rel_type.as_str() {
                rel_types::HEADER => true,
                rel_types::FOOTER => false,
                _ => continue,
            };
            let Ok(part) = package.get_part(&rel.target) else {
                log::warn!("{} '{}' is missing", rel.rel_type, rel.target);
                continue;
            };
            match HeaderFooter::from_bytes(&rel.target, is_header, part.data()) {
                Ok(mut story) => {
                    bind_hyperlinks(&mut story.content, package.relationships_of(&rel.target)?);
                    stories.push(story);
                }
                Err(e) => log::warn!("failed to parse '{}': {}", rel.target, e),
            }
        }

        let mut doc = Self {
            package,
            uri,
            root_attrs,
            extra,
            body,
            styles,
            settings,
            numbering,
            comments,
            comments_ext,
            stories,
            ids: IdCounters::fresh(),
            seed_core_properties: false,
        };
        doc.ids = doc.observed_ids();
        log::debug!(
            "opened document '{}' with {} blocks and {} headers/footers",
            doc.uri,
            doc.body.content.len(),
            doc.stories.len()
        );
        Ok(doc)
    }

    /// Counters one past the largest ID already in use
    fn observed_ids(&self) -> IdCounters {
        let mut ids = IdCounters::fresh();
        let mut used = UsedIds::default();

        for blocks in self.all_stories() {
            if let Some(id) = revision::max_id(blocks) {
                ids.revision = ids.revision.max(u64::from(id) + 1);
            }
            if let Some(id) = comments::max_marker_id(blocks) {
                ids.comment = ids.comment.max(u64::from(id) + 1);
            }
            if let Some(id) = sdt::max_id(blocks) {
                ids.sdt = ids.sdt.max(id.saturating_add(1));
            }
            body::for_each_paragraph(blocks, &mut |para| used.observe(&para.content));
            body::for_each_unknown_block(blocks, &mut |node| used.observe_raw(node));
        }
        if let Some(part) = &self.comments {
            ids.comment = ids.comment.max(part.next_id());
        }
        if let Some(id) = used.bookmark {
            ids.bookmark = ids.bookmark.max(u64::from(id) + 1);
        }
        if let Some(id) = used.doc_pr {
            ids.doc_pr = ids.doc_pr.max(u64::from(id) + 1);
        }
        ids
    }

    /// Block lists of the body, headers, footers and comments
    fn all_stories(&self) -> Vec<&[BlockContent]> {
        let mut all: Vec<&[BlockContent]> = vec![&self.body.content];
        all.extend(self.stories.iter().map(|s| s.content.as_slice()));
        if let Some(part) = &self.comments {
            all.extend(part.comments.iter().map(|c| c.content.as_slice()));
        }
        all
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.update_package()?;
        self.package.save(path)
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.update_package()?;
        self.package.to_bytes()
    }

    /// Write every parsed model back into its part
    fn update_package(&mut self) -> Result<()> {
        self.package.ensure_open()?;
        let uri = self.uri.clone();
        let dir = self.part_dir();

        link_hyperlinks(&mut self.package, &uri, &mut self.body.content)?;
        let data = self.document_bytes()?;
        self.package.put_part(&uri, content_types::WORD_DOCUMENT, data)?;
        if self.package.related_part_by_type("", rel_types::OFFICE_DOCUMENT).is_none() {
            self.package
                .add_relationship("", rel_types::OFFICE_DOCUMENT, &uri, TargetMode::Internal)?;
        }

        if let Some(styles) = &self.styles {
            let target = self.secondary_uri(rel_types::STYLES, &dir, "styles.xml");
            self.package.put_part(&target, content_types::WORD_STYLES, styles.to_bytes()?)?;
            self.package.link_part(&uri, rel_types::STYLES, &target)?;
        }
        if let Some(settings) = &self.settings {
            let target = self.secondary_uri(rel_types::SETTINGS, &dir, "settings.xml");
            self.package.put_part(&target, content_types::WORD_SETTINGS, settings.to_bytes()?)?;
            self.package.link_part(&uri, rel_types::SETTINGS, &target)?;
        }
        if let Some(numbering) = &self.numbering {
            let target = self.secondary_uri(rel_types::NUMBERING, &dir, "numbering.xml");
            self.package.put_part(&target, content_types::WORD_NUMBERING, numbering.to_bytes()?)?;
            self.package.link_part(&uri, rel_types::NUMBERING, &target)?;
        }
        if self.comments.is_some() {
            let target = self.secondary_uri(rel_types::COMMENTS, &dir, "comments.xml");
            let mut data = Vec::new();
            if let Some(part) = &mut self.comments {
                for comment in &mut part.comments {
                    link_hyperlinks(&mut self.package, &target, &mut comment.content)?;
                }
                data = part.to_bytes()?;
            }
            self.package.put_part(&target, content_types::WORD_COMMENTS, data)?;
            self.package.link_part(&uri, rel_types::COMMENTS, &target)?;
        }
        if let Some(ext) = &self.comments_ext {
            let target = self.secondary_uri(rel_types::COMMENTS_EXTENDED, &dir, "commentsExtended.xml");
            self.package.put_part(&target, content_types::WORD_COMMENTS_EXTENDED, ext.to_bytes()?)?;
            self.package.link_part(&uri, rel_types::COMMENTS_EXTENDED, &target)?;
        }

        for story in &mut self.stories {
            let target = story.part_uri().to_string();
            link_hyperlinks(&mut self.package, &target, &mut story.content)?;
            let content_type = if story.is_header() {
                content_types::WORD_HEADER
            } else {
                content_types::WORD_FOOTER
            };
            self.package.put_part(&target, content_type, story.to_bytes()?)?;
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

    fn document_bytes(&self) -> Result<Vec<u8>> {
        xml::write_part(|writer| {
            let mut start = BytesStart::new("w:document");
            for (key, value) in &self.root_attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Start(start))?;
            for node in &self.extra {
                node.write_to(writer)?;
            }
            self.body.write_to(writer)?;
            writer.write_event(Event::End(BytesEnd::new("w:document")))?;
            Ok(())
        })
    }

    /// Directory of the main part with a trailing slash, e.g. `word/`
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

    /// Close the document; later mutating and saving calls fail with [`Error::Closed`]
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

    // === Content ===

    /// Get the body
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Get mutable body
    pub fn body_mut(&mut self) -> Result<&mut Body> {
        self.package.ensure_open()?;
        Ok(&mut self.body)
    }

    /// Get top-level paragraphs
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.paragraphs()
    }

    /// Get paragraph count
    pub fn paragraph_count(&self) -> usize {
        self.body.paragraphs().count()
    }

    /// Get a top-level paragraph by index
    pub fn paragraph(&self, index: usize) -> Result<&Paragraph> {
        self.body
            .paragraphs()
            .nth(index)
            .ok_or_else(|| paragraph_out_of_range(index))
    }

    /// Get a top-level paragraph mutably
    pub fn paragraph_mut(&mut self, index: usize) -> Result<&mut Paragraph> {
        self.package.ensure_open()?;
        paragraph_at_mut(&mut self.body, index)
    }

    /// Get top-level tables
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.tables()
    }

    /// Get table by index
    pub fn table(&self, index: usize) -> Option<&Table> {
        self.body.tables().nth(index)
    }

    /// Get table by index mutably
    pub fn table_mut(&mut self, index: usize) -> Result<&mut Table> {
        self.package.ensure_open()?;
        self.body
            .tables_mut()
            .nth(index)
            .ok_or_else(|| Error::InvalidIndex(format!("table {} out of range", index)))
    }

    /// Add a paragraph with text
    pub fn add_paragraph(&mut self, text: impl Into<String>) -> Result<&mut Paragraph> {
        self.package.ensure_open()?;
        Ok(self.body.add_paragraph(Paragraph::new(text)))
    }

    /// Add an empty paragraph
    pub fn add_empty_paragraph(&mut self) -> Result<&mut Paragraph> {
        self.package.ensure_open()?;
        Ok(self.body.add_paragraph(Paragraph::default()))
    }

    /// Add a table with the default grid style
    pub fn add_table(&mut self, rows: usize, cols: usize) -> Result<&mut Table> {
        self.package.ensure_open()?;
        if rows == 0 {
            return Err(Error::validation("rows", "table needs at least one row", "0"));
        }
        if cols == 0 {
            return Err(Error::validation("cols", "table needs at least one column", "0"));
        }
        Ok(self.body.add_table(Table::new(rows, cols)))
    }

    /// Get all text in the document, including table cells
    pub fn text(&self) -> String {
        body::blocks_text(&self.body.content)
    }

    /// Parsed styles part
    pub fn styles(&self) -> Option<&Styles> {
        self.styles.as_ref()
    }

    /// Parsed settings part
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Parsed numbering part
    pub fn numbering(&self) -> Option<&Numbering> {
        self.numbering.as_ref()
    }

    // === Tracked changes ===

    /// Record later edits as revisions
    pub fn enable_track_changes(&mut self) -> Result<()> {
        self.package.ensure_open()?;
        self.settings
            .get_or_insert_with(Settings::default)
            .set_track_revisions(true);
        Ok(())
    }

    pub fn disable_track_changes(&mut self) -> Result<()> {
        self.package.ensure_open()?;
        if let Some(settings) = &mut self.settings {
            settings.set_track_revisions(false);
        }
        Ok(())
    }

    pub fn track_changes_enabled(&self) -> bool {
        self.settings.as_ref().map_or(false, Settings::track_revisions)
    }

    /// Append `text` to a paragraph as a tracked insertion; returns the revision ID
    pub fn insert_tracked_text(&mut self, paragraph: usize, text: &str, author: &str) -> Result<u32> {
        self.package.ensure_open()?;
        if text.is_empty() {
            return Err(Error::InvalidValue("inserted text cannot be empty".into()));
        }
        let para = paragraph_at_mut(&mut self.body, paragraph)?;
        let id = IdCounters::take(&mut self.ids.revision, "revision")?;
        para.content.push(ParagraphContent::Insert(Revision::new(
            id,
            author,
            vec![ParagraphContent::Run(Run::new(text))],
        )));
        Ok(id)
    }

    /// Mark the `run`-th direct run of a paragraph as deleted; returns the revision ID
    pub fn delete_tracked_text(&mut self, paragraph: usize, run: usize, author: &str) -> Result<u32> {
        self.package.ensure_open()?;
        let para = paragraph_at_mut(&mut self.body, paragraph)?;
        let pos = para
            .content
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, ParagraphContent::Run(_)))
            .nth(run)
            .map(|(i, _)| i)
            .ok_or_else(|| Error::InvalidIndex(format!("run {} out of range", run)))?;
        let id = IdCounters::take(&mut self.ids.revision, "revision")?;
        let ParagraphContent::Run(target) = para.content.remove(pos) else {
            unreachable!()
        };
        para.content
            .insert(pos, ParagraphContent::Delete(revision::deletion(id, author, target)));
        Ok(id)
    }

    /// Tracked changes in document order
    pub fn revisions(&self) -> Vec<RevisionInfo> {
        let mut out = Vec::new();
        body::for_each_paragraph(&self.body.content, &mut |para| {
            revision::collect(&para.content, &mut out)
        });
        out
    }

    /// Accept every tracked change; returns how many were resolved
    pub fn accept_all_revisions(&mut self) -> Result<usize> {
        self.package.ensure_open()?;
        Ok(self.resolve_revisions(None, true))
    }

    /// Reject every tracked change; returns how many were resolved
    pub fn reject_all_revisions(&mut self) -> Result<usize> {
        self.package.ensure_open()?;
        Ok(self.resolve_revisions(None, false))
    }

    pub fn accept_revision(&mut self, id: u32) -> Result<()> {
        self.resolve_one(id, true)
    }

    pub fn reject_revision(&mut self, id: u32) -> Result<()> {
        self.resolve_one(id, false)
    }

    fn resolve_one(&mut self, id: u32, accept: bool) -> Result<()> {
        self.package.ensure_open()?;
        if self.resolve_revisions(Some(id), accept) == 0 {
            return Err(Error::InvalidIndex(format!("no revision with id {}", id)));
        }
        Ok(())
    }

    fn resolve_revisions(&mut self, only: Option<u32>, accept: bool) -> usize {
        let mut resolved = revision::resolve_blocks(&mut self.body.content, only, accept);
        for story in &mut self.stories {
            resolved += revision::resolve_blocks(&mut story.content, only, accept);
        }
        log::debug!("resolved {} revisions (accept={})", resolved, accept);
        resolved
    }

    // === Bookmarks ===

    /// Wrap a paragraph's content in a bookmark; returns the bookmark ID
    pub fn add_bookmark(&mut self, paragraph: usize, name: &str) -> Result<u32> {
        self.package.ensure_open()?;
        if name.trim().is_empty() {
            return Err(Error::validation("name", "bookmark name cannot be empty", name));
        }
        if self.bookmarks().iter().any(|(_, n)| n == name) {
            return Err(Error::validation("name", "bookmark name already in use", name));
        }
        let para = paragraph_at_mut(&mut self.body, paragraph)?;
        let id = IdCounters::take(&mut self.ids.bookmark, "bookmark")?;
        para.content.insert(
            0,
            ParagraphContent::BookmarkStart {
                id,
                name: name.to_string(),
            },
        );
        para.content.push(ParagraphContent::BookmarkEnd { id });
        Ok(id)
    }

    /// Bookmarks as (id, name) in document order
    pub fn bookmarks(&self) -> Vec<(u32, String)> {
        let mut out = Vec::new();
        body::for_each_paragraph(&self.body.content, &mut |para| {
            out.extend(para.bookmarks().map(|(id, name)| (id, name.to_string())))
        });
        out
    }

    // === Comments ===

    /// Comment on `anchor` inside a top-level paragraph; an empty anchor covers the whole paragraph
    pub fn add_comment(&mut self, paragraph: usize, anchor: &str, author: &str, text: &str) -> Result<u32> {
        self.package.ensure_open()?;
        if author.trim().is_empty() {
            return Err(Error::validation("author", "comment author cannot be empty", author));
        }
        let para = paragraph_at_mut(&mut self.body, paragraph)?;
        let id = IdCounters::peek(self.ids.comment, "comment")?;
        comments::anchor_comment(para, anchor, id)?;
        self.ids.comment += 1;

        let part = self.comments.get_or_insert_with(CommentsPart::default);
        let para_id = part.next_para_id();
        part.comments.push(Comment::new(id, author, text, &para_id));
        if let Some(ext) = &mut self.comments_ext {
            ext.record(&para_id, None);
        }
        log::debug!("added comment {} on paragraph {}", id, paragraph);
        Ok(id)
    }

    /// Reply to an existing comment; the reply shares its parent's range
    pub fn reply_to_comment(&mut self, parent: u32, author: &str, text: &str) -> Result<u32> {
        self.package.ensure_open()?;
        if author.trim().is_empty() {
            return Err(Error::validation("author", "comment author cannot be empty", author));
        }
        let missing = || Error::InvalidIndex(format!("no comment with id {}", parent));
        let part = self.comments.as_mut().ok_or_else(missing)?;
        let index = part
            .comments
            .iter()
            .position(|c| c.id == parent)
            .ok_or_else(missing)?;

        let existing = part.comments[index].para_id().map(str::to_string);
        let parent_para_id = match existing {
            Some(para_id) => para_id,
            None => {
                let para_id = part.next_para_id();
                let content = &mut part.comments[index].content;
                let last = content.iter_mut().rev().find_map(|b| match b {
                    BlockContent::Paragraph(p) => Some(p),
                    _ => None,
                });
                match last {
                    Some(p) => p.set_para_id(&para_id),
                    None => {
                        let mut p = Paragraph::default();
                        p.set_para_id(&para_id);
                        content.push(BlockContent::Paragraph(p));
                    }
                }
                para_id
            }
        };

        let id = IdCounters::take(&mut self.ids.comment, "comment")?;
        let para_id = part.next_para_id();
        part.comments.push(Comment::new(id, author, text, &para_id));
        comments::anchor_reply(&mut self.body.content, parent, id);

        let ext = self.comments_ext.get_or_insert_with(CommentsExtended::default);
        if ext.entries.iter().all(|e| e.para_id != parent_para_id) {
            ext.record(&parent_para_id, None);
        }
        ext.record(&para_id, Some(&parent_para_id));
        log::debug!("added reply {} to comment {}", id, parent);
        Ok(id)
    }

    /// Comments with reply threading
    pub fn comments(&self) -> Vec<CommentInfo> {
        let Some(part) = &self.comments else {
            return Vec::new();
        };
        part.comments
            .iter()
            .map(|c| {
                let parent_id = c
                    .para_id()
                    .and_then(|pid| self.comments_ext.as_ref()?.parent_of(pid))
                    .and_then(|ppid| part.comments.iter().find(|p| p.para_id() == Some(ppid)))
                    .map(|p| p.id);
                CommentInfo {
                    id: c.id,
                    author: c.author.clone(),
                    initials: c.initials.clone(),
                    date: c.date.clone(),
                    text: c.text(),
                    parent_id,
                }
            })
            .collect()
    }

    /// Delete a comment with its replies, range markers and reference runs
    pub fn delete_comment(&mut self, id: u32) -> Result<()> {
        self.package.ensure_open()?;
        let infos = self.comments();
        if !infos.iter().any(|c| c.id == id) {
            return Err(Error::InvalidIndex(format!("no comment with id {}", id)));
        }

        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i];
            for info in &infos {
                if info.parent_id == Some(current) && !doomed.contains(&info.id) {
                    doomed.push(info.id);
                }
            }
            i += 1;
        }

        if let Some(part) = &mut self.comments {
            if let Some(ext) = &mut self.comments_ext {
                for comment in part.comments.iter().filter(|c| doomed.contains(&c.id)) {
                    if let Some(pid) = comment.para_id() {
                        ext.forget(pid);
                    }
                }
            }
            part.comments.retain(|c| !doomed.contains(&c.id));
        }
        comments::remove_markers(&mut self.body.content, &doomed);
        log::debug!("deleted comments {:?}", doomed);
        Ok(())
    }

    // === Numbering ===

    /// New nine-level bullet list; returns its `numId`
    pub fn add_bullet_list(&mut self) -> Result<u32> {
        self.package.ensure_open()?;
        Ok(self
            .numbering
            .get_or_insert_with(Numbering::new)
            .add_bullet_list())
    }

    /// New nine-level numbered list; returns its `numId`
    pub fn add_numbered_list(&mut self) -> Result<u32> {
        self.package.ensure_open()?;
        Ok(self
            .numbering
            .get_or_insert_with(Numbering::new)
            .add_numbered_list())
    }

    // === Headers and footers ===

    /// Header of `kind`, created with one empty paragraph when absent
    pub fn add_header(&mut self, kind: HeaderFooterKind) -> Result<&mut HeaderFooter> {
        self.add_story(true, kind)
    }

    /// Footer of `kind`, created with one empty paragraph when absent
    pub fn add_footer(&mut self, kind: HeaderFooterKind) -> Result<&mut HeaderFooter> {
        self.add_story(false, kind)
    }

    pub fn header(&self, kind: HeaderFooterKind) -> Option<&HeaderFooter> {
        self.story_position(true, kind).map(|i| &self.stories[i])
    }

    pub fn header_mut(&mut self, kind: HeaderFooterKind) -> Option<&mut HeaderFooter> {
        self.story_position(true, kind).map(move |i| &mut self.stories[i])
    }

    pub fn footer(&self, kind: HeaderFooterKind) -> Option<&HeaderFooter> {
        self.story_position(false, kind).map(|i| &self.stories[i])
    }

    pub fn footer_mut(&mut self, kind: HeaderFooterKind) -> Option<&mut HeaderFooter> {
        self.story_position(false, kind).map(move |i| &mut self.stories[i])
    }

    /// Every header part
    pub fn headers(&self) -> impl Iterator<Item = &HeaderFooter> {
        self.stories.iter().filter(|s| s.is_header())
    }

    /// Every footer part
    pub fn footers(&self) -> impl Iterator<Item = &HeaderFooter> {
        self.stories.iter().filter(|s| !s.is_header())
    }

    fn story_position(&self, header: bool, kind: HeaderFooterKind) -> Option<usize> {
        let sect = self.body.section_properties.as_ref()?;
        let (_, rel_id) = header_footer::references(sect, header)
            .into_iter()
            .find(|(k, _)| *k == kind)?;
        let target = self.package.related_part(&self.uri, &rel_id).ok()?;
        self.stories
            .iter()
            .position(|s| s.is_header() == header && s.part_uri() == target.as_str())
    }

    fn add_story(&mut self, header: bool, kind: HeaderFooterKind) -> Result<&mut HeaderFooter> {
        self.package.ensure_open()?;
        if let Some(pos) = self.story_position(header, kind) {
            return Ok(&mut self.stories[pos]);
        }

        let (name, content_type, rel_type) = if header {
            ("header", content_types::WORD_HEADER, rel_types::HEADER)
        } else {
            ("footer", content_types::WORD_FOOTER, rel_types::FOOTER)
        };
        let uri = self
            .package
            .next_part_name(&format!("{}{}", self.part_dir(), name), "xml");
        let story = HeaderFooter::new(&uri, header);
        self.package
            .add_part(&uri, content_type, story.to_bytes()?, AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&self.uri, rel_type, &uri, TargetMode::Internal)?;

        let sect = self
            .body
            .section_properties
            .get_or_insert_with(default_section);
        header_footer::set_reference(sect, header, kind, &rel_id);
        if kind == HeaderFooterKind::Even {
            self.settings
                .get_or_insert_with(Settings::default)
                .set_even_and_odd_headers(true);
        }
        log::debug!("added {} {} ({})", kind.as_str(), name, uri);

        self.stories.push(story);
        match self.stories.last_mut() {
            Some(story) => Ok(story),
            None => unreachable!(),
        }
    }

    // === Drawings ===

    /// Inline picture at the end of a paragraph; returns the docPr ID
    pub fn add_picture(&mut self, paragraph: usize, data: &[u8], ext: &str, cx: i64, cy: i64) -> Result<u32> {
        self.package.ensure_open()?;
        dml::check_extent(cx, cy)?;
        if data.is_empty() {
            return Err(Error::InvalidValue("image data cannot be empty".into()));
        }
        let (content_type, ext) = dml::image_type(ext)?;
        self.paragraph(paragraph)?;

        let media = self
            .package
            .next_part_name(&format!("{}media/image", self.part_dir()), &ext);
        self.package
            .add_part(&media, content_type, data.to_vec(), AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&self.uri, rel_types::IMAGE, &media, TargetMode::Internal)?;

        let id = self.next_doc_pr()?;
        self.push_drawing(paragraph, drawing::picture(id, &rel_id, cx, cy))?;
        Ok(id)
    }

    /// Inline chart at the end of a paragraph; returns the docPr ID
    pub fn add_chart(&mut self, paragraph: usize, title: &str, cx: i64, cy: i64) -> Result<u32> {
        self.package.ensure_open()?;
        dml::check_extent(cx, cy)?;
        self.paragraph(paragraph)?;

        let chart = self
            .package
            .next_part_name(&format!("{}charts/chart", self.part_dir()), "xml");
        self.package
            .add_part(&chart, content_types::CHART, dml::chart_part(title)?, AddMode::Create)?;
        let rel_id = self
            .package
            .add_relationship(&self.uri, rel_types::CHART, &chart, TargetMode::Internal)?;

        let id = self.next_doc_pr()?;
        self.push_drawing(paragraph, drawing::chart(id, title, &rel_id, cx, cy))?;
        Ok(id)
    }

    /// Inline diagram at the end of a paragraph; returns the docPr ID
    pub fn add_diagram(&mut self, paragraph: usize, cx: i64, cy: i64) -> Result<u32> {
        self.package.ensure_open()?;
        dml::check_extent(cx, cy)?;
        self.paragraph(paragraph)?;

        let parts = dml::diagram_parts()?;
        let dir = format!("{}diagrams/", self.part_dir());
        let mut add = |name: &str, content_type: &str, rel_type: &str, data: Vec<u8>| -> Result<String> {
            let uri = self.package.next_part_name(&format!("{}{}", dir, name), "xml");
            self.package
                .add_part(&uri, content_type, data, AddMode::Create)?;
            self.package
                .add_relationship(&self.uri, rel_type, &uri, TargetMode::Internal)
        };
        let ids = dml::DiagramRelIds {
            data: add("data", content_types::DIAGRAM_DATA, rel_types::DIAGRAM_DATA, parts.data)?,
            layout: add("layout", content_types::DIAGRAM_LAYOUT, rel_types::DIAGRAM_LAYOUT, parts.layout)?,
            style: add("quickStyle", content_types::DIAGRAM_STYLE, rel_types::DIAGRAM_STYLE, parts.style)?,
            colors: add("colors", content_types::DIAGRAM_COLORS, rel_types::DIAGRAM_COLORS, parts.colors)?,
        };

        let id = self.next_doc_pr()?;
        self.push_drawing(paragraph, drawing::diagram(id, &ids, cx, cy))?;
        Ok(id)
    }

    /// Drawings in document order
    pub fn drawings(&self) -> Vec<DrawingInfo> {
        let mut out = Vec::new();
        body::for_each_paragraph(&self.body.content, &mut |para| {
            out.extend(para.all_runs().into_iter().flat_map(Run::drawings).map(Drawing::info))
        });
        out
    }

    fn next_doc_pr(&mut self) -> Result<u32> {
        IdCounters::take(&mut self.ids.doc_pr, "drawing")
    }

    fn push_drawing(&mut self, paragraph: usize, drawing: Drawing) -> Result<()> {
        let para = paragraph_at_mut(&mut self.body, paragraph)?;
        para.add_run(Run {
            content: vec![RunContent::Drawing(drawing)],
            ..Default::default()
        });
        Ok(())
    }

    // === Content controls ===

    /// Append a block-level content control holding one paragraph of `text`
    pub fn add_block_content_control(&mut self, tag: &str, alias: &str, text: &str) -> Result<&mut BlockSdt> {
        let mut options = ContentControlOptions::new(tag);
        if !alias.is_empty() {
            options = options.alias(alias);
        }
        self.add_content_control_with(options, text)
    }

    /// Append a block-level content control built from `options`
    pub fn add_content_control_with(&mut self, options: ContentControlOptions, text: &str) -> Result<&mut BlockSdt> {
        self.package.ensure_open()?;
        if options.tag.trim().is_empty() {
            return Err(Error::validation("tag", "content control tag cannot be empty", options.tag));
        }
        let mut properties = SdtProperties::from_options(&options)?;
        match properties.id {
            Some(id) => self.ids.sdt = self.ids.sdt.max(id.saturating_add(1)),
            None => {
                properties.id = Some(self.ids.sdt);
                self.ids.sdt = self.ids.sdt.saturating_add(1);
            }
        }
        self.body
            .content
            .push(BlockContent::ContentControl(BlockSdt::new(properties, text)));
        match self.body.content.last_mut() {
            Some(BlockContent::ContentControl(sdt)) => Ok(sdt),
            _ => unreachable!(),
        }
    }

    /// Every content control in the body, outermost first
    pub fn content_controls(&self) -> Vec<ContentControl<'_>> {
        let mut out = Vec::new();
        sdt::collect_controls(&self.body.content, &mut out);
        out
    }

    pub fn content_control_by_tag(&self, tag: &str) -> Option<ContentControl<'_>> {
        self.content_controls()
            .into_iter()
            .find(|c| c.tag() == Some(tag))
    }

    pub fn content_controls_by_tag(&self, tag: &str) -> Vec<ContentControl<'_>> {
        self.content_controls()
            .into_iter()
            .filter(|c| c.tag() == Some(tag))
            .collect()
    }

    /// Remove the first control tagged `tag`, leaving its content in place
    pub fn remove_content_control(&mut self, tag: &str) -> Result<()> {
        self.package.ensure_open()?;
        if sdt::unwrap_control(&mut self.body.content, tag, 0) {
            Ok(())
        } else {
            Err(Error::InvalidValue(format!("no content control tagged '{}'", tag)))
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn paragraph_out_of_range(index: usize) -> Error {
    Error::InvalidIndex(format!("paragraph {} out of range", index))
}

fn paragraph_at_mut(body: &mut Body, index: usize) -> Result<&mut Paragraph> {
    body.paragraphs_mut()
        .nth(index)
        .ok_or_else(|| paragraph_out_of_range(index))
}

/// US Letter portrait with one-inch margins
fn default_section() -> RawXmlElement {
    RawXmlElement::new("w:sectPr")
        .with_child(
            RawXmlElement::new("w:pgSz")
                .with_attr("w:w", "12240")
                .with_attr("w:h", "15840"),
        )
        .with_child(
            RawXmlElement::new("w:pgMar")
                .with_attr("w:top", "1440")
                .with_attr("w:right", "1440")
                .with_attr("w:bottom", "1440")
                .with_attr("w:left", "1440")
                .with_attr("w:header", "720")
                .with_attr("w:footer", "720")
                .with_attr("w:gutter", "0"),
        )
        .with_child(RawXmlElement::new("w:cols").with_attr("w:space", "720"))
        .with_child(RawXmlElement::new("w:docGrid").with_attr("w:linePitch", "360"))
}

/// Parse document.xml into root attributes, non-body children and the body
fn parse_document(data: &[u8]) -> Result<(Vec<(String, String)>, Vec<RawXmlNode>, Body)> {
    let mut reader = xml::reader_from_bytes(data);
    let mut buf = Vec::new();
    let mut root_attrs = None;
    let mut extra = Vec::new();
    let mut body = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().local_name().as_ref() {
                b"document" if root_attrs.is_none() => root_attrs = Some(xml::attributes_of(&e)),
                b"body" => body = Some(Body::from_reader(&mut reader)?),
                _ => extra.push(RawXmlNode::Element(RawXmlElement::from_reader(&mut reader, &e)?)),
            },
            Event::Empty(e) => match e.name().local_name().as_ref() {
                b"body" => body = Some(Body::default()),
                b"document" => root_attrs = Some(xml::attributes_of(&e)),
                _ => extra.push(RawXmlNode::Element(RawXmlElement::from_empty(&e))),
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let root_attrs =
        root_attrs.ok_or_else(|| Error::InvalidFormat("missing w:document element".into()))?;
    let body = body.ok_or_else(|| Error::InvalidFormat("missing w:body element".into()))?;
    Ok((root_attrs, extra, body))
}

fn visit_hyperlinks(content: &mut [ParagraphContent], f: &mut dyn FnMut(&mut Hyperlink)) {
    for item in content {
        match item {
            ParagraphContent::Hyperlink(link) => f(link),
            ParagraphContent::Insert(rev) | ParagraphContent::Delete(rev) => {
                visit_hyperlinks(&mut rev.content, f)
            }
            ParagraphContent::ContentControl(sdt) => visit_hyperlinks(&mut sdt.content, f),
            _ => {}
        }
    }
}

/// Resolve the URL behind each hyperlink's relationship ID
fn bind_hyperlinks(blocks: &mut [BlockContent], rels: &Relationships) {
    body::for_each_paragraph_mut(blocks, &mut |para| {
        visit_hyperlinks(&mut para.content, &mut |link| {
            let Some(r_id) = link.r_id.as_deref() else {
                return;
            };
            match rels.get(r_id) {
                Some(rel) if rel.is_external() => link.url = Some(rel.target.clone()),
                Some(_) => {}
                None => log::warn!("hyperlink relationship '{}' is missing", r_id),
            }
        })
    });
}

/// Give every hyperlink with a URL but no relationship an external hyperlink relationship
fn link_hyperlinks(package: &mut Package, source: &str, blocks: &mut [BlockContent]) -> Result<()> {
    let mut result = Ok(());
    body::for_each_paragraph_mut(blocks, &mut |para| {
        visit_hyperlinks(&mut para.content, &mut |link| {
            if result.is_err() || link.r_id.is_some() {
                return;
            }
            let Some(url) = link.url.clone() else {
                return;
            };
            let existing = package
                .relationships_of(source)
                .ok()
                .and_then(|rels| rels.by_type_and_target(rel_types::HYPERLINK, &url))
                .map(|rel| rel.id.clone());
            match existing {
                Some(id) => link.r_id = Some(id),
                None => match package.add_relationship(source, rel_types::HYPERLINK, &url, TargetMode::External) {
                    Ok(id) => link.r_id = Some(id),
                    Err(e) => result = Err(e),
                },
            }
        })
    });
    result
}
