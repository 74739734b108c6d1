//! PowerPoint 2018 comments: per-slide comment lists and the shared author list

use crate::error::{Error, Result};
use crate::presentation::text::TextBody;
use crate::xml::{self, RawXmlElement};
use chrono::{SecondsFormat, Utc};

/// Extension URI under which a slide references its comment list
pub(crate) const COMMENT_REL_EXT: &str = "{6950BFC3-D8DA-4A85-94F7-54DA5524770B}";

/// A comment as read from a slide
#[derive(Clone, Debug, PartialEq)]
pub struct SlideComment {
    pub id: String,
    /// Author display name, or the raw author ID when it cannot be resolved
    pub author: String,
    pub initials: String,
    pub text: String,
    pub x: i64,
    pub y: i64,
    /// ISO-8601 timestamp
    pub created: Option<String>,
}

fn guid() -> String {
    format!("{{{}}}", uuid::Uuid::new_v4().to_string().to_ascii_uppercase())
}

/// Uppercased first letter of each word: "Ada Lovelace" -> "AL"
pub(crate) fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

fn p188_root(local: &str) -> RawXmlElement {
    RawXmlElement::new(format!("p188:{}", local))
        .with_attr("xmlns:a", xml::A)
        .with_attr("xmlns:r", xml::R)
        .with_attr("xmlns:p188", xml::P188)
}

/// Qualified name in the prefix `root` uses
fn tag(root: &RawXmlElement, local: &str) -> String {
    match root.name.split_once(':') {
        Some((prefix, _)) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

/// ppt/authors.xml
#[derive(Clone, Debug)]
pub(crate) struct AuthorList {
    uri: String,
    root: RawXmlElement,
}

impl AuthorList {
    pub(crate) fn new(uri: impl Into<String>) -> Self {
        AuthorList {
            uri: uri.into(),
            root: p188_root("authorLst"),
        }
    }

    pub(crate) fn parse(uri: &str, data: &[u8]) -> Result<Self> {
        let root = RawXmlElement::parse(data)?;
        if root.local_name() != "authorLst" {
            return Err(Error::InvalidFormat(format!("expected authorLst, found {}", root.name)));
        }
        Ok(AuthorList {
            uri: uri.to_string(),
            root,
        })
    }

    pub(crate) fn uri(&self) -> &str {
        &self.uri
    }

    fn authors(&self) -> impl Iterator<Item = &RawXmlElement> {
        self.root.elements().filter(|e| e.local_name() == "author")
    }

    fn find(&self, id: &str) -> Option<&RawXmlElement> {
        self.authors().find(|a| a.attr("id") == Some(id))
    }

    /// ID of the author named `name`, adding the author when new
    pub(crate) fn ensure(&mut self, name: &str) -> String {
        if let Some(id) = self
            .authors()
            .find(|a| a.attr("name") == Some(name))
            .and_then(|a| a.attr("id"))
        {
            return id.to_string();
        }
        let id = guid();
        let author = RawXmlElement::new(tag(&self.root, "author"))
            .with_attr("id", id.as_str())
            .with_attr("name", name)
            .with_attr("initials", initials(name))
            .with_attr("userId", name)
            .with_attr("providerId", "None");
        self.root.push_child(author);
        log::debug!("added comment author '{}' as {}", name, id);
        id
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }
}

/// A slide's comment list (ppt/comments/modernComment_N.xml)
#[derive(Clone, Debug)]
pub(crate) struct CommentList {
    uri: String,
    root: RawXmlElement,
}

impl CommentList {
    pub(crate) fn new(uri: impl Into<String>) -> Self {
        CommentList {
            uri: uri.into(),
            root: p188_root("cmLst"),
        }
    }

    pub(crate) fn parse(uri: &str, data: &[u8]) -> Result<Self> {
        let root = RawXmlElement::parse(data)?;
        if root.local_name() != "cmLst" {
            return Err(Error::InvalidFormat(format!("expected cmLst, found {}", root.name)));
        }
        Ok(CommentList {
            uri: uri.to_string(),
            root,
        })
    }

    pub(crate) fn uri(&self) -> &str {
        &self.uri
    }

    fn entries(&self) -> impl Iterator<Item = &RawXmlElement> {
        self.root.elements().filter(|e| e.local_name() == "cm")
    }

    pub(crate) fn len(&self) -> usize {
        self.entries().count()
    }

    /// Append a comment; returns its ID
    pub(crate) fn add(&mut self, author_id: &str, text: &str, x: i64, y: i64) -> String {
        let id = guid();
        let created = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let cm = RawXmlElement::new(tag(&self.root, "cm"))
            .with_attr("id", id.as_str())
            .with_attr("authorId", author_id)
            .with_attr("created", created)
            .with_child(
                RawXmlElement::new(tag(&self.root, "pos"))
                    .with_attr("x", x.to_string())
                    .with_attr("y", y.to_string()),
            )
            .with_child(TextBody::new(text).to_element(&tag(&self.root, "txBody")));
        self.root.push_child(cm);
        id
    }

    /// Remove a comment by ID; false when absent
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        let before = self.len();
        self.root.children.retain(|c| match c.as_element() {
            Some(e) if e.local_name() == "cm" => e.attr("id") != Some(id),
            _ => true,
        });
        before != self.len()
    }

    /// Comments in list order, author names resolved through `authors`
    pub(crate) fn comments(&self, authors: Option<&AuthorList>) -> Vec<SlideComment> {
        self.entries()
            .map(|cm| {
                let author_id = cm.attr("authorId").unwrap_or("");
                let author = authors.and_then(|a| a.find(author_id));
                let pos = cm.child("pos");
                let coord = |name: &str| {
                    pos.and_then(|p| p.attr(name))
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0)
                };
                SlideComment {
                    id: cm.attr("id").unwrap_or("").to_string(),
                    author: author
                        .and_then(|a| a.attr("name"))
                        .unwrap_or(author_id)
                        .to_string(),
                    initials: author
                        .and_then(|a| a.attr("initials"))
                        .unwrap_or("")
                        .to_string(),
                    text: cm
                        .child("txBody")
                        .map(|tb| TextBody::from_element(tb).text())
                        .unwrap_or_default(),
                    x: coord("x"),
                    y: coord("y"),
                    created: cm.attr("created").map(str::to_string),
                }
            })
            .collect()
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }
}

/// `p:ext` entry pointing a slide at its comment list; `r` is the slide's relationships prefix
pub(crate) fn comment_rel_ext(rel_id: &str, r: &str) -> RawXmlElement {
    RawXmlElement::new("p:ext").with_attr("uri", COMMENT_REL_EXT).with_child(
        RawXmlElement::new("p188:commentRel")
            .with_attr("xmlns:p188", xml::P188)
            .with_attr(format!("{}:id", r), rel_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_initials() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("  grace   brewster hopper "), "GBH");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_authors_are_deduplicated() {
        let mut authors = AuthorList::new("ppt/authors.xml");
        let a = authors.ensure("Ada Lovelace");
        let b = authors.ensure("Ada Lovelace");
        let c = authors.ensure("Alan Turing");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with('{') && a.ends_with('}'));

        let reparsed = AuthorList::parse(authors.uri(), &authors.to_bytes().unwrap()).unwrap();
        assert_eq!(reparsed.authors().count(), 2);
        assert_eq!(reparsed.find(&c).unwrap().attr("initials"), Some("AT"));
    }

    #[test]
    fn test_comment_list_roundtrip() {
        let mut authors = AuthorList::new("ppt/authors.xml");
        let author = authors.ensure("Ada Lovelace");
        let mut list = CommentList::new("ppt/comments/modernComment_1.xml");
        let id = list.add(&author, "Check this figure", 100, 200);
        list.add("{UNKNOWN}", "Orphan", 0, 0);

        let reparsed = CommentList::parse(list.uri(), &list.to_bytes().unwrap()).unwrap();
        let comments = reparsed.comments(Some(&authors));
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, id);
        assert_eq!(comments[0].author, "Ada Lovelace");
        assert_eq!(comments[0].initials, "AL");
        assert_eq!(comments[0].text, "Check this figure");
        assert_eq!((comments[0].x, comments[0].y), (100, 200));
        assert!(comments[0].created.as_deref().unwrap().ends_with('Z'));
        assert_eq!(comments[1].author, "{UNKNOWN}");

        let mut list = reparsed;
        assert!(list.remove(&id));
        assert!(!list.remove(&id));
        assert_eq!(list.len(), 1);
    }
}
