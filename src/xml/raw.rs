//! Raw XML node types for round-trip preservation

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

use super::{attributes_of, local_name, reader_from_bytes, write_part};
use crate::error::{Error, Result};

/// Deepest element nesting kept in a raw tree
const MAX_RAW_DEPTH: usize = 256;

/// Raw XML node for preserving unknown elements during round-trip
#[derive(Clone, Debug, PartialEq)]
pub enum RawXmlNode {
    /// Element node
    Element(RawXmlElement),
    /// Text node
    Text(String),
    /// CDATA section
    CData(String),
    /// Comment node
    Comment(String),
}

/// Raw XML element with attributes and children
#[derive(Clone, Debug, PartialEq)]
pub struct RawXmlElement {
    /// Full element name (with prefix, e.g., "w:customXml")
    pub name: String,
    /// Attributes as (name, value) pairs
    pub attributes: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<RawXmlNode>,
    /// Whether this was a self-closing element
    pub self_closing: bool,
}

impl RawXmlElement {
    /// Create a new empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// Parse a whole part payload and return its root element
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = reader_from_bytes(data);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let e = e.into_owned();
                    return Self::from_reader(&mut reader, &e);
                }
                Event::Empty(e) => return Ok(Self::from_empty(&e)),
                Event::Eof => return Err(Error::InvalidFormat("missing root element".into())),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Serialize as a complete part payload (prolog + this element)
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        write_part(|writer| self.write_to(writer))
    }

    /// Read a complete element from XML reader (starting after the start tag was read)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        Self::read_nested(reader, start, 0)
    }

    fn read_nested<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart, depth: usize) -> Result<Self> {
        if depth > MAX_RAW_DEPTH {
            return Err(Error::InvalidFormat(format!(
                "elements nested deeper than {} levels",
                MAX_RAW_DEPTH
            )));
        }
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let attributes = attributes_of(start);

        let mut children = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let child = Self::read_nested(reader, &e, depth + 1)?;
                    children.push(RawXmlNode::Element(child));
                }
                Event::Empty(e) => {
                    children.push(RawXmlNode::Element(Self::from_empty(&e)));
                }
                Event::Text(t) => {
                    let text = t.unescape()?.to_string();
                    if !text.is_empty() {
                        children.push(RawXmlNode::Text(text));
                    }
                }
                Event::CData(c) => {
                    children.push(RawXmlNode::CData(String::from_utf8_lossy(&c).to_string()));
                }
                Event::Comment(c) => {
                    children.push(RawXmlNode::Comment(String::from_utf8_lossy(&c).to_string()));
                }
                Event::End(e) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if end_name == name {
                        break;
                    }
                }
                Event::Eof => return Err(Error::InvalidFormat("unexpected end of XML".into())),
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            name,
            attributes,
            children,
            self_closing: false,
        })
    }

    /// Create from empty element tag
    pub fn from_empty(e: &BytesStart) -> Self {
        Self {
            name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
            attributes: attributes_of(e),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// Write element to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(&self.name);
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.self_closing {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            for child in &self.children {
                child.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(&self.name)))?;
        }

        Ok(())
    }

    /// Local name (without prefix)
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Get an attribute by qualified name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get an attribute by local name, ignoring its prefix
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local_name(k) == local && !k.starts_with("xmlns"))
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) an attribute
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Remove an attribute, returning its value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Prefix bound to `uri` on this element, declaring `preferred` when none is
    pub fn prefix_for(&mut self, uri: &str, preferred: &str) -> String {
        match self.declared_prefix(uri) {
            Some(prefix) => prefix.to_string(),
            None => {
                self.set_attr(&format!("xmlns:{}", preferred), uri);
                preferred.to_string()
            }
        }
    }

    /// Prefix this element declares for `uri`
    pub fn declared_prefix(&self, uri: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, v)| k.starts_with("xmlns:") && v == uri)
            .map(|(k, _)| &k["xmlns:".len()..])
    }

    /// Iterate over element children
    pub fn elements(&self) -> impl Iterator<Item = &RawXmlElement> {
        self.children.iter().filter_map(|c| match c {
            RawXmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Iterate over element children mutably
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut RawXmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            RawXmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given local name
    pub fn child(&self, local: &str) -> Option<&RawXmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    /// First child element with the given local name, mutably
    pub fn child_mut(&mut self, local: &str) -> Option<&mut RawXmlElement> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Follow a path of local names
    pub fn descendant(&self, path: &[&str]) -> Option<&RawXmlElement> {
        path.iter().try_fold(self, |elem, local| elem.child(local))
    }

    /// Follow a path of local names, mutably
    pub fn descendant_mut(&mut self, path: &[&str]) -> Option<&mut RawXmlElement> {
        let mut current = self;
        for local in path {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// All descendant elements (depth-first, document order) with the given local name
    pub fn find_all<'a>(&'a self, local: &str, out: &mut Vec<&'a RawXmlElement>) {
        for child in self.elements() {
            if child.local_name() == local {
                out.push(child);
            }
            child.find_all(local, out);
        }
    }

    /// Concatenated text of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                RawXmlNode::Text(t) | RawXmlNode::CData(t) => out.push_str(t),
                RawXmlNode::Element(e) => e.collect_text(out),
                RawXmlNode::Comment(_) => {}
            }
        }
    }

    /// Append a child element
    pub fn push_child(&mut self, child: RawXmlElement) {
        self.self_closing = false;
        self.children.push(RawXmlNode::Element(child));
    }

    /// Remove all child elements with the given local name
    pub fn remove_children(&mut self, local: &str) {
        self.children.retain(|c| match c {
            RawXmlNode::Element(e) => e.local_name() != local,
            _ => true,
        });
    }

    /// Insert a child element respecting a schema sequence.
    ///
    /// `order` lists local names in schema order; the child is placed before the first
    /// existing element that must follow it. Names missing from `order` sort last.
    pub fn insert_child_ordered(&mut self, child: RawXmlElement, order: &[&str]) {
        let rank = |local: &str| order.iter().position(|n| *n == local).unwrap_or(order.len());
        let new_rank = rank(child.local_name());
        let pos = self.children.iter().position(|c| match c {
            RawXmlNode::Element(e) => rank(e.local_name()) > new_rank,
            _ => false,
        });
        self.self_closing = false;
        match pos {
            Some(i) => self.children.insert(i, RawXmlNode::Element(child)),
            None => self.children.push(RawXmlNode::Element(child)),
        }
    }

    /// Add an attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a child element
    pub fn with_child(mut self, child: RawXmlElement) -> Self {
        self.self_closing = false;
        self.children.push(RawXmlNode::Element(child));
        self
    }

    /// Add a text child
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.self_closing = false;
        self.children.push(RawXmlNode::Text(text.into()));
        self
    }
}

impl RawXmlNode {
    /// Write node to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            RawXmlNode::Element(e) => e.write_to(writer),
            RawXmlNode::Text(t) => {
                writer.write_event(Event::Text(BytesText::new(t)))?;
                Ok(())
            }
            RawXmlNode::CData(t) => {
                writer.write_event(Event::CData(BytesCData::new(t.as_str())))?;
                Ok(())
            }
            RawXmlNode::Comment(c) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?;
                Ok(())
            }
        }
    }

    /// Element payload, if this node is an element
    pub fn as_element(&self) -> Option<&RawXmlElement> {
        match self {
            RawXmlNode::Element(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mixed_content_order() {
        let xml = br#"<a>one<b/>two<c>three</c>four</a>"#;
        let root = RawXmlElement::parse(xml).unwrap();
        assert_eq!(root.children.len(), 5);
        assert_eq!(root.text(), "onetwothreefour");

        let out = String::from_utf8(root.to_xml_bytes().unwrap()).unwrap();
        assert!(out.ends_with("<a>one<b/>two<c>three</c>four</a>"));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |levels: usize| format!("{}{}", "<a>".repeat(levels), "</a>".repeat(levels));
        assert!(RawXmlElement::parse(nested(MAX_RAW_DEPTH).as_bytes()).is_ok());
        let err = RawXmlElement::parse(nested(MAX_RAW_DEPTH + 2).as_bytes()).unwrap_err();
        assert_eq!(err.code(), "invalid-format");
    }

    #[test]
    fn test_insert_child_ordered() {
        let mut root = RawXmlElement::parse(b"<ws><sheetData/><pageMargins/></ws>").unwrap();
        root.insert_child_ordered(
            RawXmlElement::new("mergeCells"),
            &["sheetData", "mergeCells", "pageMargins"],
        );
        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["sheetData", "mergeCells", "pageMargins"]);
    }

    #[test]
    fn test_cdata_and_comment_survive() {
        let xml = b"<a><![CDATA[x < y]]><!-- note --></a>";
        let root = RawXmlElement::parse(xml).unwrap();
        let out = String::from_utf8(root.to_xml_bytes().unwrap()).unwrap();
        assert!(out.contains("<![CDATA[x < y]]>"));
        assert!(out.contains("<!-- note -->"));
    }

    #[test]
    fn test_descendant_and_attrs() {
        let mut root =
            RawXmlElement::parse(br#"<p:sld xmlns:p="x"><p:cSld><p:spTree/></p:cSld></p:sld>"#)
                .unwrap();
        assert!(root.descendant(&["cSld", "spTree"]).is_some());
        root.set_attr("show", "0");
        assert_eq!(root.attr("show"), Some("0"));
        assert_eq!(root.remove_attr("show"), Some("0".into()));
        assert_eq!(root.attr_local("p"), None);
    }
}
