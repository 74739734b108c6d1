//! Header and footer parts (word/headerN.xml, word/footerN.xml)

use crate::document::body::{self, BlockContent};
use crate::document::Paragraph;
use crate::error::{Error, Result};
use crate::xml::{self, RawXmlElement};
use quick_xml::events::{BytesEnd, BytesStart, Event};

/// Which pages a header or footer applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderFooterKind {
    Default,
    First,
    Even,
}

impl HeaderFooterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(HeaderFooterKind::Default),
            "first" => Some(HeaderFooterKind::First),
            "even" => Some(HeaderFooterKind::Even),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderFooterKind::Default => "default",
            HeaderFooterKind::First => "first",
            HeaderFooterKind::Even => "even",
        }
    }
}

/// Schema order of sectPr children
pub(crate) const SECT_PR_ORDER: &[&str] = &[
    "headerReference", "footerReference", "footnotePr", "endnotePr", "type", "pgSz", "pgMar",
    "paperSrc", "pgBorders", "lnNumType", "pgNumType", "cols", "formProt", "vAlign", "noEndnote",
    "titlePg", "textDirection", "bidi", "rtlGutter", "docGrid", "printerSettings", "sectPrChange",
];

/// A header or footer story
#[derive(Clone, Debug)]
pub struct HeaderFooter {
    uri: String,
    is_header: bool,
    root_attrs: Vec<(String, String)>,
    /// Block content of the story
    pub content: Vec<BlockContent>,
}

impl HeaderFooter {
    /// A story holding one empty paragraph
    pub(crate) fn new(uri: &str, is_header: bool) -> Self {
        let root_attrs = xml::story_namespaces()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HeaderFooter {
            uri: uri.to_string(),
            is_header,
            root_attrs,
            content: vec![BlockContent::Paragraph(Paragraph::default())],
        }
    }

    pub(crate) fn from_bytes(uri: &str, is_header: bool, data: &[u8]) -> Result<Self> {
        let root = if is_header { b"hdr".as_slice() } else { b"ftr".as_slice() };
        let mut reader = xml::reader_from_bytes(data);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == root => {
                    let mut root_attrs = xml::attributes_of(&e);
                    xml::declare_namespaces(&mut root_attrs, &xml::story_namespaces());
                    let content = body::read_blocks(&mut reader, root)?;
                    return Ok(HeaderFooter {
                        uri: uri.to_string(),
                        is_header,
                        root_attrs,
                        content,
                    });
                }
                Event::Empty(e) if e.name().local_name().as_ref() == root => {
                    let mut root_attrs = xml::attributes_of(&e);
                    xml::declare_namespaces(&mut root_attrs, &xml::story_namespaces());
                    return Ok(HeaderFooter {
                        uri: uri.to_string(),
                        is_header,
                        root_attrs,
                        content: Vec::new(),
                    });
                }
                Event::Eof => {
                    return Err(Error::InvalidFormat(format!("'{}' has no story root", uri)))
                }
                _ => {}
            }
            buf.clear();
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = if self.is_header { "w:hdr" } else { "w:ftr" };
        xml::write_part(|writer| {
            let mut start = BytesStart::new(name);
            for (key, value) in &self.root_attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Start(start))?;
            for block in &self.content {
                block.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
            Ok(())
        })
    }

    /// Part name, e.g. `word/header1.xml`
    pub fn part_uri(&self) -> &str {
        &self.uri
    }

    pub fn is_header(&self) -> bool {
        self.is_header
    }

    /// Paragraph texts joined with newlines
    pub fn text(&self) -> String {
        body::blocks_text(&self.content)
    }

    /// Replace the content with a single paragraph
    pub fn set_text(&mut self, text: &str) {
        self.content = vec![BlockContent::Paragraph(Paragraph::new(text))];
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.content.iter().filter_map(|b| match b {
            BlockContent::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.content.iter_mut().filter_map(|b| match b {
            BlockContent::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    pub fn add_paragraph(&mut self, text: &str) -> &mut Paragraph {
        self.content.push(BlockContent::Paragraph(Paragraph::new(text)));
        match self.content.last_mut() {
            Some(BlockContent::Paragraph(p)) => p,
            _ => unreachable!(),
        }
    }
}

/// Relationship IDs of header or footer references of each kind in a sectPr
pub(crate) fn references(sect_pr: &RawXmlElement, header: bool) -> Vec<(HeaderFooterKind, String)> {
    let local = if header { "headerReference" } else { "footerReference" };
    sect_pr
        .elements()
        .filter(|e| e.local_name() == local)
        .filter_map(|e| {
            let kind = HeaderFooterKind::parse(e.attr("w:type").unwrap_or("default"))?;
            let id = e.attr_local("id")?;
            Some((kind, id.to_string()))
        })
        .collect()
}

/// Point the sectPr reference of `kind` at `rel_id`
pub(crate) fn set_reference(sect_pr: &mut RawXmlElement, header: bool, kind: HeaderFooterKind, rel_id: &str) {
    let name = if header { "w:headerReference" } else { "w:footerReference" };
    let local = &name[2..];
    sect_pr.children.retain(|c| {
        c.as_element().map_or(true, |e| {
            e.local_name() != local || e.attr("w:type").unwrap_or("default") != kind.as_str()
        })
    });
    sect_pr.insert_child_ordered(
        RawXmlElement::new(name)
            .with_attr("w:type", kind.as_str())
            .with_attr("r:id", rel_id),
        SECT_PR_ORDER,
    );
    if kind == HeaderFooterKind::First && sect_pr.child("titlePg").is_none() {
        sect_pr.insert_child_ordered(RawXmlElement::new("w:titlePg"), SECT_PR_ORDER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_story_roundtrip() {
        let data = br#"<?xml version="1.0"?><w:ftr xmlns:w="w" xmlns:r="r"><w:p><w:r><w:t>Page</w:t></w:r></w:p><w:p><w:r><w:t>two</w:t></w:r></w:p></w:ftr>"#;
        let mut story = HeaderFooter::from_bytes("word/footer1.xml", false, data).unwrap();
        assert_eq!(story.text(), "Page\ntwo");
        story.add_paragraph("three");
        let out = story.to_bytes().unwrap();
        let reparsed = HeaderFooter::from_bytes("word/footer1.xml", false, &out).unwrap();
        assert_eq!(reparsed.text(), "Page\ntwo\nthree");
        assert!(String::from_utf8(out).unwrap().contains(r#"<w:ftr xmlns:w="w" xmlns:r="r" xmlns:wp="#));
    }

    #[test]
    fn test_set_reference_keeps_schema_order() {
        let mut sect = RawXmlElement::parse(
            br#"<w:sectPr xmlns:w="w"><w:footerReference w:type="default" r:id="rId3"/><w:pgSz w:w="12240" w:h="15840"/><w:docGrid w:linePitch="360"/></w:sectPr>"#,
        )
        .unwrap();
        set_reference(&mut sect, true, HeaderFooterKind::First, "rId9");
        let names: Vec<&str> = sect.elements().map(|e| e.local_name()).collect();
        assert_eq!(
            names,
            vec!["headerReference", "footerReference", "pgSz", "titlePg", "docGrid"]
        );
        assert_eq!(
            references(&sect, true),
            vec![(HeaderFooterKind::First, "rId9".to_string())]
        );

        set_reference(&mut sect, false, HeaderFooterKind::Default, "rId10");
        assert_eq!(
            references(&sect, false),
            vec![(HeaderFooterKind::Default, "rId10".to_string())]
        );
    }
}
