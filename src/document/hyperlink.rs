//! Hyperlink element (w:hyperlink)

use crate::document::Run;
use crate::error::Result;
use crate::xml::{self, RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Hyperlink element
#[derive(Clone, Debug, Default)]
pub struct Hyperlink {
    /// Relationship ID (for external links)
    pub r_id: Option<String>,
    /// Anchor (for internal links)
    pub anchor: Option<String>,
    /// Tooltip
    pub tooltip: Option<String>,
    /// Content runs
    pub runs: Vec<Run>,
    /// Resolved target of `r_id`; not serialized
    pub(crate) url: Option<String>,
    /// Unknown attributes (preserved)
    pub unknown_attrs: Vec<(String, String)>,
    /// Non-run children (preserved, written after the runs)
    pub unknown_children: Vec<RawXmlNode>,
}

impl Hyperlink {
    /// Link to an external URL
    pub fn external(url: &str, text: &str) -> Self {
        Hyperlink {
            url: Some(url.to_string()),
            runs: vec![link_run(text)],
            unknown_attrs: vec![("w:history".into(), "1".into())],
            ..Default::default()
        }
    }

    /// Link to a bookmark in the same document
    pub fn internal(anchor: &str, text: &str) -> Self {
        Hyperlink {
            anchor: Some(anchor.to_string()),
            runs: vec![link_run(text)],
            ..Default::default()
        }
    }

    /// Parse from reader
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut link = Hyperlink::default();
        for (key, value) in xml::attributes_of(start) {
            match key.as_str() {
                "r:id" => link.r_id = Some(value),
                "w:anchor" => link.anchor = Some(value),
                "w:tooltip" => link.tooltip = Some(value),
                _ => link.unknown_attrs.push((key, value)),
            }
        }

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    if e.name().local_name().as_ref() == b"r" {
                        link.runs.push(Run::from_reader(reader, &e)?);
                    } else {
                        let raw = RawXmlElement::from_reader(reader, &e)?;
                        link.unknown_children.push(RawXmlNode::Element(raw));
                    }
                }
                Event::Empty(e) => {
                    if e.name().local_name().as_ref() == b"r" {
                        link.runs.push(Run::from_empty(&e));
                    } else {
                        let raw = RawXmlElement::from_empty(&e);
                        link.unknown_children.push(RawXmlNode::Element(raw));
                    }
                }
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"hyperlink" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(link)
    }

    /// Target URL of an external link
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Bookmark name of an internal link
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Tooltip text
    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// Set tooltip text
    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) {
        self.tooltip = Some(tooltip.into());
    }

    /// Point this link at a new URL; the relationship is rebound on save
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
        self.r_id = None;
        self.anchor = None;
    }

    /// Display text
    pub fn text(&self) -> String {
        self.runs.iter().map(Run::text).collect()
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:hyperlink");
        if let Some(r_id) = &self.r_id {
            start.push_attribute(("r:id", r_id.as_str()));
        }
        if let Some(anchor) = &self.anchor {
            start.push_attribute(("w:anchor", anchor.as_str()));
        }
        if let Some(tooltip) = &self.tooltip {
            start.push_attribute(("w:tooltip", tooltip.as_str()));
        }
        for (key, value) in &self.unknown_attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.runs.is_empty() && self.unknown_children.is_empty() {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            for run in &self.runs {
                run.write_to(writer)?;
            }
            for child in &self.unknown_children {
                child.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new("w:hyperlink")))?;
        }

        Ok(())
    }
}

fn link_run(text: &str) -> Run {
    let mut run = Run::new(text);
    run.set_style("Hyperlink");
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_hyperlink() {
        let data = br#"<w:hyperlink xmlns:w="w" xmlns:r="r" r:id="rId9" w:history="1"><w:r><w:t>Link</w:t></w:r><w:proofErr w:type="spellStart"/></w:hyperlink>"#;
        let mut reader = xml::reader_from_bytes(data);
        let mut buf = Vec::new();
        let link = loop {
            if let Event::Start(e) = reader.read_event_into(&mut buf).unwrap() {
                let e = e.into_owned();
                break Hyperlink::from_reader(&mut reader, &e).unwrap();
            }
        };
        assert_eq!(link.r_id.as_deref(), Some("rId9"));
        assert_eq!(link.text(), "Link");
        assert_eq!(link.unknown_children.len(), 1);
        assert_eq!(link.url(), None);
    }

    #[test]
    fn test_external_link_has_url_before_save() {
        let link = Hyperlink::external("https://example.com", "Example");
        assert_eq!(link.url(), Some("https://example.com"));
        assert_eq!(link.runs[0].style(), Some("Hyperlink"));
    }
}
