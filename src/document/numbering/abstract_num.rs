//! Abstract numbering definitions and numbering instances

use crate::error::Result;
use crate::xml::{self, RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

use super::level::Level;

/// Abstract numbering definition (w:abstractNum)
#[derive(Clone, Debug, Default)]
pub struct AbstractNum {
    /// Abstract numbering ID
    pub id: u32,
    /// Attributes other than the ID (w15:restartNumberingAfterBreak and friends)
    pub unknown_attrs: Vec<(String, String)>,
    /// Children preceding the levels (nsid, multiLevelType, tmpl, name, ...)
    pub head: Vec<RawXmlNode>,
    /// Level definitions
    pub levels: Vec<Level>,
}

/// Numbering instance (w:num), the ID paragraphs refer to
#[derive(Clone, Debug, PartialEq)]
pub struct Num {
    pub element: RawXmlElement,
}

impl AbstractNum {
    /// A definition with the given levels
    pub fn new(id: u32, levels: Vec<Level>) -> Self {
        AbstractNum {
            id,
            unknown_attrs: Vec::new(),
            head: vec![RawXmlNode::Element(
                RawXmlElement::new("w:multiLevelType").with_attr("w:val", "hybridMultilevel"),
            )],
            levels,
        }
    }

    /// Level by index
    pub fn level(&self, ilvl: u8) -> Option<&Level> {
        self.levels.iter().find(|l| l.ilvl() == ilvl)
    }

    /// Parse from reader (after w:abstractNum start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut abs = AbstractNum::default();
        for (key, value) in xml::attributes_of(start) {
            if key == "w:abstractNumId" {
                if let Ok(id) = value.parse() {
                    abs.id = id;
                    continue;
                }
            }
            abs.unknown_attrs.push((key, value));
        }

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let raw = RawXmlElement::from_reader(reader, &e)?;
                    abs.push(raw);
                }
                Event::Empty(e) => abs.push(RawXmlElement::from_empty(&e)),
                Event::End(e) => {
                    if e.name().local_name().as_ref() == b"abstractNum" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(abs)
    }

    fn push(&mut self, raw: RawXmlElement) {
        if raw.local_name() == "lvl" {
            self.levels.push(Level { element: raw });
        } else {
            self.head.push(RawXmlNode::Element(raw));
        }
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:abstractNum");
        start.push_attribute(("w:abstractNumId", self.id.to_string().as_str()));
        for (key, value) in &self.unknown_attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        for child in &self.head {
            child.write_to(writer)?;
        }
        for level in &self.levels {
            level.element.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:abstractNum")))?;
        Ok(())
    }
}

impl Num {
    pub fn new(num_id: u32, abstract_num_id: u32) -> Self {
        let element = RawXmlElement::new("w:num")
            .with_attr("w:numId", num_id.to_string())
            .with_child(
                RawXmlElement::new("w:abstractNumId").with_attr("w:val", abstract_num_id.to_string()),
            );
        Num { element }
    }

    pub fn num_id(&self) -> u32 {
        self.element
            .attr("w:numId")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn abstract_num_id(&self) -> Option<u32> {
        self.element.child("abstractNumId")?.attr("w:val")?.parse().ok()
    }

    /// Start value overridden for a level, if any
    pub fn start_override(&self, ilvl: u8) -> Option<u32> {
        self.element
            .elements()
            .filter(|e| e.local_name() == "lvlOverride")
            .find(|e| e.attr("w:ilvl").and_then(|v| v.parse().ok()) == Some(ilvl))?
            .child("startOverride")?
            .attr("w:val")?
            .parse()
            .ok()
    }
}
