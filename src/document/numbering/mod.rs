//! Numbering definitions (numbering.xml)
//!
//! Paragraphs refer to a `w:num` by ID; each `w:num` points at a `w:abstractNum`
//! that holds the per-level formats.

mod abstract_num;
mod level;

pub use abstract_num::{AbstractNum, Num};
pub use level::{Level, NumberFormat};

use crate::error::{Error, Result};
use crate::xml::{self, RawXmlElement, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};

/// Highest level count a definition may carry
pub const MAX_LEVELS: u8 = 9;

const BULLETS: [&str; 3] = ["\u{2022}", "o", "\u{25AA}"];

/// A top-level child of `w:numbering`, kept in document order
#[derive(Clone, Debug)]
enum Item {
    Abstract(AbstractNum),
    Num(Num),
    Unknown(RawXmlNode),
}

/// Parsed numbering part
#[derive(Clone, Debug)]
pub struct Numbering {
    root_attrs: Vec<(String, String)>,
    items: Vec<Item>,
}

impl Default for Numbering {
    fn default() -> Self {
        Numbering {
            root_attrs: vec![
                ("xmlns:w".to_string(), xml::W.to_string()),
                ("xmlns:r".to_string(), xml::R.to_string()),
            ],
            items: Vec::new(),
        }
    }
}

impl Numbering {
    pub fn new() -> Self {
        Numbering::default()
    }

    /// Parse a numbering part payload
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut numbering = Numbering {
            root_attrs: Vec::new(),
            items: Vec::new(),
        };
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"numbering" => numbering.root_attrs = xml::attributes_of(&e),
                    b"abstractNum" => numbering
                        .items
                        .push(Item::Abstract(AbstractNum::from_reader(&mut reader, &e)?)),
                    b"num" => numbering.items.push(Item::Num(Num {
                        element: RawXmlElement::from_reader(&mut reader, &e)?,
                    })),
                    _ => {
                        let raw = RawXmlElement::from_reader(&mut reader, &e)?;
                        numbering.items.push(Item::Unknown(RawXmlNode::Element(raw)));
                    }
                },
                Event::Empty(e) => {
                    if e.name().local_name().as_ref() == b"numbering" {
                        numbering.root_attrs = xml::attributes_of(&e);
                    } else {
                        let raw = RawXmlElement::from_empty(&e);
                        numbering.items.push(Item::Unknown(RawXmlNode::Element(raw)));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(numbering)
    }

    /// Serialize to a part payload
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        xml::write_part(|writer| {
            let mut start = BytesStart::new("w:numbering");
            for (key, value) in &self.root_attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Start(start))?;
            for item in &self.items {
                match item {
                    Item::Abstract(abs) => abs.write_to(writer)?,
                    Item::Num(num) => num.element.write_to(writer)?,
                    Item::Unknown(node) => node.write_to(writer)?,
                }
            }
            writer.write_event(Event::End(BytesEnd::new("w:numbering")))?;
            Ok(())
        })
    }

    pub fn abstract_nums(&self) -> impl Iterator<Item = &AbstractNum> {
        self.items.iter().filter_map(|i| match i {
            Item::Abstract(a) => Some(a),
            _ => None,
        })
    }

    pub fn nums(&self) -> impl Iterator<Item = &Num> {
        self.items.iter().filter_map(|i| match i {
            Item::Num(n) => Some(n),
            _ => None,
        })
    }

    pub fn num(&self, num_id: u32) -> Option<&Num> {
        self.nums().find(|n| n.num_id() == num_id)
    }

    pub fn abstract_num(&self, id: u32) -> Option<&AbstractNum> {
        self.abstract_nums().find(|a| a.id == id)
    }

    /// Level definition used by paragraphs with this numId and level
    pub fn level(&self, num_id: u32, ilvl: u8) -> Option<&Level> {
        let abs_id = self.num(num_id)?.abstract_num_id()?;
        self.abstract_num(abs_id)?.level(ilvl)
    }

    /// Whether level 0 of the numbering instance is a bullet
    pub fn is_bullet_list(&self, num_id: u32) -> bool {
        self.level(num_id, 0)
            .and_then(Level::format)
            .map_or(false, |f| f.is_bullet())
    }

    /// Add a decimal definition with `levels` levels (1-9); returns the new numId
    pub fn add_numbering_definition(&mut self, levels: u8) -> Result<u32> {
        if levels == 0 || levels > MAX_LEVELS {
            return Err(Error::InvalidIndex(format!(
                "numbering level count {} outside 1..={}",
                levels, MAX_LEVELS
            )));
        }
        let levels = (0..levels)
            .map(|i| Level::new(i, NumberFormat::Decimal, &format!("%{}.", i + 1)))
            .collect();
        Ok(self.add_definition(levels))
    }

    /// Add a nine-level bullet list; returns the new numId
    pub fn add_bullet_list(&mut self) -> u32 {
        let levels = (0..MAX_LEVELS)
            .map(|i| Level::new(i, NumberFormat::Bullet, BULLETS[usize::from(i) % BULLETS.len()]))
            .collect();
        self.add_definition(levels)
    }

    /// Add a nine-level numbered list (decimal, letter, roman, repeating); returns the new numId
    pub fn add_numbered_list(&mut self) -> u32 {
        let levels = (0..MAX_LEVELS)
            .map(|i| {
                let format = match i % 3 {
                    0 => NumberFormat::Decimal,
                    1 => NumberFormat::LowerLetter,
                    _ => NumberFormat::LowerRoman,
                };
                Level::new(i, format, &format!("%{}.", i + 1))
            })
            .collect();
        self.add_definition(levels)
    }

    fn add_definition(&mut self, levels: Vec<Level>) -> u32 {
        let abs_id = self.abstract_nums().map(|a| a.id + 1).max().unwrap_or(0);
        let num_id = self.nums().map(|n| n.num_id() + 1).max().unwrap_or(1).max(1);

        // abstractNum elements precede every num
        let abs_pos = self
            .items
            .iter()
            .position(|i| matches!(i, Item::Num(_)) || is_trailing(i))
            .unwrap_or(self.items.len());
        self.items
            .insert(abs_pos, Item::Abstract(AbstractNum::new(abs_id, levels)));

        let num_pos = self
            .items
            .iter()
            .position(is_trailing)
            .unwrap_or(self.items.len());
        self.items.insert(num_pos, Item::Num(Num::new(num_id, abs_id)));

        log::debug!("added numbering definition numId={} abstractNumId={}", num_id, abs_id);
        num_id
    }
}

fn is_trailing(item: &Item) -> bool {
    matches!(item, Item::Unknown(RawXmlNode::Element(e)) if e.local_name() == "numIdMacAtCleanup")
}
