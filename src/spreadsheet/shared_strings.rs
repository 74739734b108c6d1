//! Shared string table (xl/sharedStrings.xml)

use crate::error::{Error, Result};
use crate::xml::{self, RawXmlElement};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::collections::HashMap;

/// Workbook-wide deduplicated string pool
#[derive(Clone, Debug)]
pub struct SharedStrings {
    /// Qualified root name, `sst` unless the producer used a prefix
    root_name: String,
    root_attrs: Vec<(String, String)>,
    /// String items (si) as parsed, so rich text survives
    items: Vec<RawXmlElement>,
    texts: Vec<String>,
    lookup: HashMap<String, u32>,
    /// Total references from cells
    count: u32,
    /// Trailing children such as extLst
    extra: Vec<RawXmlElement>,
}

impl Default for SharedStrings {
    fn default() -> Self {
        SharedStrings {
            root_name: "sst".to_string(),
            root_attrs: vec![("xmlns".to_string(), xml::S.to_string())],
            items: Vec::new(),
            texts: Vec::new(),
            lookup: HashMap::new(),
            count: 0,
            extra: Vec::new(),
        }
    }
}

impl SharedStrings {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut buf = Vec::new();
        let mut table = SharedStrings {
            root_attrs: Vec::new(),
            ..Default::default()
        };
        let mut seen_root = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"sst" => {
                        seen_root = true;
                        table.read_root_attrs(&e);
                    }
                    b"si" => {
                        let item = RawXmlElement::from_reader(&mut reader, &e)?;
                        table.push_item(item);
                    }
                    _ => table.extra.push(RawXmlElement::from_reader(&mut reader, &e)?),
                },
                Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"sst" => {
                        seen_root = true;
                        table.read_root_attrs(&e);
                    }
                    b"si" => table.push_item(RawXmlElement::from_empty(&e)),
                    _ => table.extra.push(RawXmlElement::from_empty(&e)),
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(Error::InvalidFormat("missing sst element".into()));
        }
        Ok(table)
    }

    fn read_root_attrs(&mut self, start: &BytesStart) {
        self.root_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        for (key, value) in xml::attributes_of(start) {
            match key.as_str() {
                "count" => self.count = value.parse().unwrap_or(0),
                "uniqueCount" => {}
                _ => self.root_attrs.push((key, value)),
            }
        }
    }

    fn push_item(&mut self, item: RawXmlElement) {
        let text = item_text(&item);
        let index = self.items.len() as u32;
        self.lookup.entry(text.clone()).or_insert(index);
        self.texts.push(text);
        self.items.push(item);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        xml::write_part(|writer| {
            let mut start = BytesStart::new(self.root_name.as_str());
            for (key, value) in &self.root_attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            let count = self.count.max(self.items.len() as u32).to_string();
            let unique = self.items.len().to_string();
            start.push_attribute(("count", count.as_str()));
            start.push_attribute(("uniqueCount", unique.as_str()));
            if self.items.is_empty() && self.extra.is_empty() {
                writer.write_event(Event::Empty(start))?;
                return Ok(());
            }
            writer.write_event(Event::Start(start))?;
            for item in self.items.iter().chain(&self.extra) {
                item.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(self.root_name.as_str())))?;
            Ok(())
        })
    }

    /// Index of `text`, appending it when new
    pub fn add(&mut self, text: &str) -> u32 {
        if let Some(&index) = self.lookup.get(text) {
            return index;
        }
        let prefix = match self.root_name.split_once(':') {
            Some((p, _)) => format!("{}:", p),
            None => String::new(),
        };
        let mut t = RawXmlElement::new(format!("{}t", prefix));
        if xml::needs_space_preserve(text) {
            t.set_attr("xml:space", "preserve");
        }
        if !text.is_empty() {
            t = t.with_text(text);
        }
        self.push_item(RawXmlElement::new(format!("{}si", prefix)).with_child(t));
        self.items.len() as u32 - 1
    }

    /// Plain text of an item
    pub fn get(&self, index: u32) -> Option<&str> {
        self.texts.get(index as usize).map(String::as_str)
    }

    pub fn index_of(&self, text: &str) -> Option<u32> {
        self.lookup.get(text).copied()
    }

    /// Number of distinct items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total references from cells, as last counted
    pub fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.texts.iter().map(String::as_str)
    }
}

/// Visible text of a string item (si) or inline string (is); phonetic runs are skipped
pub(crate) fn item_text(item: &RawXmlElement) -> String {
    let mut text = String::new();
    for child in item.elements() {
        match child.local_name() {
            "t" => text.push_str(&child.text()),
            "r" => {
                if let Some(t) = child.child("t") {
                    text.push_str(&t.text());
                }
            }
            _ => {}
        }
    }
    text
}
