//! XML utilities and raw element preservation for round-trip support

mod namespace;
mod raw;

pub use namespace::*;
pub use raw::{RawXmlElement, RawXmlNode};

use crate::error::{Error, Result};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strip a leading UTF-8 byte order mark
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Create a reader over a part payload.
///
/// Whitespace is not trimmed so that text nodes round-trip unchanged.
pub fn reader_from_bytes(data: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(strip_bom(data));
    reader.config_mut().trim_text(false);
    reader
}

/// Serialize a part payload: the canonical prolog followed by whatever `body` writes
pub fn write_part<F>(body: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> Result<()>,
{
    let mut buffer = Vec::new();
    let mut writer = Writer::new(&mut buffer);
    write_decl(&mut writer)?;
    body(&mut writer)?;
    Ok(buffer)
}

/// Write `<?xml version="1.0" encoding="UTF-8" standalone="yes"?>`
pub fn write_decl<W: std::io::Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.get_mut().write_all(b"\r\n")?;
    Ok(())
}

/// Whether a text node needs `xml:space="preserve"` to survive a round-trip
pub fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains("  ")
}

/// Write `<name>text</name>`, adding `xml:space="preserve"` when needed
pub fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    if needs_space_preserve(text) {
        start.push_attribute(("xml:space", "preserve"));
    }
    if text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Write an empty element carrying a single `w:val`-style attribute
pub fn write_val_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    attr: &str,
    value: &str,
) -> Result<()> {
    let mut elem = BytesStart::new(name);
    elem.push_attribute((attr, value));
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

/// Read the character data of the element that was just opened, up to its end tag.
///
/// Nested markup is skipped; text and CDATA are concatenated.
pub fn read_text<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<String> {
    let name = start.name().as_ref().to_vec();
    let mut text = String::new();
    let mut depth = 1usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::Start(e) if e.name().as_ref() == name => depth += 1,
            Event::End(e) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => return Err(Error::InvalidFormat("unexpected end of XML".into())),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Skip an element and all its children
pub fn skip_element<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<()> {
    let target = start.name().as_ref().to_vec();
    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == target => depth += 1,
            Event::End(e) if e.name().as_ref() == target => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => return Err(Error::InvalidFormat("unexpected end of XML".into())),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Unescaped attribute value, falling back to the raw bytes
pub fn attr_value(attr: &Attribute) -> String {
    match attr.unescape_value() {
        Ok(v) => v.into_owned(),
        Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
    }
}

/// All attributes of an element as (qualified name, value) pairs
pub fn attributes_of(element: &BytesStart) -> Vec<(String, String)> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).to_string(),
                attr_value(&a),
            )
        })
        .collect()
}

/// Helper to get attribute value from BytesStart
pub fn get_attr(element: &BytesStart, name: &str) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name.as_bytes())
        .map(|a| attr_value(&a))
}

/// Get an attribute by local name, ignoring its prefix
pub fn get_attr_local(element: &BytesStart, local: &str) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == local.as_bytes())
        .map(|a| attr_value(&a))
}

/// Helper to get w:val attribute (common in OOXML)
pub fn get_w_val(element: &BytesStart) -> Option<String> {
    get_attr(element, "w:val").or_else(|| get_attr(element, "val"))
}

/// Parse a boolean value from OOXML (handles "1", "true", "on", or missing val)
pub fn parse_bool(element: &BytesStart) -> bool {
    match get_w_val(element) {
        None => true, // No val attribute means true (e.g., <w:b/>)
        Some(v) => parse_bool_str(&v),
    }
}

/// Parse an OOXML boolean attribute value
pub fn parse_bool_str(value: &str) -> bool {
    matches!(value, "1" | "true" | "on")
}

/// Add each `xmlns:*` declaration in `wanted` whose prefix the root does not declare yet
pub fn declare_namespaces(attrs: &mut Vec<(String, String)>, wanted: &[(&str, &str)]) {
    for (key, uri) in wanted {
        if !attrs.iter().any(|(k, _)| k == key) {
            attrs.push((key.to_string(), uri.to_string()));
        }
    }
}

/// Local part of a qualified name
pub fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raw_element_roundtrip() {
        let xml = r#"<w:custom foo="bar"><w:child>text</w:child></w:custom>"#;
        let elem = RawXmlElement::parse(xml.as_bytes()).unwrap();

        assert_eq!(elem.name, "w:custom");
        assert_eq!(elem.attributes.len(), 1);
        assert_eq!(elem.children.len(), 1);
    }

    #[test]
    fn test_strip_bom() {
        let data = b"\xEF\xBB\xBF<a/>";
        assert_eq!(strip_bom(data), b"<a/>");
        assert_eq!(strip_bom(b"<a/>"), b"<a/>");
    }

    #[test]
    fn test_needs_space_preserve() {
        assert!(needs_space_preserve(" lead"));
        assert!(needs_space_preserve("trail\t"));
        assert!(needs_space_preserve("two  spaces"));
        assert!(!needs_space_preserve("plain text"));
        assert!(!needs_space_preserve(""));
    }

    #[test]
    fn test_read_text_keeps_spaces() {
        let mut reader = reader_from_bytes(b"<w:t xml:space=\"preserve\">  a &amp; b </w:t>");
        let mut buf = Vec::new();
        let Event::Start(e) = reader.read_event_into(&mut buf).unwrap() else {
            panic!("expected start");
        };
        let e = e.into_owned();
        assert_eq!(read_text(&mut reader, &e).unwrap(), "  a & b ");
    }

    #[test]
    fn test_write_part_has_prolog() {
        let bytes = write_part(|w| write_text_element(w, "t", " x ")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#
        ));
        assert!(text.contains(r#"<t xml:space="preserve"> x </t>"#));
    }

    #[test]
    fn test_attribute_unescape() {
        let elem = RawXmlElement::parse(br#"<a title="x &amp; y"/>"#).unwrap();
        assert_eq!(elem.attr("title"), Some("x & y"));
    }

    #[test]
    fn test_namespace_constants() {
        assert!(W.contains("wordprocessingml"));
        assert!(R.contains("relationships"));
    }
}
