//! Core (Dublin Core) document properties, `docProps/core.xml`

use crate::error::Result;
use crate::opc::relationships::rel_types;
use crate::opc::{content_types, well_known, AddMode, Package, TargetMode};
use crate::xml;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Core document properties
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub revision: Option<String>,
    pub category: Option<String>,
    pub content_status: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub version: Option<String>,
    pub last_printed: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl CoreProperties {
    /// Properties stamped with a creator and the current time
    pub fn created_now(creator: &str) -> Self {
        let now = Utc::now();
        Self {
            creator: Some(creator.to_string()),
            last_modified_by: Some(creator.to_string()),
            created: Some(now),
            modified: Some(now),
            ..Default::default()
        }
    }

    /// Parse from `core.xml` bytes
    pub fn from_xml(data: &[u8]) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut props = Self::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let name = e.name();
                    let local = name.local_name();
                    let field = match local.as_ref() {
                        b"coreProperties" => {
                            buf.clear();
                            continue;
                        }
                        other => other.to_vec(),
                    };
                    let text = xml::read_text(&mut reader, &e)?;
                    let text = text.trim().to_string();
                    match field.as_slice() {
                        b"title" => props.title = Some(text),
                        b"subject" => props.subject = Some(text),
                        b"creator" => props.creator = Some(text),
                        b"keywords" => props.keywords = Some(text),
                        b"description" => props.description = Some(text),
                        b"lastModifiedBy" => props.last_modified_by = Some(text),
                        b"revision" => props.revision = Some(text),
                        b"category" => props.category = Some(text),
                        b"contentStatus" => props.content_status = Some(text),
                        b"language" => props.language = Some(text),
                        b"identifier" => props.identifier = Some(text),
                        b"version" => props.version = Some(text),
                        b"lastPrinted" => props.last_printed = parse_date(&text),
                        b"created" => props.created = parse_date(&text),
                        b"modified" => props.modified = parse_date(&text),
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(props)
    }

    /// Serialize to `core.xml` bytes
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        xml::write_part(|w| self.write_to(w))
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut root = BytesStart::new("cp:coreProperties");
        root.push_attribute(("xmlns:cp", xml::CP));
        root.push_attribute(("xmlns:dc", xml::DC));
        root.push_attribute(("xmlns:dcterms", xml::DCTERMS));
        root.push_attribute(("xmlns:dcmitype", xml::DCMITYPE));
        root.push_attribute(("xmlns:xsi", xml::XSI));
        writer.write_event(Event::Start(root))?;

        let text_fields = [
            ("dc:title", &self.title),
            ("dc:subject", &self.subject),
            ("dc:creator", &self.creator),
            ("cp:keywords", &self.keywords),
            ("dc:description", &self.description),
            ("cp:lastModifiedBy", &self.last_modified_by),
            ("cp:revision", &self.revision),
        ];
        for (name, value) in text_fields {
            if let Some(value) = value {
                write_simple(writer, name, value)?;
            }
        }

        if let Some(printed) = &self.last_printed {
            write_simple(writer, "cp:lastPrinted", &format_date(printed))?;
        }
        for (name, value) in [("dcterms:created", &self.created), ("dcterms:modified", &self.modified)] {
            if let Some(value) = value {
                let mut elem = BytesStart::new(name);
                elem.push_attribute(("xsi:type", "dcterms:W3CDTF"));
                writer.write_event(Event::Start(elem))?;
                writer.write_event(Event::Text(BytesText::new(&format_date(value))))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
        }

        let trailing = [
            ("cp:category", &self.category),
            ("cp:contentStatus", &self.content_status),
            ("dc:language", &self.language),
            ("dc:identifier", &self.identifier),
            ("cp:version", &self.version),
        ];
        for (name, value) in trailing {
            if let Some(value) = value {
                write_simple(writer, name, value)?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("cp:coreProperties")))?;
        Ok(())
    }
}

fn write_simple<W: std::io::Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(text) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(_) => {
            log::warn!("ignoring unparseable date '{}' in core properties", text);
            None
        }
    }
}

impl Package {
    /// Read core properties; a package without them yields the empty default
    pub fn core_properties(&self) -> Result<CoreProperties> {
        self.ensure_open()?;
        let uri = self
            .related_part_by_type("", rel_types::CORE_PROPERTIES)
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|| well_known::CORE_PROPS.to_string());

        match self.get_part(&uri) {
            Ok(part) => match CoreProperties::from_xml(part.data()) {
                Ok(props) => Ok(props),
                Err(e) => {
                    log::warn!("failed to parse core properties '{}': {}", uri, e);
                    Ok(CoreProperties::default())
                }
            },
            Err(_) => Ok(CoreProperties::default()),
        }
    }

    /// Write core properties, adding the part and package relationship when absent
    pub fn set_core_properties(&mut self, props: &CoreProperties) -> Result<()> {
        self.ensure_open()?;
        let uri = self
            .related_part_by_type("", rel_types::CORE_PROPERTIES)
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|| well_known::CORE_PROPS.to_string());

        self.add_part(
            &uri,
            content_types::CORE_PROPERTIES,
            props.to_xml_bytes()?,
            AddMode::Overwrite,
        )?;
        if self.relationships_by_type("", rel_types::CORE_PROPERTIES)?.is_empty() {
            self.add_relationship("", rel_types::CORE_PROPERTIES, &uri, TargetMode::Internal)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_core_properties() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>Quarterly &amp; Annual</dc:title>
  <dc:creator>Dana</dc:creator>
  <cp:revision>3</cp:revision>
  <dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created>
</cp:coreProperties>"#;
        let props = CoreProperties::from_xml(xml).unwrap();
        assert_eq!(props.title.as_deref(), Some("Quarterly & Annual"));
        assert_eq!(props.creator.as_deref(), Some("Dana"));
        assert_eq!(props.revision.as_deref(), Some("3"));
        assert_eq!(props.created, Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
        assert_eq!(props.modified, None);
    }

    #[test]
    fn test_serialized_dates_are_typed() {
        let props = CoreProperties {
            modified: Some(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()),
            ..Default::default()
        };
        let out = String::from_utf8(props.to_xml_bytes().unwrap()).unwrap();
        assert!(out.contains(
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">2024-05-06T07:08:09Z</dcterms:modified>"#
        ));
    }

    #[test]
    fn test_package_without_core_properties() {
        let pkg = Package::new();
        assert_eq!(pkg.core_properties().unwrap(), CoreProperties::default());
    }

    #[test]
    fn test_set_core_properties_adds_relationship_once() {
        let mut pkg = Package::new();
        let mut props = CoreProperties::created_now("Dana");
        props.title = Some("Report".into());
        pkg.set_core_properties(&props).unwrap();
        props.subject = Some("Numbers".into());
        pkg.set_core_properties(&props).unwrap();

        assert_eq!(
            pkg.relationships_by_type("", rel_types::CORE_PROPERTIES).unwrap().len(),
            1
        );
        let read = pkg.core_properties().unwrap();
        assert_eq!(read.subject.as_deref(), Some("Numbers"));
        assert_eq!(read.created, props.created.map(|d| d.with_nanosecond(0).unwrap()));
    }
}
