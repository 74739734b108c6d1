//! Content Types handling for OPC packages
//!
//! Parses and generates `[Content_Types].xml`; also the well-known content type strings

use crate::error::{Error, Result};
use crate::opc::PartUri;
use crate::xml;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;

/// Content types definition for an OPC package
#[derive(Clone, Debug, Default)]
pub struct ContentTypes {
    /// Default extension mappings (lowercased extension -> content type)
    defaults: BTreeMap<String, String>,
    /// Override mappings (part URI -> content type)
    overrides: BTreeMap<PartUri, String>,
}

impl ContentTypes {
    /// Create a new ContentTypes with standard defaults
    pub fn new() -> Self {
        let mut ct = Self::default();

        ct.add_default("rels", RELATIONSHIPS);
        ct.add_default("xml", XML);

        // Media any core may emit
        ct.add_default("png", PNG);
        ct.add_default("jpeg", JPEG);
        ct.add_default("jpg", JPEG);
        ct.add_default("gif", GIF);
        ct.add_default("bmp", BMP);
        ct.add_default("tiff", TIFF);
        ct.add_default("tif", TIFF);

        ct
    }

    /// Parse from `[Content_Types].xml` bytes
    pub fn from_xml(data: &[u8]) -> Result<Self> {
        let mut reader = xml::reader_from_bytes(data);
        let mut ct = Self::default();
        let mut buf = Vec::new();
        let mut saw_root = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"Types" => saw_root = true,
                    b"Default" => {
                        let ext = xml::get_attr(&e, "Extension");
                        let content_type = xml::get_attr(&e, "ContentType");
                        if let (Some(ext), Some(content_type)) = (ext, content_type) {
                            ct.add_default(&ext, &content_type);
                        }
                    }
                    b"Override" => {
                        let part_name = xml::get_attr(&e, "PartName");
                        let content_type = xml::get_attr(&e, "ContentType");
                        if let (Some(part_name), Some(content_type)) = (part_name, content_type) {
                            match PartUri::new(&part_name) {
                                Ok(uri) => {
                                    ct.overrides.insert(uri, content_type);
                                }
                                Err(_) => log::warn!("ignoring override for bad part name '{}'", part_name),
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(Error::Corrupted("[Content_Types].xml has no Types element".into()));
        }
        Ok(ct)
    }

    /// Serialize to `[Content_Types].xml` bytes
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        xml::write_part(|w| self.write_to(w))
    }

    /// Write the `Types` element
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut types = BytesStart::new("Types");
        types.push_attribute(("xmlns", xml::CT));
        writer.write_event(Event::Start(types))?;

        for (ext, content_type) in &self.defaults {
            let mut default = BytesStart::new("Default");
            default.push_attribute(("Extension", ext.as_str()));
            default.push_attribute(("ContentType", content_type.as_str()));
            writer.write_event(Event::Empty(default))?;
        }

        for (uri, content_type) in &self.overrides {
            let part_name = uri.part_name();
            let mut override_elem = BytesStart::new("Override");
            override_elem.push_attribute(("PartName", part_name.as_str()));
            override_elem.push_attribute(("ContentType", content_type.as_str()));
            writer.write_event(Event::Empty(override_elem))?;
        }

        writer.write_event(Event::End(BytesEnd::new("Types")))?;
        Ok(())
    }

    /// Add a default extension mapping
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        self.defaults
            .insert(extension.to_lowercase(), content_type.to_string());
    }

    /// Add an override for a specific part
    pub fn add_override(&mut self, uri: &PartUri, content_type: &str) {
        self.overrides.insert(uri.clone(), content_type.to_string());
    }

    /// Remove an override
    pub fn remove_override(&mut self, uri: &PartUri) -> Option<String> {
        self.overrides.remove(uri)
    }

    /// Default content type for an extension
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .get(&extension.to_lowercase())
            .map(|s| s.as_str())
    }

    /// Get the content type for a part: override first, then extension default
    pub fn content_type_of(&self, uri: &PartUri) -> Option<&str> {
        if let Some(ct) = self.overrides.get(uri) {
            return Some(ct);
        }
        uri.extension().and_then(|ext| self.default_for(ext))
    }

    /// Make `uri` resolve to `content_type`, adding an override only when needed
    pub fn ensure(&mut self, uri: &PartUri, content_type: &str) {
        let by_default = uri.extension().and_then(|ext| self.default_for(ext));
        if by_default == Some(content_type) {
            self.overrides.remove(uri);
        } else if self.overrides.get(uri).map(|s| s.as_str()) != Some(content_type) {
            self.add_override(uri, content_type);
        }
    }

    /// Iterate over defaults
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over overrides
    pub fn overrides(&self) -> impl Iterator<Item = (&PartUri, &str)> {
        self.overrides.iter().map(|(k, v)| (k, v.as_str()))
    }
}

// Well-known content types

pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const XML: &str = "application/xml";
pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
pub const EXTENDED_PROPERTIES: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";
pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
pub const VML: &str = "application/vnd.openxmlformats-officedocument.vmlDrawing";

// WordprocessingML
pub const WORD_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const WORD_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
pub const WORD_SETTINGS: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";
pub const WORD_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
pub const WORD_COMMENTS: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";
pub const WORD_COMMENTS_EXTENDED: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.commentsExtended+xml";
pub const WORD_HEADER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
pub const WORD_FOOTER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
pub const WORD_FONT_TABLE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.fontTable+xml";

// SpreadsheetML
pub const WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
pub const WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
pub const SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
pub const SPREADSHEET_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
pub const TABLE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml";
pub const SPREADSHEET_COMMENTS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml";

// PresentationML
pub const PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
pub const SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
pub const SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
pub const NOTES_SLIDE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
pub const NOTES_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
pub const PRES_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml";
pub const VIEW_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml";
pub const MODERN_COMMENTS: &str = "application/vnd.ms-powerpoint.comments+xml";
pub const AUTHORS: &str = "application/vnd.ms-powerpoint.authors+xml";

// DrawingML
pub const DRAWING: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";
pub const CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
pub const DIAGRAM_DATA: &str =
    "application/vnd.openxmlformats-officedocument.drawingml.diagramData+xml";
pub const DIAGRAM_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.drawingml.diagramLayout+xml";
pub const DIAGRAM_STYLE: &str =
    "application/vnd.openxmlformats-officedocument.drawingml.diagramStyle+xml";
pub const DIAGRAM_COLORS: &str =
    "application/vnd.openxmlformats-officedocument.drawingml.diagramColors+xml";
pub const DIAGRAM_DRAWING: &str = "application/vnd.ms-office.drawingml.diagramDrawing+xml";

// Media
pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const GIF: &str = "image/gif";
pub const BMP: &str = "image/bmp";
pub const TIFF: &str = "image/tiff";

/// Media content type for an image extension
pub fn for_image_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some(PNG),
        "jpg" | "jpeg" => Some(JPEG),
        "gif" => Some(GIF),
        "bmp" => Some(BMP),
        "tif" | "tiff" => Some(TIFF),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_content_types() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="XML" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

        let ct = ContentTypes::from_xml(xml).unwrap();

        assert_eq!(ct.default_for("rels"), Some(RELATIONSHIPS));
        assert_eq!(ct.default_for("xml"), Some(XML));

        let doc_uri = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(ct.content_type_of(&doc_uri), Some(WORD_DOCUMENT));
        let other = PartUri::new("/word/STYLES.XML").unwrap();
        assert_eq!(ct.content_type_of(&other), Some(XML));
    }

    #[test]
    fn test_roundtrip() {
        let mut ct = ContentTypes::new();
        ct.add_override(&PartUri::new("/word/document.xml").unwrap(), WORD_DOCUMENT);

        let xml = ct.to_xml_bytes().unwrap();
        let text = String::from_utf8(xml.clone()).unwrap();
        assert!(text.contains(r#"PartName="/word/document.xml""#));

        let ct2 = ContentTypes::from_xml(&xml).unwrap();
        let doc_uri = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(ct2.content_type_of(&doc_uri), Some(WORD_DOCUMENT));
    }

    #[test]
    fn test_get_by_extension() {
        let ct = ContentTypes::new();
        let uri = PartUri::new("/word/media/image1.PNG").unwrap();
        assert_eq!(ct.content_type_of(&uri), Some("image/png"));
        let unknown = PartUri::new("/word/media/blob.bin").unwrap();
        assert_eq!(ct.content_type_of(&unknown), None);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut ct = ContentTypes::new();
        let image = PartUri::new("word/media/image1.png").unwrap();
        ct.ensure(&image, PNG);
        assert_eq!(ct.overrides().count(), 0);

        let doc = PartUri::new("word/document.xml").unwrap();
        ct.ensure(&doc, WORD_DOCUMENT);
        ct.ensure(&doc, WORD_DOCUMENT);
        assert_eq!(ct.overrides().count(), 1);
    }

    #[test]
    fn test_missing_root_is_corrupted() {
        let err = ContentTypes::from_xml(b"<Other/>").unwrap_err();
        assert_eq!(err.code(), "corrupted");
    }
}
