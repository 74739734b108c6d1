//! Notes slides (ppt/notesSlides/notesSlideN.xml)

use crate::error::{Error, Result};
use crate::presentation::template;
use crate::presentation::text::TextBody;
use crate::xml::RawXmlElement;

/// Schema order of `p:sp` children
const SP_ORDER: &[&str] = &["nvSpPr", "spPr", "style", "txBody", "extLst"];

/// A notes slide part
#[derive(Clone, Debug)]
pub(crate) struct NotesSlide {
    uri: String,
    root: RawXmlElement,
}

fn is_body_placeholder(sp: &RawXmlElement) -> bool {
    sp.local_name() == "sp"
        && sp
            .descendant(&["nvSpPr", "nvPr", "ph"])
            .and_then(|ph| ph.attr("type"))
            == Some("body")
}

fn body_placeholder(id: u32, text: &TextBody) -> RawXmlElement {
    RawXmlElement::new("p:sp")
        .with_child(
            RawXmlElement::new("p:nvSpPr")
                .with_child(
                    RawXmlElement::new("p:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", "Notes Placeholder"),
                )
                .with_child(
                    RawXmlElement::new("p:cNvSpPr")
                        .with_child(RawXmlElement::new("a:spLocks").with_attr("noGrp", "1")),
                )
                .with_child(
                    RawXmlElement::new("p:nvPr").with_child(
                        RawXmlElement::new("p:ph")
                            .with_attr("type", "body")
                            .with_attr("idx", "1"),
                    ),
                ),
        )
        .with_child(RawXmlElement::new("p:spPr"))
        .with_child(text.to_element("p:txBody"))
}

impl NotesSlide {
    /// An empty notes slide: group properties and a clrMapOvr
    pub(crate) fn new(uri: impl Into<String>) -> Self {
        NotesSlide {
            uri: uri.into(),
            root: template::notes_slide(),
        }
    }

    pub(crate) fn parse(uri: &str, data: &[u8]) -> Result<Self> {
        let root = RawXmlElement::parse(data)?;
        if root.local_name() != "notes" {
            return Err(Error::InvalidFormat(format!("expected notes, found {}", root.name)));
        }
        Ok(NotesSlide {
            uri: uri.to_string(),
            root,
        })
    }

    pub(crate) fn uri(&self) -> &str {
        &self.uri
    }

    fn tree(&self) -> Option<&RawXmlElement> {
        self.root.descendant(&["cSld", "spTree"])
    }

    /// Text of the body placeholder, paragraphs joined by `\n`
    pub(crate) fn text(&self) -> String {
        self.tree()
            .and_then(|t| t.elements().find(|e| is_body_placeholder(e)))
            .and_then(|sp| sp.child("txBody"))
            .map(|tb| TextBody::from_element(tb).text())
            .unwrap_or_default()
    }

    /// Replace the body placeholder text, adding the placeholder when missing
    pub(crate) fn set_text(&mut self, text: &str) -> Result<()> {
        let tree = self
            .root
            .descendant_mut(&["cSld", "spTree"])
            .ok_or_else(|| Error::InvalidFormat(format!("notes slide '{}' has no shape tree", self.uri)))?;

        if let Some(sp) = tree.elements_mut().find(|e| is_body_placeholder(e)) {
            let mut body = sp.child("txBody").map(TextBody::from_element).unwrap_or_default();
            body.set_text(text);
            let tag = match sp.name.split_once(':') {
                Some((prefix, _)) => format!("{}:txBody", prefix),
                None => "txBody".to_string(),
            };
            sp.remove_children("txBody");
            sp.insert_child_ordered(body.to_element(&tag), SP_ORDER);
            return Ok(());
        }

        let mut ids = Vec::new();
        tree.find_all("cNvPr", &mut ids);
        let id = ids
            .iter()
            .filter_map(|c| c.attr("id")?.parse::<u32>().ok())
            .max()
            .unwrap_or(1)
            .max(1)
            .checked_add(1)
            .ok_or_else(|| Error::InvalidValue(format!("notes slide '{}' has no shape IDs left", self.uri)))?;
        tree.push_child(body_placeholder(id, &TextBody::new(text)));
        Ok(())
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_notes_text() {
        let mut notes = NotesSlide::new("ppt/notesSlides/notesSlide1.xml");
        assert_eq!(notes.text(), "");
        notes.set_text("first\nsecond").unwrap();
        assert_eq!(notes.text(), "first\nsecond");
        notes.set_text("again").unwrap();
        assert_eq!(notes.text(), "again");

        let reparsed = NotesSlide::parse(notes.uri(), &notes.to_bytes().unwrap()).unwrap();
        assert_eq!(reparsed.text(), "again");
        let mut sps = Vec::new();
        reparsed.root.find_all("sp", &mut sps);
        assert_eq!(sps.len(), 1);
        assert_eq!(sps[0].descendant(&["nvSpPr", "cNvPr"]).unwrap().attr("id"), Some("2"));
    }

    #[test]
    fn test_existing_placeholder_is_reused() {
        let xml = r#"<p:notes xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree>
            <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>
            <p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
            <p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/>
            <p:txBody><a:bodyPr/><a:p><a:r><a:t>Speak slowly</a:t></a:r></a:p></p:txBody></p:sp>
            </p:spTree></p:cSld></p:notes>"#;
        let mut notes = NotesSlide::parse("n.xml", xml.as_bytes()).unwrap();
        assert_eq!(notes.text(), "Speak slowly");
        notes.set_text("Speak up").unwrap();
        assert_eq!(notes.text(), "Speak up");
        assert!(NotesSlide::parse("n.xml", b"<p:sld xmlns:p=\"p\"/>").is_err());
    }
}
