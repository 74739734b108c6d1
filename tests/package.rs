//! Integration test: OPC package handling

use chrono::{TimeZone, Utc};
use linch_ooxml_rs::opc::{rel_types, AddMode, ContainerWriter, CoreProperties, TargetMode};
use linch_ooxml_rs::{Document, Package, Presentation, Workbook};
use pretty_assertions::assert_eq;
use std::io::Cursor;

const CUSTOM_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?><data xmlns="urn:acme"><item id="1">kept</item></data>"#;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ContainerWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.write_entry(name, data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_unknown_parts_survive_round_trip() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("body").unwrap();
    let mut package = Package::from_bytes(&doc.to_bytes().unwrap()).unwrap();
    package
        .add_part("/customXml/item1.xml", "application/xml", CUSTOM_XML.to_vec(), AddMode::Create)
        .unwrap();
    let rel = package
        .add_relationship(
            "word/document.xml",
            "urn:acme:custom",
            "customXml/item1.xml",
            TargetMode::Internal,
        )
        .unwrap();

    let mut doc = Document::from_bytes(&package.to_bytes().unwrap()).unwrap();
    doc.add_paragraph("more").unwrap();
    let package = Package::from_bytes(&doc.to_bytes().unwrap()).unwrap();

    assert_eq!(package.get_part("customXml/item1.xml").unwrap().data(), CUSTOM_XML);
    assert_eq!(package.content_type_of("customXml/item1.xml"), Some("application/xml"));
    let rels = package.relationships_of("word/document.xml").unwrap();
    assert_eq!(rels.get(&rel).map(|r| r.target.as_str()), Some("customXml/item1.xml"));
    assert!(package.verify().is_ok());
}

#[test]
fn test_fresh_packages_verify() {
    init();
    let docx = Document::new().to_bytes().unwrap();
    let xlsx = Workbook::new().unwrap().to_bytes().unwrap();
    let pptx = Presentation::new().unwrap().to_bytes().unwrap();
    for (bytes, main) in [
        (docx, "word/document.xml"),
        (xlsx, "xl/workbook.xml"),
        (pptx, "ppt/presentation.xml"),
    ] {
        let package = Package::from_bytes(&bytes).unwrap();
        assert!(package.verify().is_ok(), "{}", main);
        assert_eq!(package.main_document_uri().unwrap().as_str(), main);
        assert!(package.part_exists("docProps/core.xml"), "{}", main);
    }
}

#[test]
fn test_relationship_edits() {
    init();
    let mut package = Package::new();
    package
        .add_part("/a.xml", "application/xml", b"<a/>".to_vec(), AddMode::Create)
        .unwrap();
    package
        .add_part("/b.xml", "application/xml", b"<b/>".to_vec(), AddMode::Create)
        .unwrap();
    assert_eq!(
        package
            .add_part("/a.xml", "application/xml", Vec::new(), AddMode::Create)
            .unwrap_err()
            .code(),
        "invalid-value"
    );

    let first = package
        .add_relationship("a.xml", rel_types::IMAGE, "b.xml", TargetMode::Internal)
        .unwrap();
    let second = package
        .add_relationship("a.xml", rel_types::HYPERLINK, "https://example.com/x", TargetMode::External)
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(package.related_part("a.xml", &first).unwrap().as_str(), "b.xml");
    assert!(package.related_part("a.xml", "rId99").is_err());

    package.delete_part("b.xml").unwrap();
    let rels = package.relationships_of("a.xml").unwrap();
    assert!(rels.get(&first).is_none());
    assert!(rels.get(&second).is_some());
    assert!(package.verify().is_ok());
    assert_eq!(package.get_part("b.xml").unwrap_err().code(), "part-not-found");
}

#[test]
fn test_dangling_relationship_fails_verify() {
    init();
    let content_types = br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#;
    let rels = br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;
    let bytes = zip_of(&[("[Content_Types].xml", content_types), ("_rels/.rels", rels)]);

    let package = Package::from_bytes(&bytes).unwrap();
    assert_eq!(package.verify().unwrap_err().code(), "corrupted");
    assert!(Document::from_bytes(&bytes).is_err());
}

#[test]
fn test_missing_content_types_is_corrupted() {
    init();
    let bytes = zip_of(&[("word/document.xml", b"<w:document/>")]);
    assert_eq!(Package::from_bytes(&bytes).unwrap_err().code(), "corrupted");
    assert_eq!(Package::from_bytes(b"PK\x03\x04junk").unwrap_err().code(), "invalid-format");
}

/// Whatever opens must save, and the saved bytes must open again
fn assert_reopens(bytes: &[u8]) {
    if let Ok(mut doc) = Document::from_bytes(bytes) {
        let saved = doc.to_bytes().unwrap();
        Document::from_bytes(&saved).unwrap();
    }
    if let Ok(mut book) = Workbook::from_bytes(bytes) {
        let saved = book.to_bytes().unwrap();
        Workbook::from_bytes(&saved).unwrap();
    }
    if let Ok(mut deck) = Presentation::from_bytes(bytes) {
        let saved = deck.to_bytes().unwrap();
        Presentation::from_bytes(&saved).unwrap();
    }
}

/// Replace every all-digit attribute value with `value`
fn with_numbers(xml: &str, value: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(pos) = rest.find("=\"") {
        let (head, tail) = rest.split_at(pos + 2);
        out.push_str(head);
        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && tail[digits..].starts_with('"') {
            out.push_str(value);
            rest = &tail[digits..];
        } else {
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}

fn xml_variants(xml: &str) -> Vec<String> {
    let mut out = Vec::new();
    let step = xml.len() / 12 + 1;
    for cut in (1..xml.len()).step_by(step) {
        if xml.is_char_boundary(cut) {
            out.push(xml[..cut].to_string());
        }
    }
    out.push(with_numbers(xml, "4294967295"));
    out.push(with_numbers(xml, "99999999999999999999"));
    if let Some(end) = xml.rfind("</") {
        let extra = r#"<ext:future xmlns:ext="urn:example:future"><ext:leaf ext:id="4294967295"><ext:deeper/></ext:leaf></ext:future>"#;
        out.push(format!("{}{}{}", &xml[..end], extra, &xml[end..]));
    }
    out
}

fn samples() -> Vec<Vec<u8>> {
    let mut doc = Document::new();
    doc.add_paragraph("Fuzzed").unwrap();
    doc.add_bookmark(0, "mark").unwrap();
    let mut book = Workbook::new().unwrap();
    book.sheet_mut("Sheet1").unwrap().set_value("A1", "x").unwrap();
    let mut deck = Presentation::new().unwrap();
    deck.add_slide(0).unwrap();
    vec![doc.to_bytes().unwrap(), book.to_bytes().unwrap(), deck.to_bytes().unwrap()]
}

#[test]
fn test_damaged_containers_reopen_or_fail_cleanly() {
    init();
    for original in &samples() {
        for cut in (0..original.len()).step_by(97) {
            assert_reopens(&original[..cut]);
        }
        for at in (0..original.len()).step_by(53) {
            let mut mutated = original.clone();
            mutated[at] ^= 0x5A;
            assert_reopens(&mutated);
        }
    }
}

#[test]
fn test_damaged_parts_reopen_or_fail_cleanly() {
    init();
    for original in &samples() {
        let package = Package::from_bytes(original).unwrap();
        let xml_parts: Vec<(String, String)> = package
            .parts()
            .filter(|p| p.uri().as_str().ends_with(".xml"))
            .filter_map(|p| Some((p.uri().to_string(), p.data_as_str().ok()?.to_string())))
            .collect();
        assert!(!xml_parts.is_empty());

        for (uri, xml) in &xml_parts {
            for variant in xml_variants(xml) {
                let mut package = Package::from_bytes(original).unwrap();
                package.set_part_data(uri, variant.into_bytes()).unwrap();
                assert_reopens(&package.to_bytes().unwrap());
            }
        }
    }
}

#[test]
fn test_core_properties_round_trip() {
    init();
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let props = CoreProperties {
        title: Some("Q1 & Q2 <draft>".to_string()),
        creator: Some("Dana".to_string()),
        keywords: Some("plan, budget".to_string()),
        revision: Some("4".to_string()),
        created: Some(created),
        ..Default::default()
    };

    let mut book = Workbook::new().unwrap();
    book.set_core_properties(&props).unwrap();
    let book = Workbook::from_bytes(&book.to_bytes().unwrap()).unwrap();
    let read = book.core_properties().unwrap();
    assert_eq!(read.title, props.title);
    assert_eq!(read.creator, props.creator);
    assert_eq!(read.keywords, props.keywords);
    assert_eq!(read.revision, props.revision);
    assert_eq!(read.created, Some(created));
}

#[test]
fn test_closed_package_rejects_access() {
    init();
    let mut package = Package::from_bytes(&Document::new().to_bytes().unwrap()).unwrap();
    package.close();
    package.close();
    assert!(package.is_closed());
    assert_eq!(package.get_part("word/document.xml").unwrap_err().code(), "closed");
    assert_eq!(package.to_bytes().unwrap_err().code(), "closed");
    assert!(!package.part_exists("word/document.xml"));
}

#[test]
fn test_modified_tracking() {
    init();
    assert!(Package::new().is_modified());
    let mut package = Package::from_bytes(&Document::new().to_bytes().unwrap()).unwrap();
    assert!(!package.is_modified());
    assert!(package.parts().all(|p| !p.is_modified()));

    let xml = package.get_part("word/document.xml").unwrap().data().to_vec();
    package.set_part_data("word/document.xml", xml).unwrap();
    assert!(package.get_part("word/document.xml").unwrap().is_modified());
    assert!(package.is_modified());
}
