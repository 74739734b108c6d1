//! Integration test: Document API

use linch_ooxml_rs::document::{
    ContentControlOptions, HeaderFooterKind, ListItem, ListKind, ParagraphContent, Run, SdtLock,
    VerticalAlignment,
};
use linch_ooxml_rs::drawing::GraphicKind;
use linch_ooxml_rs::opc::{rel_types, TargetMode};
use linch_ooxml_rs::{Document, Package};
use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reopen(doc: &mut Document) -> Document {
    let bytes = doc.to_bytes().expect("save");
    Document::from_bytes(&bytes).expect("reopen")
}

/// Rewrite one part of a saved package
fn with_part(bytes: &[u8], uri: &str, edit: impl Fn(&str) -> String) -> Vec<u8> {
    let mut package = Package::from_bytes(bytes).unwrap();
    let xml = package.get_part(uri).unwrap().data_as_str().unwrap().to_string();
    package.set_part_data(uri, edit(&xml).into_bytes()).unwrap();
    package.to_bytes().unwrap()
}

/// Every part's name and bytes, sorted by name
fn parts_of(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let package = Package::from_bytes(bytes).unwrap();
    let mut parts: Vec<_> = package.parts().map(|p| (p.uri().to_string(), p.data().to_vec())).collect();
    parts.sort();
    parts
}

const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";

#[test]
fn test_bold_paragraph_round_trip() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.docx");

    let mut doc = Document::new();
    let para = doc.add_paragraph("Hello").unwrap();
    para.runs_mut().next().unwrap().set_bold(true);
    doc.save(&path).unwrap();

    let doc = Document::open(&path).unwrap();
    let para = doc.paragraph(0).unwrap();
    assert_eq!(para.text(), "Hello");
    let runs: Vec<&Run> = para.runs().collect();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].bold());
}

#[test]
fn test_comment_wraps_anchor() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("Acme Corp").unwrap();
    let id = doc.add_comment(0, "Acme Corp", "Reviewer", "Verify").unwrap();

    let doc = reopen(&mut doc);
    let comments = doc.comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Verify");
    assert_eq!(comments[0].author, "Reviewer");

    let para = doc.paragraph(0).unwrap();
    let start = para
        .content
        .iter()
        .position(|c| matches!(c, ParagraphContent::CommentRangeStart(i) if *i == id))
        .expect("range start");
    let end = para
        .content
        .iter()
        .position(|c| matches!(c, ParagraphContent::CommentRangeEnd(i) if *i == id))
        .expect("range end");
    assert!(start < end);
    let covered: String = para.content[start..end].iter().map(ParagraphContent::text).collect();
    assert_eq!(covered, "Acme Corp");
}

#[test]
fn test_external_hyperlink() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("See ")
        .unwrap()
        .add_hyperlink("https://example.com", "Link")
        .unwrap();

    let doc = reopen(&mut doc);
    let para = doc.paragraph(0).unwrap();
    let link = para.hyperlinks().next().expect("hyperlink");
    assert_eq!(link.url(), Some("https://example.com"));
    assert_eq!(link.text(), "Link");

    let rels = doc.package().relationships_of("word/document.xml").unwrap();
    let rel = rels.by_type(rel_types::HYPERLINK).expect("hyperlink relationship");
    assert_eq!(rel.target, "https://example.com");
    assert_eq!(rel.target_mode, TargetMode::External);
    assert_eq!(link.r_id.as_deref(), Some(rel.id.as_str()));
}

fn tracked_document() -> Document {
    let mut doc = Document::new();
    doc.add_paragraph("Keep ")
        .unwrap()
        .add_run(Run::new("drop"));
    doc.delete_tracked_text(0, 1, "Editor").unwrap();
    doc.insert_tracked_text(0, "new", "Editor").unwrap();
    doc
}

#[test]
fn test_accept_all_revisions() {
    init();
    let mut doc = tracked_document();
    assert_eq!(doc.revisions().len(), 2);
    assert_eq!(doc.accept_all_revisions().unwrap(), 2);

    let doc = reopen(&mut doc);
    assert!(doc.revisions().is_empty());
    assert_eq!(doc.paragraph(0).unwrap().text(), "Keep new");
}

#[test]
fn test_reject_all_revisions() {
    init();
    let mut doc = reopen(&mut tracked_document());
    assert_eq!(doc.reject_all_revisions().unwrap(), 2);

    let doc = reopen(&mut doc);
    assert!(doc.revisions().is_empty());
    assert_eq!(doc.paragraph(0).unwrap().text(), "Keep drop");
}

#[test]
fn test_whitespace_survives() {
    init();
    let samples = ["  leading", "trailing  ", "two  spaces"];
    let mut doc = Document::new();
    for text in samples {
        doc.add_paragraph(text).unwrap();
    }
    let doc = reopen(&mut doc);
    let texts: Vec<String> = doc.paragraphs().map(|p| p.text()).collect();
    assert_eq!(texts, samples);
}

#[test]
fn test_closed_document() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("x").unwrap();
    doc.close();
    assert!(doc.is_closed());
    assert_eq!(doc.add_paragraph("y").err().unwrap().code(), "closed");
    assert_eq!(doc.to_bytes().unwrap_err().code(), "closed");
}

#[test]
fn test_headers_and_footers() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("Body").unwrap();
    doc.add_header(HeaderFooterKind::Default).unwrap().set_text("Quarterly report");
    doc.add_header(HeaderFooterKind::First).unwrap().set_text("Cover");
    doc.add_footer(HeaderFooterKind::Default)
        .unwrap()
        .add_paragraph("")
        .add_field("PAGE", "1")
        .unwrap();

    let mut doc = reopen(&mut doc);
    assert_eq!(doc.header(HeaderFooterKind::Default).unwrap().text(), "Quarterly report");
    assert_eq!(doc.header(HeaderFooterKind::First).unwrap().text(), "Cover");
    assert!(doc.header(HeaderFooterKind::Even).is_none());
    let footer = doc.footer(HeaderFooterKind::Default).unwrap();
    let fields: Vec<_> = footer.paragraphs().flat_map(|p| p.fields()).collect();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].instruction.trim(), "PAGE");

    doc.header_mut(HeaderFooterKind::Default).unwrap().set_text("Annual report");
    let doc = reopen(&mut doc);
    assert_eq!(doc.headers().count(), 2);
    assert_eq!(doc.header(HeaderFooterKind::Default).unwrap().text(), "Annual report");
    assert!(doc.package().part_exists("word/header1.xml"));
    let xml = doc.package().get_part("word/document.xml").unwrap().data_as_str().unwrap().to_string();
    assert!(xml.contains("w:titlePg"));
}

#[test]
fn test_content_controls() {
    init();
    let mut doc = Document::new();
    doc.add_block_content_control("customer", "Customer", "Acme Corp").unwrap();
    doc.add_content_control_with(
        ContentControlOptions::new("status")
            .lock(SdtLock::ContentLocked)
            .list(ListKind::DropDown, vec![ListItem::new("Open", "open"), ListItem::new("Closed", "closed")]),
        "Open",
    )
    .unwrap();

    let mut doc = reopen(&mut doc);
    let customer = doc.content_control_by_tag("customer").expect("customer control");
    assert_eq!(customer.alias(), Some("Customer"));
    assert_eq!(customer.text(), "Acme Corp");
    assert!(customer.is_block());
    assert!(customer.id().is_some_and(|id| id > 0));

    let status = doc.content_control_by_tag("status").unwrap();
    assert_eq!(status.lock(), Some(SdtLock::ContentLocked));
    let (kind, items) = status.properties().list().unwrap();
    assert_eq!(kind, ListKind::DropDown);
    assert_eq!(items.len(), 2);
    assert_eq!(doc.content_controls_by_tag("status").len(), 1);

    doc.remove_content_control("customer").unwrap();
    assert!(doc.content_control_by_tag("customer").is_none());
    assert!(doc.text().contains("Acme Corp"));
    assert_eq!(doc.remove_content_control("customer").unwrap_err().code(), "invalid-value");
}

#[test]
fn test_comment_replies_and_deletion() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("Budget is final").unwrap();
    let root = doc.add_comment(0, "final", "Ada Lovelace", "Is it?").unwrap();
    let reply = doc.reply_to_comment(root, "Alan Turing", "Yes").unwrap();

    let mut doc = reopen(&mut doc);
    let comments = doc.comments();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].initials.as_deref(), Some("AL"));
    assert_eq!(comments[1].id, reply);
    assert_eq!(comments[1].parent_id, Some(root));

    doc.delete_comment(root).unwrap();
    let doc = reopen(&mut doc);
    assert!(doc.comments().is_empty());
    assert_eq!(doc.paragraph(0).unwrap().text(), "Budget is final");
}

#[test]
fn test_track_changes_setting() {
    init();
    let mut doc = Document::new();
    assert!(!doc.track_changes_enabled());
    doc.enable_track_changes().unwrap();
    let mut doc = reopen(&mut doc);
    assert!(doc.track_changes_enabled());

    doc.add_paragraph("x").unwrap();
    let id = doc.insert_tracked_text(0, "y", "Editor").unwrap();
    doc.reject_revision(id).unwrap();
    assert_eq!(doc.accept_revision(id).unwrap_err().code(), "invalid-index");
    doc.disable_track_changes().unwrap();
    let doc = reopen(&mut doc);
    assert!(!doc.track_changes_enabled());
    assert_eq!(doc.paragraph(0).unwrap().text(), "x");
}

#[test]
fn test_lists_bookmarks_and_links() {
    init();
    let mut doc = Document::new();
    let bullets = doc.add_bullet_list().unwrap();
    let numbers = doc.add_numbered_list().unwrap();
    assert_ne!(bullets, numbers);
    doc.add_paragraph("Intro").unwrap();
    doc.add_paragraph("First point").unwrap().set_numbering(bullets, 0).unwrap();
    doc.add_paragraph("Step one").unwrap().set_numbering(numbers, 1).unwrap();
    let mark = doc.add_bookmark(0, "intro").unwrap();
    doc.add_paragraph("Back to ")
        .unwrap()
        .add_anchor_link("intro", "the start")
        .unwrap();
    assert_eq!(doc.add_bookmark(1, "intro").unwrap_err().code(), "validation");

    let doc = reopen(&mut doc);
    assert_eq!(doc.paragraph(1).unwrap().numbering(), Some((bullets, 0)));
    assert_eq!(doc.paragraph(2).unwrap().numbering(), Some((numbers, 1)));
    assert_eq!(doc.bookmarks(), vec![(mark, "intro".to_string())]);
    let link = doc.paragraph(3).unwrap().hyperlinks().next().unwrap();
    assert_eq!(link.anchor(), Some("intro"));
    assert_eq!(link.url(), None);
    assert!(doc.numbering().is_some());
    assert!(doc.package().part_exists("word/numbering.xml"));
}

#[test]
fn test_table_cells() {
    init();
    let mut doc = Document::new();
    let table = doc.add_table(2, 3).unwrap();
    table.set_cell_text(0, 0, "Region").unwrap();
    table.set_cell_text(1, 2, "42").unwrap();
    let cell = table.cell_mut(0, 1).unwrap();
    cell.set_grid_span(2);
    cell.set_vertical_alignment(VerticalAlignment::Center);
    table.rows[0].set_header(true);
    table.add_row().cells[0].set_text("extra");
    table.remove_row(2).unwrap();

    let doc = reopen(&mut doc);
    let table = doc.table(0).unwrap();
    assert_eq!(table.texts()[0][0], "Region");
    assert_eq!(table.texts()[1][2], "42");
    assert_eq!(table.row_count(), 2);
    let cell = table.cell(0, 1).unwrap();
    assert!(cell.is_merge_start());
    assert_eq!(cell.vertical_alignment(), Some(VerticalAlignment::Center));
    assert!(table.rows[0].is_header());
}

#[test]
fn test_inline_drawings() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("Figures").unwrap();
    let pic = doc.add_picture(0, b"\x89PNG\r\n\x1a\nfake", "png", 914_400, 914_400).unwrap();
    let chart = doc.add_chart(0, "Revenue", 5_486_400, 3_200_400).unwrap();
    let diagram = doc.add_diagram(0, 5_486_400, 3_200_400).unwrap();
    assert!(pic < chart && chart < diagram);
    assert_eq!(doc.add_picture(0, b"x", "png", 0, 10).unwrap_err().code(), "validation");
    assert_eq!(doc.add_chart(7, "x", 10, 10).unwrap_err().code(), "invalid-index");

    let doc = reopen(&mut doc);
    let drawings = doc.drawings();
    let kinds: Vec<GraphicKind> = drawings.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![GraphicKind::Picture, GraphicKind::Chart, GraphicKind::Diagram]);
    assert_eq!(drawings[0].doc_pr_id, Some(pic));
    assert_eq!(drawings[2].relationship_ids.len(), 4);
    assert!(doc.package().part_exists("word/media/image1.png"));
    assert!(doc.package().part_exists("word/charts/chart1.xml"));
    assert!(doc.package().verify().is_ok());
    assert_eq!(doc.paragraph(0).unwrap().text(), "Figures");
}

#[test]
fn test_repeated_saves_are_identical() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("Stable").unwrap();
    doc.add_bookmark(0, "top").unwrap();
    doc.add_comment(0, "", "Ann", "check").unwrap();
    doc.add_picture(0, b"\x89PNG\r\n\x1a\nfake", "png", 914_400, 914_400).unwrap();
    doc.add_table(2, 2).unwrap();

    let mut doc = reopen(&mut doc);
    let first = parts_of(&doc.to_bytes().unwrap());
    let second = parts_of(&doc.to_bytes().unwrap());
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.0, b.0);
        assert!(a.1 == b.1, "{} changed between saves", a.0);
    }
}

#[test]
fn test_ids_continue_past_wrapped_content() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("Figures").unwrap();
    doc.add_paragraph("Notes").unwrap();
    let bytes = with_part(&doc.to_bytes().unwrap(), "word/document.xml", |xml| {
        let wrapped = format!(
            r#"<w:ins w:id="3" w:author="Ann"><w:bookmarkStart w:id="41" w:name="inside"/><w:r><w:drawing><wp:inline xmlns:wp="{}"><wp:extent cx="10" cy="10"/><wp:docPr id="7" name="Picture 7"/></wp:inline></w:drawing></w:r><w:bookmarkEnd w:id="41"/></w:ins><w:r>"#,
            WP
        );
        xml.replacen("<w:r>", &wrapped, 1)
    });

    let mut doc = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc.drawings().len(), 1);
    assert_eq!(doc.drawings()[0].doc_pr_id, Some(7));
    assert_eq!(doc.add_picture(1, b"\x89PNG\r\n\x1a\nfake", "png", 914_400, 914_400).unwrap(), 8);
    assert_eq!(doc.add_bookmark(1, "after").unwrap(), 42);
    assert_eq!(doc.insert_tracked_text(1, " more", "Ann").unwrap(), 4);
}

#[test]
fn test_exhausted_ids_fail_without_panicking() {
    init();
    let mut doc = Document::new();
    doc.add_paragraph("Edge").unwrap();
    doc.add_bookmark(0, "last").unwrap();
    let bytes = with_part(&doc.to_bytes().unwrap(), "word/document.xml", |xml| {
        xml.replace(r#"w:id="1""#, r#"w:id="4294967295""#)
    });

    let mut doc = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc.bookmarks(), vec![(u32::MAX, "last".to_string())]);
    assert_eq!(doc.add_bookmark(0, "next").unwrap_err().code(), "invalid-value");
    assert_eq!(doc.insert_tracked_text(0, "!", "Ann").unwrap(), 1);
    let doc = reopen(&mut doc);
    assert_eq!(doc.bookmarks().len(), 1);
}
