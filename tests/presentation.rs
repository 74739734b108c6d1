//! Integration test: Presentation API

use linch_ooxml_rs::opc::rel_types;
use linch_ooxml_rs::presentation::{Alignment, Bounds, Bullet, ShapeKind};
use linch_ooxml_rs::{Package, Presentation};
use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reopen(deck: &mut Presentation) -> Presentation {
    let bytes = deck.to_bytes().expect("save");
    Presentation::from_bytes(&bytes).expect("reopen")
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

fn slide_ids(deck: &Presentation) -> Vec<u32> {
    deck.slides().iter().map(|s| s.id()).collect()
}

#[test]
fn test_hidden_slide_survives_save() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hidden.pptx");

    let mut deck = Presentation::new().unwrap();
    deck.add_slide(0).unwrap();
    deck.add_slide(0).unwrap();
    deck.slide_mut(2).unwrap().set_hidden(true).unwrap();
    deck.save(&path).unwrap();

    let deck = Presentation::open(&path).unwrap();
    assert_eq!(deck.slide_count(), 2);
    assert!(!deck.slide(1).unwrap().hidden());
    assert!(deck.slide(2).unwrap().hidden());
}

#[test]
fn test_shapes_round_trip() {
    init();
    let mut deck = Presentation::new().unwrap();
    {
        let mut slide = deck.add_slide(0).unwrap();
        let title = slide
            .add_text_box("Quarterly review\nDraft", Bounds::new(457_200, 274_638, 8_229_600, 1_143_000))
            .unwrap();
        let arrow = slide
            .add_shape("rightArrow", Bounds::new(100, 100, 914_400, 457_200))
            .unwrap();
        let table = slide.add_table(2, 3, Bounds::new(0, 2_000_000, 6_000_000, 740_000)).unwrap();
        slide
            .add_picture(b"\x89PNG\r\n\x1a\nfake", "png", Bounds::new(0, 0, 914_400, 914_400))
            .unwrap();
        slide.add_chart("Revenue", Bounds::new(0, 0, 4_000_000, 3_000_000)).unwrap();
        slide.add_diagram(Bounds::new(0, 0, 4_000_000, 3_000_000)).unwrap();
        assert_eq!((title, arrow, table), (2, 3, 4));

        let shape = slide.shape_mut(arrow).unwrap();
        shape.set_fill_color("FF0000").unwrap();
        shape.set_text("Next").unwrap();

        let body = slide.shape_mut(title).unwrap().text_body_mut().unwrap();
        body.paragraphs[0].set_alignment(Alignment::Center);
        body.paragraphs[1].set_bullet(Bullet::Character("•".into()));
        let run = body.paragraphs[0].runs_mut().next().unwrap();
        run.properties.bold = Some(true);
        run.properties.set_size_points(32.0).unwrap();
        run.properties.set_color("1F4E79").unwrap();

        let mut grid = slide.shape_mut(table).unwrap().table_mut().unwrap();
        grid.set_cell_text(0, 0, "Region").unwrap();
        grid.set_cell_text(1, 2, "42").unwrap();
    }

    let deck = reopen(&mut deck);
    let slide = deck.slide(1).unwrap();
    assert_eq!(slide.shapes().len(), 6);

    let title = slide.shape_by_id(2).unwrap();
    assert_eq!(title.text(), "Quarterly review\nDraft");
    assert!(title.is_text_box());
    let body = title.text_body().unwrap();
    assert_eq!(body.paragraphs[0].alignment(), Some(Alignment::Center));
    assert_eq!(body.paragraphs[1].bullet(), Some(&Bullet::Character("•".into())));
    let run = body.paragraphs[0].runs().next().unwrap();
    assert_eq!(run.properties.bold, Some(true));
    assert_eq!(run.properties.size, Some(3200));
    assert_eq!(run.properties.color.as_deref(), Some("1F4E79"));

    let arrow = slide.shape_by_id(3).unwrap();
    assert_eq!(arrow.geometry(), Some("rightArrow"));
    assert_eq!(arrow.fill_color(), Some("FF0000"));
    assert_eq!(arrow.text(), "Next");

    let table = slide.shape_by_id(4).unwrap().table().unwrap();
    assert_eq!((table.rows(), table.cols()), (2, 3));
    assert_eq!(table.cell(0, 0).unwrap().text(), "Region");
    assert_eq!(table.cell(1, 2).unwrap().text(), "42");
    assert_eq!(table.cell(2, 0).unwrap_err().code(), "invalid-index");

    let kinds: Vec<ShapeKind> = slide.shapes().iter().map(|s| s.kind()).collect();
    assert!(kinds.contains(&ShapeKind::Picture));
    assert!(deck.package().part_exists("ppt/media/image1.png"));
    assert!(deck.package().part_exists("ppt/charts/chart1.xml"));
    assert!(deck.package().part_exists("ppt/diagrams/data1.xml"));
    assert!(deck.package().verify().is_ok());
}

#[test]
fn test_notes_and_comments() {
    init();
    let mut deck = Presentation::new().unwrap();
    let comment_id = {
        let mut slide = deck.add_slide(0).unwrap();
        slide.set_notes("Mention the pilot\nThen the rollout").unwrap();
        let id = slide.add_comment("Tighten this", "Ada Lovelace", 10, 20).unwrap();
        slide.add_comment("Agreed", "Alan Turing", 30, 40).unwrap();
        id
    };

    let mut deck = reopen(&mut deck);
    {
        let slide = deck.slide(1).unwrap();
        assert_eq!(slide.notes().as_deref(), Some("Mention the pilot\nThen the rollout"));
        let comments = slide.comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, comment_id);
        assert_eq!(comments[0].author, "Ada Lovelace");
        assert_eq!(comments[0].initials, "AL");
        assert_eq!(comments[0].text, "Tighten this");
        assert_eq!((comments[1].x, comments[1].y), (30, 40));
    }
    let slide_uri = deck.slide(1).unwrap().uri().to_string();
    let rels = deck.package().relationships_of(&slide_uri).unwrap();
    assert!(rels.by_type(rel_types::NOTES_SLIDE).is_some());
    assert!(rels.by_type(rel_types::MODERN_COMMENTS).is_some());
    assert!(deck.package().part_exists("ppt/authors.xml"));
    assert!(deck.package().part_exists("ppt/notesMasters/notesMaster1.xml"));

    {
        let mut slide = deck.slide_mut(1).unwrap();
        let ids: Vec<String> = slide.comments().into_iter().map(|c| c.id).collect();
        for id in &ids {
            slide.delete_comment(id).unwrap();
        }
        assert_eq!(slide.delete_comment(&ids[0]).unwrap_err().code(), "invalid-reference");
    }
    let deck = reopen(&mut deck);
    assert!(deck.slide(1).unwrap().comments().is_empty());
    assert!(!deck.package().part_exists("ppt/comments/modernComment_1.xml"));
}

#[test]
fn test_slide_lifecycle() {
    init();
    let mut deck = Presentation::new().unwrap();
    for title in ["One", "Two", "Three"] {
        deck.add_slide(0)
            .unwrap()
            .add_text_box(title, Bounds::new(0, 0, 100, 100))
            .unwrap();
    }
    deck.slide_mut(2).unwrap().set_notes("second").unwrap();

    let copy = deck.duplicate_slide(2).unwrap();
    assert_eq!(copy.view().index(), 3);
    assert_eq!(copy.notes().as_deref(), Some("second"));
    assert_eq!(deck.slide_count(), 4);
    assert_eq!(deck.slide(3).unwrap().texts(), vec!["Two".to_string()]);

    deck.reorder_slide(4, 1).unwrap();
    let texts: Vec<String> = deck.slides().iter().map(|s| s.texts().join("")).collect();
    assert_eq!(texts, vec!["Three", "One", "Two", "Two"]);

    let doomed = deck.slide(3).unwrap().uri().to_string();
    deck.delete_slide(3).unwrap();
    assert!(!deck.package().part_exists(&doomed));
    assert_eq!(deck.delete_slide(9).unwrap_err().code(), "invalid-index");

    let deck = reopen(&mut deck);
    let texts: Vec<String> = deck.slides().iter().map(|s| s.texts().join("")).collect();
    assert_eq!(texts, vec!["Three", "One", "Two"]);
    assert_eq!(deck.slide(3).unwrap().notes().as_deref(), Some("second"));
    assert!(deck.package().verify().is_ok());
}

#[test]
fn test_invalid_input_is_rejected() {
    init();
    let mut deck = Presentation::new().unwrap();
    let mut slide = deck.add_slide(0).unwrap();
    assert_eq!(
        slide.add_text_box("x", Bounds::new(-1, 0, 10, 10)).unwrap_err().code(),
        "validation"
    );
    assert_eq!(
        slide.add_picture(b"data", "exe", Bounds::new(0, 0, 10, 10)).unwrap_err().code(),
        "invalid-value"
    );
    assert!(slide.add_comment("text", " ", 0, 0).is_err());
    let id = slide.add_shape("rect", Bounds::new(0, 0, 10, 10)).unwrap();
    assert_eq!(
        slide.shape_mut(id).unwrap().set_fill_color("blue").unwrap_err().code(),
        "validation"
    );
    assert!(Presentation::from_bytes(b"not a zip").is_err());
}

#[test]
fn test_masters_layouts_and_size() {
    init();
    let mut deck = Presentation::new().unwrap();
    let masters = deck.masters();
    assert_eq!(masters.len(), 1);
    let layouts = deck.layouts();
    assert_eq!(layouts.len(), 1);
    assert_eq!(layouts[0].name, "Title Only");
    assert_eq!(layouts[0].master, masters[0].uri);
    assert_eq!(deck.add_slide(5).err().unwrap().code(), "invalid-index");

    deck.set_slide_size(9_144_000, 5_143_500).unwrap();
    assert_eq!(deck.set_slide_size(100, 5_143_500).unwrap_err().code(), "validation");
    let mut deck = reopen(&mut deck);
    assert_eq!(deck.slide_size(), (9_144_000, 5_143_500));
    let xml = deck.package().get_part("ppt/presentation.xml").unwrap().data_as_str().unwrap().to_string();
    assert!(xml.contains(r#"type="screen16x9""#));

    deck.add_slide(0).unwrap();
    let slide = deck.slide(1).unwrap();
    assert_eq!(slide.layout(), Some(layouts[0].uri.as_str()));
}

#[test]
fn test_insert_slide_positions() {
    init();
    let mut deck = Presentation::new().unwrap();
    deck.add_slide(0).unwrap().add_text_box("second", Bounds::new(0, 0, 914_400, 457_200)).unwrap();
    deck.insert_slide(1, 0).unwrap().add_text_box("first", Bounds::new(0, 0, 914_400, 457_200)).unwrap();
    deck.insert_slide(99, 0).unwrap().add_text_box("last", Bounds::new(0, 0, 914_400, 457_200)).unwrap();

    let deck = reopen(&mut deck);
    let texts: Vec<Vec<String>> = deck.slides().iter().map(|s| s.texts()).collect();
    assert_eq!(texts, vec![vec!["first"], vec!["second"], vec!["last"]]);
    let ids: Vec<u32> = deck.slides().iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec![257, 256, 258]);
}

#[test]
fn test_named_shapes_and_deletion() {
    init();
    let mut deck = Presentation::new().unwrap();
    {
        let mut slide = deck.add_slide(0).unwrap();
        let label = slide.add_text_box("draft", Bounds::new(0, 0, 914_400, 457_200)).unwrap();
        let logo = slide
            .add_picture(b"\x89PNG\r\n\x1a\nfake", "png", Bounds::new(0, 0, 914_400, 914_400))
            .unwrap();
        slide.shape_mut(label).unwrap().set_name("Status");
        slide.set_shape_text("Status", "final").unwrap();
        assert_eq!(slide.set_shape_text("Missing", "x").unwrap_err().code(), "invalid-reference");
        for shape in slide.shapes_mut() {
            shape.set_position(10, 20).unwrap();
        }
        slide.delete_shape(logo).unwrap();
        assert_eq!(slide.delete_shape(logo).unwrap_err().code(), "invalid-reference");
    }

    let deck = reopen(&mut deck);
    let slide = deck.slide(1).unwrap();
    assert_eq!(slide.shapes().len(), 1);
    let status = slide.shape_by_name("Status").unwrap();
    assert_eq!(status.text(), "final");
    assert_eq!(status.position(), Some((10, 20)));
    assert!(!deck.package().parts().any(|p| p.uri().as_str().ends_with(".png")));
    assert!(deck.package().verify().is_ok());
}

#[test]
fn test_repeated_saves_are_identical() {
    init();
    let mut deck = Presentation::new().unwrap();
    {
        let mut slide = deck.add_slide(0).unwrap();
        slide.add_text_box("Agenda", Bounds::new(0, 0, 914_400, 457_200)).unwrap();
        slide.set_notes("speak slowly").unwrap();
        slide.add_comment("tighten", "Ann", 10, 10).unwrap();
    }
    deck.add_slide(0).unwrap();

    let mut deck = reopen(&mut deck);
    let first = parts_of(&deck.to_bytes().unwrap());
    let second = parts_of(&deck.to_bytes().unwrap());
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.0, b.0);
        assert!(a.1 == b.1, "{} changed between saves", a.0);
    }
}

#[test]
fn test_slide_ids_continue_after_load() {
    init();
    let mut deck = Presentation::new().unwrap();
    deck.add_slide(0).unwrap();
    deck.add_slide(0).unwrap();
    let bytes = with_part(&deck.to_bytes().unwrap(), "ppt/presentation.xml", |xml| {
        xml.replace(r#"id="257""#, r#"id="300""#)
    });

    let mut deck = Presentation::from_bytes(&bytes).unwrap();
    assert_eq!(slide_ids(&deck), vec![256, 300]);
    deck.add_slide(0).unwrap();
    deck.duplicate_slide(1).unwrap();
    assert_eq!(slide_ids(&deck), vec![256, 302, 300, 301]);
}

#[test]
fn test_exhausted_slide_ids_fail_without_panicking() {
    init();
    let mut deck = Presentation::new().unwrap();
    deck.add_slide(0).unwrap();
    let bytes = with_part(&deck.to_bytes().unwrap(), "ppt/presentation.xml", |xml| {
        xml.replace(r#"id="256""#, r#"id="4294967295""#)
    });

    let mut deck = Presentation::from_bytes(&bytes).unwrap();
    assert_eq!(slide_ids(&deck), vec![u32::MAX]);
    assert_eq!(deck.add_slide(0).err().unwrap().code(), "invalid-value");
    assert_eq!(deck.duplicate_slide(1).err().unwrap().code(), "invalid-value");
    let deck = reopen(&mut deck);
    assert_eq!(deck.slide_count(), 1);
}
