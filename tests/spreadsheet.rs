//! Integration test: Workbook API

use linch_ooxml_rs::drawing::GraphicKind;
use linch_ooxml_rs::spreadsheet::{
    column_name, CellKind, CellRef, CellStyle, CellValue, SheetState, MAX_COLUMNS,
};
use linch_ooxml_rs::{Package, Workbook};
use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reopen(book: &mut Workbook) -> Workbook {
    let bytes = book.to_bytes().expect("save");
    Workbook::from_bytes(&bytes).expect("reopen")
}

/// Rewrite one part of a saved package
fn with_part(bytes: &[u8], uri: &str, edit: impl Fn(&str) -> String) -> Vec<u8> {
    let mut package = Package::from_bytes(bytes).unwrap();
    let xml = package.get_part(uri).unwrap().data_as_str().unwrap().to_string();
    package.set_part_data(uri, edit(&xml).into_bytes()).unwrap();
    package.to_bytes().unwrap()
}

fn part_text(bytes: &[u8], uri: &str) -> String {
    let package = Package::from_bytes(bytes).unwrap();
    let text = package.get_part(uri).unwrap().data_as_str().unwrap().to_string();
    text
}

/// Every part's name and bytes, sorted by name
fn parts_of(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let package = Package::from_bytes(bytes).unwrap();
    let mut parts: Vec<_> = package.parts().map(|p| (p.uri().to_string(), p.data().to_vec())).collect();
    parts.sort();
    parts
}

#[test]
fn test_formula_round_trip() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sum.xlsx");

    let mut book = Workbook::new().unwrap();
    {
        let mut sheet = book.sheet_mut("Sheet1").unwrap();
        sheet.set_value("A1", 10).unwrap();
        sheet.set_value("A2", 20).unwrap();
        sheet.set_formula("A3", "A1+A2").unwrap();
    }
    book.save(&path).unwrap();

    let book = Workbook::open(&path).unwrap();
    let sheet = book.sheet("Sheet1").unwrap();
    assert_eq!(sheet.formula("A3").unwrap(), Some("A1+A2"));
    assert_eq!(sheet.kind("A3").unwrap(), CellKind::Formula);
    assert_eq!(sheet.value("A1").unwrap(), CellValue::Number(10.0));
    assert_eq!(sheet.kind("B7").unwrap(), CellKind::Empty);
}

#[test]
fn test_table_row_lifecycle() {
    init();
    let mut book = Workbook::new().unwrap();
    book.add_table("Sheet1", "A1:C3", "Inventory")
        .unwrap()
        .add_row(&[
            ("Column1", CellValue::from("Gadget")),
            ("Column2", CellValue::from(5)),
            ("Column3", CellValue::from(3.5)),
        ])
        .unwrap();

    let book = reopen(&mut book);
    let table = book.table("Inventory").expect("table");
    assert_eq!(table.columns(), vec!["Column1", "Column2", "Column3"]);
    let rows = table.rows().unwrap();
    assert!(!rows.is_empty());
    let first = table.column("Column1").unwrap();
    assert_eq!(first.last(), Some(&CellValue::from("Gadget")));
    let third = table.column("column3").unwrap();
    assert_eq!(third.last(), Some(&CellValue::Number(3.5)));
}

#[test]
fn test_cell_reference_bijection() {
    for (row, col) in [(1, 1), (1, 26), (1, 27), (9, 702), (1_048_576, MAX_COLUMNS)] {
        let text = format!("{}{}", column_name(col), row);
        let parsed = CellRef::parse(&text).unwrap();
        assert_eq!((parsed.row, parsed.col), (row, col));
        assert_eq!(parsed.to_string(), text);
    }
    assert_eq!(CellRef::parse("$AB$12").unwrap().to_string(), "AB12");
    assert_eq!(CellRef::parse("Sheet1!C4").unwrap().to_string(), "C4");
    for bad in ["", "A", "12", "A0", "XFE1", "A1048577"] {
        assert_eq!(CellRef::parse(bad).unwrap_err().code(), "invalid-reference", "{}", bad);
    }
}

#[test]
fn test_shared_strings_deduplicated() {
    init();
    let mut book = Workbook::new().unwrap();
    {
        let mut sheet = book.sheet_mut("Sheet1").unwrap();
        sheet.set_value("A1", "apple").unwrap();
        sheet.set_value("A2", "pear").unwrap();
        sheet.set_value("A3", "apple").unwrap();
    }
    assert_eq!(book.shared_strings().len(), 2);

    let book = reopen(&mut book);
    assert_eq!(book.shared_strings().len(), 2);
    assert_eq!(book.shared_strings().count(), 3);
    let part = book.package().get_part("xl/sharedStrings.xml").unwrap();
    let xml = part.data_as_str().unwrap();
    assert!(xml.contains(r#"uniqueCount="2""#));
    assert_eq!(
        book.sheet("Sheet1").unwrap().value("A3").unwrap(),
        CellValue::from("apple")
    );
}

#[test]
fn test_comments_write_vml() {
    init();
    let mut book = Workbook::new().unwrap();
    {
        let mut sheet = book.sheet_mut("Sheet1").unwrap();
        sheet.add_comment("B3", "Ada Lovelace", "Check the total").unwrap();
        sheet.add_comment("D1", "Ada Lovelace", "Source?").unwrap();
    }

    let mut book = reopen(&mut book);
    let comments = book.sheet("Sheet1").unwrap().comments();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].reference, "B3");
    assert_eq!(comments[0].text, "Check the total");

    let vml = book
        .package()
        .parts()
        .find(|p| p.uri().as_str().ends_with(".vml"))
        .expect("vml part");
    let vml = vml.data_as_str().unwrap();
    assert!(vml.contains("_x0000_s1025"));
    assert!(vml.contains("_x0000_s1026"));

    book.sheet_mut("Sheet1").unwrap().delete_comment("B3").unwrap();
    let book = reopen(&mut book);
    let comments = book.sheet("Sheet1").unwrap().comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].reference, "D1");
}

#[test]
fn test_delete_sheet_removes_parts() {
    init();
    let mut book = Workbook::new().unwrap();
    book.add_sheet("Data").unwrap().set_value("A1", 1).unwrap();
    book.add_table("Data", "A1:B2", "Numbers").unwrap();
    let uri = book.sheet("Data").unwrap().uri().to_string();

    book.delete_sheet("Data").unwrap();
    assert!(!book.package().part_exists(&uri));
    assert!(!book.package().part_exists("xl/tables/table1.xml"));
    assert_eq!(book.sheet_names(), vec!["Sheet1"]);
    assert_eq!(book.delete_sheet("Sheet1").unwrap_err().code(), "validation");

    let book = reopen(&mut book);
    assert_eq!(book.sheet_count(), 1);
    assert!(book.package().verify().is_ok());
}

#[test]
fn test_drawings_are_anchored() {
    init();
    let mut book = Workbook::new().unwrap();
    {
        let mut sheet = book.sheet_mut("Sheet1").unwrap();
        let pic = sheet.add_picture("B2", "D8", b"\x89PNG\r\n\x1a\nfake", "png").unwrap();
        let chart = sheet.add_chart("F2", "M15", "Sales").unwrap();
        let diagram = sheet.add_diagram("B20", "H30").unwrap();
        assert!(pic < chart && chart < diagram);
        assert_eq!(
            sheet.add_picture("D8", "B2", b"x", "png").unwrap_err().code(),
            "validation"
        );
    }

    let book = reopen(&mut book);
    let sheet = book.sheet("Sheet1").unwrap();
    assert_eq!(sheet.drawing_count(), 3);
    assert_eq!(
        sheet.drawing_kinds(),
        vec![GraphicKind::Picture, GraphicKind::Chart, GraphicKind::Diagram]
    );
    assert!(book.package().part_exists("xl/drawings/drawing1.xml"));
    assert!(book.package().part_exists("xl/media/image1.png"));
    assert!(book.package().part_exists("xl/charts/chart1.xml"));
    assert!(book.package().part_exists("xl/diagrams/data1.xml"));
    assert!(book.package().verify().is_ok());
}

#[test]
fn test_styles_and_merges() {
    init();
    let mut book = Workbook::new().unwrap();
    let money = book
        .add_style(&CellStyle::new().bold().fill("FFEEDD").number_format("#,##0.00"))
        .unwrap();
    let again = book.add_style(&CellStyle::new().number_format("#,##0.00")).unwrap();
    assert_ne!(money, again);
    assert_eq!(
        book.add_style(&CellStyle::new().font_color("teal")).unwrap_err().code(),
        "validation"
    );
    {
        let mut sheet = book.sheet_mut("Sheet1").unwrap();
        sheet.set_value("A1", 1234.5).unwrap();
        sheet.set_style("A1", money).unwrap();
        sheet.merge_cells("A1:C1").unwrap();
        sheet.merge_cells("A3:B4").unwrap();
        assert_eq!(sheet.merge_cells("B1:B2").unwrap_err().code(), "validation");
        sheet.unmerge_cells("A3:B4").unwrap();
        sheet.set_value("E5", "gone").unwrap();
        sheet.clear_cell("E5").unwrap();
        assert_eq!(sheet.set_style("A2", 999).unwrap_err().code(), "validation");
    }

    let book = reopen(&mut book);
    let sheet = book.sheet("Sheet1").unwrap();
    assert_eq!(sheet.number_format("A1").unwrap().as_deref(), Some("#,##0.00"));
    assert!(book.styles().is_bold(money));
    let merged: Vec<String> = sheet.merged_cells().iter().map(|r| r.to_string()).collect();
    assert_eq!(merged, vec!["A1:C1"]);
    assert_eq!(sheet.kind("E5").unwrap(), CellKind::Empty);
    assert_eq!(sheet.used_range().map(|r| r.to_string()).as_deref(), Some("A1"));
}

#[test]
fn test_sheet_management_and_names() {
    init();
    let mut book = Workbook::new().unwrap();
    book.add_sheet("Rates").unwrap().set_value("B2", 0.25).unwrap();
    book.add_sheet("Archive").unwrap();
    assert_eq!(book.add_sheet("rates").err().unwrap().code(), "validation");
    assert_eq!(book.add_sheet("a/b").err().unwrap().code(), "validation");

    book.add_named_range("TaxRate", "Rates!$B$2").unwrap();
    book.add_local_named_range("Archive", "Cutoff", "Archive!$A$1").unwrap();
    book.set_named_range_hidden("Cutoff", true).unwrap();
    book.rename_sheet("Rates", "Tax Rates").unwrap();
    book.set_sheet_state("Archive", SheetState::Hidden).unwrap();

    let mut book = reopen(&mut book);
    assert_eq!(book.sheet_names(), vec!["Sheet1", "Tax Rates", "Archive"]);
    assert_eq!(book.sheet_by_index(1).unwrap().value("B2").unwrap(), CellValue::Number(0.25));
    assert_eq!(book.sheet_by_index(3).err().unwrap().code(), "invalid-index");
    assert_eq!(book.sheet("Archive").unwrap().state(), SheetState::Hidden);
    assert_eq!(book.named_range("TaxRate").unwrap().refers_to, "'Tax Rates'!$B$2");
    let cutoff = book.named_range("cutoff").unwrap();
    assert!(cutoff.hidden);
    assert_eq!(cutoff.local_sheet_id, Some(2));

    book.delete_named_range("TaxRate").unwrap();
    assert!(book.named_range("TaxRate").is_none());
    assert_eq!(book.delete_named_range("TaxRate").unwrap_err().code(), "invalid-reference");
}

#[test]
fn test_table_row_edits() {
    init();
    let mut book = Workbook::new().unwrap();
    {
        let mut table = book.add_table("Sheet1", "B2:C4", "Stock").unwrap();
        table
            .update_row(1, &[("column1", "Bolt".into()), ("Column2", 40.into()), ("Missing", 1.into())])
            .unwrap();
        table.update_row(2, &[("Column1", "Nut".into())]).unwrap();
        table.delete_row(1).unwrap();
        assert_eq!(table.update_row(9, &[]).unwrap_err().code(), "invalid-index");
    }
    let book = reopen(&mut book);
    let table = book.table("stock").unwrap();
    assert_eq!(table.data_range().unwrap().map(|r| r.to_string()).as_deref(), Some("B3:C3"));
    assert_eq!(table.column("Column1").unwrap(), vec![CellValue::from("Nut")]);
}

#[test]
fn test_repeated_saves_are_identical() {
    init();
    let mut book = Workbook::new().unwrap();
    {
        let mut sheet = book.sheet_mut("Sheet1").unwrap();
        sheet.set_value("A1", "Item").unwrap();
        sheet.set_value("B2", 2.5).unwrap();
        sheet.set_formula("B3", "B2*2").unwrap();
        sheet.merge_cells("D1:E2").unwrap();
        sheet.add_comment("A1", "Ann", "header").unwrap();
    }
    book.add_table("Sheet1", "G1:H3", "Stock").unwrap();
    book.add_style(&CellStyle::new().bold().number_format("0.000")).unwrap();

    let mut book = reopen(&mut book);
    let first = parts_of(&book.to_bytes().unwrap());
    let second = parts_of(&book.to_bytes().unwrap());
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.0, b.0);
        assert!(a.1 == b.1, "{} changed between saves", a.0);
    }
}

#[test]
fn test_ids_continue_after_load() {
    init();
    let mut book = Workbook::new().unwrap();
    book.add_table("Sheet1", "A1:B3", "First").unwrap();
    book.add_style(&CellStyle::new().number_format("0.000")).unwrap();
    let bytes = book.to_bytes().unwrap();
    let bytes = with_part(&bytes, "xl/workbook.xml", |xml| xml.replace(r#"sheetId="1""#, r#"sheetId="7""#));
    let bytes = with_part(&bytes, "xl/styles.xml", |xml| xml.replace(r#"numFmtId="164""#, r#"numFmtId="200""#));
    let bytes = with_part(&bytes, "xl/tables/table1.xml", |xml| xml.replacen(r#"id="1""#, r#"id="5""#, 1));

    let mut book = Workbook::from_bytes(&bytes).unwrap();
    assert_eq!(book.add_table("Sheet1", "D1:E2", "Second").unwrap().table().id(), 6);
    book.add_sheet("More").unwrap();
    book.add_style(&CellStyle::new().number_format("0.0000")).unwrap();
    let saved = book.to_bytes().unwrap();
    assert!(part_text(&saved, "xl/workbook.xml").contains(r#"sheetId="8""#));
    let styles = part_text(&saved, "xl/styles.xml");
    assert!(styles.contains(r#"<numFmt numFmtId="200" formatCode="0.000"/>"#));
    assert!(styles.contains(r#"<numFmt numFmtId="201" formatCode="0.0000"/>"#));
}

#[test]
fn test_exhausted_sheet_ids_fail_without_panicking() {
    init();
    let mut book = Workbook::new().unwrap();
    let bytes = with_part(&book.to_bytes().unwrap(), "xl/workbook.xml", |xml| {
        xml.replace(r#"sheetId="1""#, r#"sheetId="4294967295""#)
    });

    let mut book = Workbook::from_bytes(&bytes).unwrap();
    assert_eq!(book.add_sheet("More").err().unwrap().code(), "invalid-value");
    assert_eq!(book.sheet_names(), vec!["Sheet1"]);
    let book = reopen(&mut book);
    assert_eq!(book.sheet_count(), 1);
}
