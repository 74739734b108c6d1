//! XML namespaces used in OOXML

/// WordprocessingML main namespace
pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
/// Word 2010 extensions
pub const W14: &str = "http://schemas.microsoft.com/office/word/2010/wordml";
/// Word 2012 extensions (commentsExtended)
pub const W15: &str = "http://schemas.microsoft.com/office/word/2012/wordml";
/// SpreadsheetML main namespace
pub const S: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
/// PresentationML main namespace
pub const P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
/// PowerPoint 2018 comments namespace
pub const P188: &str = "http://schemas.microsoft.com/office/powerpoint/2018/8/main";
/// Relationships namespace
pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// Drawing namespace
pub const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
/// Spreadsheet drawing namespace
pub const XDR: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
/// DrawingML main namespace
pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
/// Pictures namespace
pub const PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
/// Chart namespace
pub const C: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
/// Diagram namespace
pub const DGM: &str = "http://schemas.openxmlformats.org/drawingml/2006/diagram";
/// Table graphic data URI
pub const TABLE: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";
/// Markup compatibility namespace
pub const MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
/// VML namespaces
pub const V: &str = "urn:schemas-microsoft-com:vml";
pub const O: &str = "urn:schemas-microsoft-com:office:office";
pub const X: &str = "urn:schemas-microsoft-com:office:excel";
/// Content Types namespace
pub const CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
/// Package Relationships namespace
pub const PR: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
/// Core Properties namespace (Dublin Core)
pub const CP: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
/// Dublin Core namespace
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
/// Dublin Core Terms namespace
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
/// Dublin Core DCMI types
pub const DCMITYPE: &str = "http://purl.org/dc/dcmitype/";
/// XML Schema instance
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Standard namespace declarations for document.xml
pub fn document_namespaces() -> Vec<(&'static str, &'static str)> {
    vec![
        ("xmlns:w", W),
        ("xmlns:r", R),
        ("xmlns:wp", WP),
        ("xmlns:a", A),
        ("xmlns:pic", PIC),
        ("xmlns:w14", W14),
    ]
}

/// Namespace declarations for header, footer and comments parts
pub fn story_namespaces() -> Vec<(&'static str, &'static str)> {
    vec![
        ("xmlns:w", W),
        ("xmlns:r", R),
        ("xmlns:wp", WP),
        ("xmlns:a", A),
        ("xmlns:w14", W14),
    ]
}

/// Namespace declarations for slide-like parts
pub fn presentation_namespaces() -> Vec<(&'static str, &'static str)> {
    vec![("xmlns:a", A), ("xmlns:r", R), ("xmlns:p", P)]
}
