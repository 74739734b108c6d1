//! Worksheet drawings (xl/drawings/drawingN.xml) anchored between two cells

use crate::drawing::GraphicKind;
use crate::error::{Error, Result};
use crate::spreadsheet::cell_ref::CellRef;
use crate::xml::{self, RawXmlElement};

/// Default column width and row height in EMU, used to size pictures
const COL_WIDTH_EMU: i64 = 609_600;
const ROW_HEIGHT_EMU: i64 = 190_500;

/// The drawing part of one worksheet
#[derive(Clone, Debug)]
pub struct SheetDrawing {
    uri: String,
    root: RawXmlElement,
}

impl SheetDrawing {
    pub fn new(uri: impl Into<String>) -> Self {
        SheetDrawing {
            uri: uri.into(),
            root: RawXmlElement::new("xdr:wsDr")
                .with_attr("xmlns:xdr", xml::XDR)
                .with_attr("xmlns:a", xml::A)
                .with_attr("xmlns:r", xml::R),
        }
    }

    pub fn from_bytes(uri: impl Into<String>, data: &[u8]) -> Result<Self> {
        let root = RawXmlElement::parse(data)?;
        if root.local_name() != "wsDr" {
            return Err(Error::InvalidFormat(format!("expected wsDr, found {}", root.name)));
        }
        Ok(SheetDrawing { uri: uri.into(), root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn anchors(&self) -> impl Iterator<Item = &RawXmlElement> {
        self.root
            .elements()
            .filter(|e| matches!(e.local_name(), "twoCellAnchor" | "oneCellAnchor" | "absoluteAnchor"))
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors().count()
    }

    /// What each anchor holds, in order
    pub fn kinds(&self) -> Vec<GraphicKind> {
        self.anchors()
            .map(|anchor| {
                if anchor.child("pic").is_some() {
                    return GraphicKind::Picture;
                }
                anchor
                    .descendant(&["graphicFrame", "graphic", "graphicData"])
                    .and_then(|d| d.attr("uri"))
                    .map_or(GraphicKind::Other, GraphicKind::from_uri)
            })
            .collect()
    }

    /// One past the largest shape ID in the part, at least 2
    pub fn next_shape_id(&self) -> Result<u32> {
        let mut found = Vec::new();
        self.root.find_all("cNvPr", &mut found);
        let max = found
            .iter()
            .filter_map(|e| e.attr("id")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        max.checked_add(1)
            .map(|id| id.max(2))
            .ok_or_else(|| Error::InvalidValue("drawing has no shape IDs left".into()))
    }

    /// Anchor `content` from the top-left of `from` to the top-left of `to`
    pub fn add_anchor(&mut self, from: &CellRef, to: &CellRef, content: RawXmlElement) {
        let marker = |name: &str, cell: &CellRef| {
            let (row, col) = cell.zero_based();
            RawXmlElement::new(name)
                .with_child(RawXmlElement::new("xdr:col").with_text(col.to_string()))
                .with_child(RawXmlElement::new("xdr:colOff").with_text("0"))
                .with_child(RawXmlElement::new("xdr:row").with_text(row.to_string()))
                .with_child(RawXmlElement::new("xdr:rowOff").with_text("0"))
        };
        self.root.push_child(
            RawXmlElement::new("xdr:twoCellAnchor")
                .with_child(marker("xdr:from", from))
                .with_child(marker("xdr:to", to))
                .with_child(content)
                .with_child(RawXmlElement::new("xdr:clientData")),
        );
    }
}

/// Check that `from` is the top-left corner of the anchor box
pub(crate) fn check_anchor(from: &CellRef, to: &CellRef) -> Result<()> {
    if from.row > to.row || from.col > to.col {
        return Err(Error::validation(
            "range",
            "from must be the top-left corner of to",
            format!("{}:{}", from, to),
        ));
    }
    Ok(())
}

/// Approximate extent of the box between two anchors at default cell sizes
pub(crate) fn anchor_extent(from: &CellRef, to: &CellRef) -> (i64, i64) {
    let cols = i64::from((to.col - from.col).max(1));
    let rows = i64::from((to.row - from.row).max(1));
    (cols * COL_WIDTH_EMU, rows * ROW_HEIGHT_EMU)
}
