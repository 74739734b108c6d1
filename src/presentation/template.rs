//! Payloads of the parts a new presentation starts with

use crate::error::Result;
use crate::presentation::text::TextBody;
use crate::xml::{self, RawXmlElement};

/// Slide width of a new deck (16:9), EMU
pub const DEFAULT_SLIDE_WIDTH: i64 = 12_192_000;
/// Slide height of a new deck, EMU
pub const DEFAULT_SLIDE_HEIGHT: i64 = 6_858_000;

/// First slide master ID; master and layout IDs share one space above this
pub(crate) const FIRST_MASTER_ID: u32 = 2_147_483_648;

fn with_namespaces(name: &str) -> RawXmlElement {
    let mut root = RawXmlElement::new(name);
    for (key, ns) in xml::presentation_namespaces() {
        root.set_attr(key, ns);
    }
    root
}

/// `p:spTree` holding only its group properties
pub(crate) fn empty_shape_tree() -> RawXmlElement {
    RawXmlElement::new("p:spTree")
        .with_child(
            RawXmlElement::new("p:nvGrpSpPr")
                .with_child(
                    RawXmlElement::new("p:cNvPr")
                        .with_attr("id", "1")
                        .with_attr("name", ""),
                )
                .with_child(RawXmlElement::new("p:cNvGrpSpPr"))
                .with_child(RawXmlElement::new("p:nvPr")),
        )
        .with_child(
            RawXmlElement::new("p:grpSpPr").with_child(
                RawXmlElement::new("a:xfrm")
                    .with_child(RawXmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                    .with_child(RawXmlElement::new("a:ext").with_attr("cx", "0").with_attr("cy", "0"))
                    .with_child(RawXmlElement::new("a:chOff").with_attr("x", "0").with_attr("y", "0"))
                    .with_child(RawXmlElement::new("a:chExt").with_attr("cx", "0").with_attr("cy", "0")),
            ),
        )
}

fn clr_map() -> RawXmlElement {
    let mut map = RawXmlElement::new("p:clrMap");
    for (key, value) in [
        ("bg1", "lt1"),
        ("tx1", "dk1"),
        ("bg2", "lt2"),
        ("tx2", "dk2"),
        ("accent1", "accent1"),
        ("accent2", "accent2"),
        ("accent3", "accent3"),
        ("accent4", "accent4"),
        ("accent5", "accent5"),
        ("accent6", "accent6"),
        ("hlink", "hlink"),
        ("folHlink", "folHlink"),
    ] {
        map.set_attr(key, value);
    }
    map
}

fn master_color_mapping() -> RawXmlElement {
    RawXmlElement::new("p:clrMapOvr").with_child(RawXmlElement::new("a:masterClrMapping"))
}

/// A placeholder `p:sp`; `bounds` is (x, y, cx, cy), absent to inherit
fn placeholder(id: u32, name: &str, kind: &str, idx: Option<u32>, bounds: Option<(i64, i64, i64, i64)>) -> RawXmlElement {
    let mut ph = RawXmlElement::new("p:ph").with_attr("type", kind);
    if let Some(idx) = idx {
        ph.set_attr("idx", idx.to_string());
    }
    let mut sppr = RawXmlElement::new("p:spPr");
    if let Some((x, y, cx, cy)) = bounds {
        sppr.push_child(
            RawXmlElement::new("a:xfrm")
                .with_child(
                    RawXmlElement::new("a:off")
                        .with_attr("x", x.to_string())
                        .with_attr("y", y.to_string()),
                )
                .with_child(
                    RawXmlElement::new("a:ext")
                        .with_attr("cx", cx.to_string())
                        .with_attr("cy", cy.to_string()),
                ),
        );
    }
    RawXmlElement::new("p:sp")
        .with_child(
            RawXmlElement::new("p:nvSpPr")
                .with_child(
                    RawXmlElement::new("p:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", name),
                )
                .with_child(
                    RawXmlElement::new("p:cNvSpPr")
                        .with_child(RawXmlElement::new("a:spLocks").with_attr("noGrp", "1")),
                )
                .with_child(RawXmlElement::new("p:nvPr").with_child(ph)),
        )
        .with_child(sppr)
        .with_child(TextBody::default().to_element("p:txBody"))
}

/// `p:presentation` with one master, slide size and notes size
pub(crate) fn presentation(master_rel: &str) -> RawXmlElement {
    with_namespaces("p:presentation")
        .with_attr("saveSubsetFonts", "1")
        .with_child(
            RawXmlElement::new("p:sldMasterIdLst").with_child(
                RawXmlElement::new("p:sldMasterId")
                    .with_attr("id", FIRST_MASTER_ID.to_string())
                    .with_attr("r:id", master_rel),
            ),
        )
        .with_child(
            RawXmlElement::new("p:sldSz")
                .with_attr("cx", DEFAULT_SLIDE_WIDTH.to_string())
                .with_attr("cy", DEFAULT_SLIDE_HEIGHT.to_string()),
        )
        .with_child(
            RawXmlElement::new("p:notesSz")
                .with_attr("cx", DEFAULT_SLIDE_HEIGHT.to_string())
                .with_attr("cy", "9144000"),
        )
}

/// Slide master with title and body placeholders and one layout
pub(crate) fn slide_master(layout_rel: &str) -> Result<Vec<u8>> {
    let mut tree = empty_shape_tree();
    tree.push_child(placeholder(2, "Title Placeholder 1", "title", None, Some((838_200, 365_125, 10_515_600, 1_325_563))));
    tree.push_child(placeholder(3, "Text Placeholder 2", "body", Some(1), Some((838_200, 1_825_625, 10_515_600, 4_351_338))));
    with_namespaces("p:sldMaster")
        .with_child(
            RawXmlElement::new("p:cSld")
                .with_child(
                    RawXmlElement::new("p:bg").with_child(
                        RawXmlElement::new("p:bgRef")
                            .with_attr("idx", "1001")
                            .with_child(RawXmlElement::new("a:schemeClr").with_attr("val", "bg1")),
                    ),
                )
                .with_child(tree),
        )
        .with_child(clr_map())
        .with_child(
            RawXmlElement::new("p:sldLayoutIdLst").with_child(
                RawXmlElement::new("p:sldLayoutId")
                    .with_attr("id", (FIRST_MASTER_ID + 1).to_string())
                    .with_attr("r:id", layout_rel),
            ),
        )
        .with_child(
            RawXmlElement::new("p:txStyles")
                .with_child(RawXmlElement::new("p:titleStyle"))
                .with_child(RawXmlElement::new("p:bodyStyle"))
                .with_child(RawXmlElement::new("p:otherStyle")),
        )
        .to_xml_bytes()
}

/// "Title Only" layout
pub(crate) fn slide_layout() -> Result<Vec<u8>> {
    let mut tree = empty_shape_tree();
    tree.push_child(placeholder(2, "Title 1", "title", None, None));
    with_namespaces("p:sldLayout")
        .with_attr("type", "titleOnly")
        .with_attr("preserve", "1")
        .with_child(
            RawXmlElement::new("p:cSld")
                .with_attr("name", "Title Only")
                .with_child(tree),
        )
        .with_child(master_color_mapping())
        .to_xml_bytes()
}

/// Notes master with an empty shape tree
pub(crate) fn notes_master() -> Result<Vec<u8>> {
    with_namespaces("p:notesMaster")
        .with_child(RawXmlElement::new("p:cSld").with_child(empty_shape_tree()))
        .with_child(clr_map())
        .to_xml_bytes()
}

pub(crate) fn presentation_properties() -> Result<Vec<u8>> {
    with_namespaces("p:presentationPr").to_xml_bytes()
}

pub(crate) fn view_properties() -> Result<Vec<u8>> {
    with_namespaces("p:viewPr")
        .with_child(
            RawXmlElement::new("p:normalViewPr")
                .with_child(RawXmlElement::new("p:restoredLeft").with_attr("sz", "15620"))
                .with_child(RawXmlElement::new("p:restoredTop").with_attr("sz", "94660")),
        )
        .to_xml_bytes()
}

/// A notes slide without placeholders
pub(crate) fn notes_slide() -> RawXmlElement {
    with_namespaces("p:notes")
        .with_child(RawXmlElement::new("p:cSld").with_child(empty_shape_tree()))
        .with_child(master_color_mapping())
}

/// An empty slide following its master's colors
pub(crate) fn slide() -> RawXmlElement {
    with_namespaces("p:sld")
        .with_child(RawXmlElement::new("p:cSld").with_child(empty_shape_tree()))
        .with_child(master_color_mapping())
}
