//! DrawingML payloads shared by documents, workbooks and presentations
//!
//! Builds the chart, diagram and picture parts a new graphic needs, and the
//! `a:graphic` envelopes that point at them.

use crate::error::{Error, Result};
use crate::opc::content_types;
use crate::xml::{self, RawXmlElement};

/// English Metric Units per inch
pub const EMU_PER_INCH: i64 = 914_400;

/// `graphicData` URIs
pub mod uri {
    pub const PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
    pub const CHART: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
    pub const DIAGRAM: &str = "http://schemas.openxmlformats.org/drawingml/2006/diagram";
    pub const TABLE: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";
}

/// What a graphic frame holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphicKind {
    Picture,
    Chart,
    Diagram,
    Table,
    Other,
}

impl GraphicKind {
    /// Classify a `graphicData` URI
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            uri::PICTURE => GraphicKind::Picture,
            uri::CHART => GraphicKind::Chart,
            uri::DIAGRAM => GraphicKind::Diagram,
            uri::TABLE => GraphicKind::Table,
            _ => GraphicKind::Other,
        }
    }
}

/// Reject non-positive extents
pub fn check_extent(cx: i64, cy: i64) -> Result<()> {
    if cx <= 0 {
        return Err(Error::validation("cx", "width must be positive", cx.to_string()));
    }
    if cy <= 0 {
        return Err(Error::validation("cy", "height must be positive", cy.to_string()));
    }
    Ok(())
}

/// Content type and normalized extension for an image
pub fn image_type(ext: &str) -> Result<(&'static str, String)> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    let content_type = content_types::for_image_extension(&ext)
        .ok_or_else(|| Error::InvalidValue(format!("unsupported image extension '{}'", ext)))?;
    Ok((content_type, ext))
}

/// `<a:graphic><a:graphicData uri=..>child</a:graphicData></a:graphic>`
pub fn graphic(data_uri: &str, child: RawXmlElement) -> RawXmlElement {
    RawXmlElement::new("a:graphic").with_attr("xmlns:a", xml::A).with_child(
        RawXmlElement::new("a:graphicData")
            .with_attr("uri", data_uri)
            .with_child(child),
    )
}

fn xfrm(prefix: &str, cx: i64, cy: i64) -> RawXmlElement {
    RawXmlElement::new(format!("{}:xfrm", prefix))
        .with_child(RawXmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
        .with_child(
            RawXmlElement::new("a:ext")
                .with_attr("cx", cx.to_string())
                .with_attr("cy", cy.to_string()),
        )
}

/// A picture element; `prefix` is `pic` inside word drawings, `xdr` or `p` elsewhere
pub fn picture(prefix: &str, id: u32, name: &str, embed: &str, cx: i64, cy: i64) -> RawXmlElement {
    let tag = |local: &str| format!("{}:{}", prefix, local);
    let mut pic = RawXmlElement::new(tag("pic"));
    if prefix == "pic" {
        pic.set_attr("xmlns:pic", xml::PIC);
    }
    pic.with_child(
        RawXmlElement::new(tag("nvPicPr"))
            .with_child(
                RawXmlElement::new(tag("cNvPr"))
                    .with_attr("id", id.to_string())
                    .with_attr("name", name),
            )
            .with_child(RawXmlElement::new(tag("cNvPicPr"))),
    )
    .with_child(
        RawXmlElement::new(tag("blipFill"))
            .with_child(RawXmlElement::new("a:blip").with_attr("r:embed", embed))
            .with_child(RawXmlElement::new("a:stretch").with_child(RawXmlElement::new("a:fillRect"))),
    )
    .with_child(
        RawXmlElement::new(tag("spPr"))
            .with_child(xfrm("a", cx, cy))
            .with_child(
                RawXmlElement::new("a:prstGeom")
                    .with_attr("prst", "rect")
                    .with_child(RawXmlElement::new("a:avLst")),
            ),
    )
}

/// `c:chart` reference to a chart part
pub fn chart_reference(rel_id: &str) -> RawXmlElement {
    RawXmlElement::new("c:chart")
        .with_attr("xmlns:c", xml::C)
        .with_attr("xmlns:r", xml::R)
        .with_attr("r:id", rel_id)
}

/// Relationship IDs of the four diagram parts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagramRelIds {
    pub data: String,
    pub layout: String,
    pub style: String,
    pub colors: String,
}

/// `dgm:relIds` reference to the diagram parts
pub fn diagram_reference(ids: &DiagramRelIds) -> RawXmlElement {
    RawXmlElement::new("dgm:relIds")
        .with_attr("xmlns:dgm", xml::DGM)
        .with_attr("xmlns:r", xml::R)
        .with_attr("r:dm", ids.data.as_str())
        .with_attr("r:lo", ids.layout.as_str())
        .with_attr("r:qs", ids.style.as_str())
        .with_attr("r:cs", ids.colors.as_str())
}

/// A graphic frame for spreadsheet and slide shape trees
pub fn graphic_frame(prefix: &str, id: u32, name: &str, graphic: RawXmlElement, pos: (i64, i64, i64, i64)) -> RawXmlElement {
    let tag = |local: &str| format!("{}:{}", prefix, local);
    let (x, y, cx, cy) = pos;
    let mut frame = RawXmlElement::new(tag("graphicFrame"));
    if prefix == "xdr" {
        frame.set_attr("macro", "");
    }
    let mut nv = RawXmlElement::new(tag("nvGraphicFramePr"))
        .with_child(
            RawXmlElement::new(tag("cNvPr"))
                .with_attr("id", id.to_string())
                .with_attr("name", name),
        )
        .with_child(RawXmlElement::new(tag("cNvGraphicFramePr")));
    if prefix == "p" {
        nv.push_child(RawXmlElement::new("p:nvPr"));
    }
    frame
        .with_child(nv)
        .with_child(
            RawXmlElement::new(tag("xfrm"))
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
        )
        .with_child(graphic)
}

/// A minimal clustered bar chart part titled `title`
pub fn chart_part(title: &str) -> Result<Vec<u8>> {
    let title_elem = RawXmlElement::new("c:title")
        .with_child(
            RawXmlElement::new("c:tx").with_child(
                RawXmlElement::new("c:rich")
                    .with_child(RawXmlElement::new("a:bodyPr"))
                    .with_child(
                        RawXmlElement::new("a:p").with_child(
                            RawXmlElement::new("a:r")
                                .with_child(RawXmlElement::new("a:t").with_text(title)),
                        ),
                    ),
            ),
        )
        .with_child(RawXmlElement::new("c:overlay").with_attr("val", "0"));

    let series = RawXmlElement::new("c:ser")
        .with_child(RawXmlElement::new("c:idx").with_attr("val", "0"))
        .with_child(RawXmlElement::new("c:order").with_attr("val", "0"))
        .with_child(
            RawXmlElement::new("c:val").with_child(
                RawXmlElement::new("c:numLit")
                    .with_child(RawXmlElement::new("c:ptCount").with_attr("val", "1"))
                    .with_child(
                        RawXmlElement::new("c:pt")
                            .with_attr("idx", "0")
                            .with_child(RawXmlElement::new("c:v").with_text("1")),
                    ),
            ),
        );

    let bar = RawXmlElement::new("c:barChart")
        .with_child(RawXmlElement::new("c:barDir").with_attr("val", "col"))
        .with_child(RawXmlElement::new("c:grouping").with_attr("val", "clustered"))
        .with_child(series)
        .with_child(RawXmlElement::new("c:axId").with_attr("val", "1"))
        .with_child(RawXmlElement::new("c:axId").with_attr("val", "2"));

    let axis = |name: &str, id: &str, cross: &str, pos: &str| {
        RawXmlElement::new(name)
            .with_child(RawXmlElement::new("c:axId").with_attr("val", id))
            .with_child(
                RawXmlElement::new("c:scaling")
                    .with_child(RawXmlElement::new("c:orientation").with_attr("val", "minMax")),
            )
            .with_child(RawXmlElement::new("c:axPos").with_attr("val", pos))
            .with_child(RawXmlElement::new("c:crossAx").with_attr("val", cross))
    };

    let space = RawXmlElement::new("c:chartSpace")
        .with_attr("xmlns:c", xml::C)
        .with_attr("xmlns:a", xml::A)
        .with_attr("xmlns:r", xml::R)
        .with_child(
            RawXmlElement::new("c:chart")
                .with_child(title_elem)
                .with_child(RawXmlElement::new("c:autoTitleDeleted").with_attr("val", "0"))
                .with_child(
                    RawXmlElement::new("c:plotArea")
                        .with_child(RawXmlElement::new("c:layout"))
                        .with_child(bar)
                        .with_child(axis("c:catAx", "1", "2", "b"))
                        .with_child(axis("c:valAx", "2", "1", "l")),
                )
                .with_child(
                    RawXmlElement::new("c:legend")
                        .with_child(RawXmlElement::new("c:legendPos").with_attr("val", "r")),
                )
                .with_child(RawXmlElement::new("c:plotVisOnly").with_attr("val", "1")),
        );
    space.to_xml_bytes()
}

/// Payloads of the four parts behind a diagram
pub struct DiagramParts {
    pub data: Vec<u8>,
    pub layout: Vec<u8>,
    pub style: Vec<u8>,
    pub colors: Vec<u8>,
}

/// A one-node diagram
pub fn diagram_parts() -> Result<DiagramParts> {
    const DOC: &str = "{00000000-0000-0000-0000-000000000001}";
    const NODE: &str = "{00000000-0000-0000-0000-000000000002}";

    let root = |local: &str| {
        RawXmlElement::new(format!("dgm:{}", local))
            .with_attr("xmlns:dgm", xml::DGM)
            .with_attr("xmlns:a", xml::A)
    };
    let point = |id: &str, kind: &str| {
        RawXmlElement::new("dgm:pt")
            .with_attr("modelId", id)
            .with_attr("type", kind)
            .with_child(RawXmlElement::new("dgm:prSet"))
    };

    let data = root("dataModel")
        .with_child(
            RawXmlElement::new("dgm:ptLst")
                .with_child(point(DOC, "doc"))
                .with_child(
                    point(NODE, "node").with_child(
                        RawXmlElement::new("dgm:t")
                            .with_child(RawXmlElement::new("a:bodyPr"))
                            .with_child(
                                RawXmlElement::new("a:p").with_child(
                                    RawXmlElement::new("a:r")
                                        .with_child(RawXmlElement::new("a:t").with_text("Diagram")),
                                ),
                            ),
                    ),
                ),
        )
        .with_child(
            RawXmlElement::new("dgm:cxnLst").with_child(
                RawXmlElement::new("dgm:cxn")
                    .with_attr("modelId", "{00000000-0000-0000-0000-000000000003}")
                    .with_attr("type", "parOf")
                    .with_attr("srcId", DOC)
                    .with_attr("destId", NODE)
                    .with_attr("srcOrd", "0")
                    .with_attr("destOrd", "0"),
            ),
        );

    Ok(DiagramParts {
        data: data.to_xml_bytes()?,
        layout: root("layoutDef")
            .with_attr("uniqueId", "urn:microsoft.com/office/officeart/2005/8/layout/default")
            .to_xml_bytes()?,
        style: root("styleDef")
            .with_attr("uniqueId", "urn:microsoft.com/office/officeart/2005/8/quickstyle/simple1")
            .to_xml_bytes()?,
        colors: root("colorsDef")
            .with_attr("uniqueId", "urn:microsoft.com/office/officeart/2005/8/colors/accent1_2")
            .to_xml_bytes()?,
    })
}

/// A minimal Office theme with color, font and format schemes
pub fn theme_part(name: &str) -> Result<Vec<u8>> {
    let tag = |local: &str| format!("a:{}", local);
    let srgb = |name: &str, rgb: &str| {
        RawXmlElement::new(tag(name)).with_child(RawXmlElement::new("a:srgbClr").with_attr("val", rgb))
    };
    let sys = |name: &str, val: &str, last: &str| {
        RawXmlElement::new(tag(name)).with_child(
            RawXmlElement::new("a:sysClr")
                .with_attr("val", val)
                .with_attr("lastClr", last),
        )
    };
    let colors = RawXmlElement::new("a:clrScheme")
        .with_attr("name", "Office")
        .with_child(sys("dk1", "windowText", "000000"))
        .with_child(sys("lt1", "window", "FFFFFF"))
        .with_child(srgb("dk2", "0E2841"))
        .with_child(srgb("lt2", "E8E8E8"))
        .with_child(srgb("accent1", "156082"))
        .with_child(srgb("accent2", "E97132"))
        .with_child(srgb("accent3", "196B24"))
        .with_child(srgb("accent4", "0F9ED5"))
        .with_child(srgb("accent5", "A02B93"))
        .with_child(srgb("accent6", "4EA72E"))
        .with_child(srgb("hlink", "467886"))
        .with_child(srgb("folHlink", "96607D"));

    let font_set = |name: &str, latin: &str| {
        RawXmlElement::new(tag(name))
            .with_child(RawXmlElement::new("a:latin").with_attr("typeface", latin))
            .with_child(RawXmlElement::new("a:ea").with_attr("typeface", ""))
            .with_child(RawXmlElement::new("a:cs").with_attr("typeface", ""))
    };
    let fonts = RawXmlElement::new("a:fontScheme")
        .with_attr("name", "Office")
        .with_child(font_set("majorFont", "Calibri Light"))
        .with_child(font_set("minorFont", "Calibri"));

    let solid = || {
        RawXmlElement::new("a:solidFill")
            .with_child(RawXmlElement::new("a:schemeClr").with_attr("val", "phClr"))
    };
    let three = |name: &str, item: &dyn Fn() -> RawXmlElement| {
        let mut list = RawXmlElement::new(tag(name));
        for _ in 0..3 {
            list.push_child(item());
        }
        list
    };
    let line = || {
        RawXmlElement::new("a:ln")
            .with_attr("w", "6350")
            .with_child(solid())
    };
    let effect = || RawXmlElement::new("a:effectStyle").with_child(RawXmlElement::new("a:effectLst"));
    let formats = RawXmlElement::new("a:fmtScheme")
        .with_attr("name", "Office")
        .with_child(three("fillStyleLst", &solid))
        .with_child(three("lnStyleLst", &line))
        .with_child(three("effectStyleLst", &effect))
        .with_child(three("bgFillStyleLst", &solid));

    RawXmlElement::new("a:theme")
        .with_attr("xmlns:a", xml::A)
        .with_attr("name", name)
        .with_child(
            RawXmlElement::new("a:themeElements")
                .with_child(colors)
                .with_child(fonts)
                .with_child(formats),
        )
        .with_child(RawXmlElement::new("a:objectDefaults"))
        .with_child(RawXmlElement::new("a:extraClrSchemeLst"))
        .to_xml_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_graphic_kind_from_uri() {
        assert_eq!(GraphicKind::from_uri(uri::CHART), GraphicKind::Chart);
        assert_eq!(GraphicKind::from_uri("urn:x"), GraphicKind::Other);
    }

    #[test]
    fn test_check_extent() {
        assert!(check_extent(1, 1).is_ok());
        assert_eq!(check_extent(0, 5).unwrap_err().code(), "validation");
        assert_eq!(check_extent(5, -1).unwrap_err().code(), "validation");
    }

    #[test]
    fn test_image_type() {
        assert_eq!(image_type(".PNG").unwrap(), (content_types::PNG, "png".to_string()));
        assert_eq!(image_type("webp").unwrap_err().code(), "invalid-value");
    }

    #[test]
    fn test_chart_part_has_title() {
        let data = chart_part("Sales").unwrap();
        let root = RawXmlElement::parse(&data).unwrap();
        assert_eq!(root.local_name(), "chartSpace");
        assert_eq!(root.descendant(&["chart", "title"]).unwrap().text(), "Sales");
    }

    #[test]
    fn test_diagram_parts_parse() {
        let parts = diagram_parts().unwrap();
        for payload in [&parts.data, &parts.layout, &parts.style, &parts.colors] {
            assert!(RawXmlElement::parse(payload).is_ok());
        }
        let data = RawXmlElement::parse(&parts.data).unwrap();
        assert_eq!(data.text(), "Diagram");
    }

    #[test]
    fn test_theme_part_schemes() {
        let theme = RawXmlElement::parse(&theme_part("Office Theme").unwrap()).unwrap();
        assert_eq!(theme.attr("name"), Some("Office Theme"));
        let fmt = theme.descendant(&["themeElements", "fmtScheme"]).unwrap();
        for list in fmt.elements() {
            assert_eq!(list.elements().count(), 3, "{}", list.name);
        }
        let accent = theme
            .descendant(&["themeElements", "clrScheme", "accent1", "srgbClr"])
            .unwrap();
        assert_eq!(accent.attr("val"), Some("156082"));
    }

    #[test]
    fn test_picture_envelope() {
        let pic = picture("pic", 0, "Picture 1", "rId5", 100, 200);
        let blip = pic.descendant(&["blipFill", "blip"]).unwrap();
        assert_eq!(blip.attr("r:embed"), Some("rId5"));
        let ext = pic.descendant(&["spPr", "xfrm", "ext"]).unwrap();
        assert_eq!(ext.attr("cy"), Some("200"));
    }
}
