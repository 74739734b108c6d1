//! Shapes in a slide's shape tree

use crate::drawing::{self as dml, GraphicKind};
use crate::error::{Error, Result};
use crate::presentation::table::{SlideTable, SlideTableMut};
use crate::presentation::text::{check_rgb, solid_fill, srgb_of, TextBody};
use crate::xml::RawXmlElement;

/// Schema order of `p:sp` children
const SP_ORDER: &[&str] = &["nvSpPr", "spPr", "style", "txBody", "extLst"];

/// Schema order of `a:spPr` children
const SPPR_ORDER: &[&str] = &[
    "xfrm", "custGeom", "prstGeom", "noFill", "solidFill", "gradFill", "blipFill", "pattFill",
    "grpFill", "ln", "effectLst", "effectDag", "scene3d", "sp3d", "extLst",
];

const FILLS: &[&str] = &["noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill"];

/// Position and size of a new shape, in EMU
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Bounds {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Bounds { x, y, cx, cy }
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.x < 0 || self.y < 0 {
            return Err(Error::validation(
                "position",
                "offset cannot be negative",
                format!("{},{}", self.x, self.y),
            ));
        }
        dml::check_extent(self.cx, self.cy)
    }

    fn tuple(&self) -> (i64, i64, i64, i64) {
        (self.x, self.y, self.cx, self.cy)
    }
}

/// What a shape-tree entry is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    /// p:sp, including text boxes and placeholders
    Shape,
    /// p:pic
    Picture,
    /// p:graphicFrame
    Graphic(GraphicKind),
    /// p:grpSp
    Group,
    /// p:cxnSp
    Connector,
    /// Anything else (content parts, alternate content)
    Other,
}

/// An entry of a slide's shape tree.
///
/// The text body of a `p:sp` is held as a typed [`TextBody`]; the rest of the
/// element is kept as-is.
#[derive(Clone, Debug, PartialEq)]
pub struct SlideShape {
    elem: RawXmlElement,
    text: Option<TextBody>,
}

impl SlideShape {
    pub(crate) fn from_element(mut elem: RawXmlElement) -> Self {
        let mut text = None;
        if elem.local_name() == "sp" {
            text = elem.child("txBody").map(TextBody::from_element);
            elem.remove_children("txBody");
        }
        SlideShape { elem, text }
    }

    pub(crate) fn to_element(&self) -> RawXmlElement {
        let mut elem = self.elem.clone();
        if let Some(text) = &self.text {
            let tag = self.tag("txBody");
            elem.insert_child_ordered(text.to_element(&tag), SP_ORDER);
        }
        elem
    }

    /// Qualified name in the shape's own prefix
    fn tag(&self, local: &str) -> String {
        match self.elem.name.split_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self.elem.local_name() {
            "sp" => ShapeKind::Shape,
            "pic" => ShapeKind::Picture,
            "graphicFrame" => ShapeKind::Graphic(GraphicKind::from_uri(
                self.elem
                    .descendant(&["graphic", "graphicData"])
                    .and_then(|d| d.attr("uri"))
                    .unwrap_or(""),
            )),
            "grpSp" => ShapeKind::Group,
            "cxnSp" => ShapeKind::Connector,
            _ => ShapeKind::Other,
        }
    }

    /// The non-visual properties container (`p:nvSpPr`, `p:nvPicPr`, ...)
    fn non_visual(&self) -> Option<&RawXmlElement> {
        self.elem.elements().find(|e| e.local_name().starts_with("nv"))
    }

    fn c_nv_pr(&self) -> Option<&RawXmlElement> {
        self.non_visual()?.child("cNvPr")
    }

    /// Shape ID (`cNvPr id`), 0 when missing
    pub fn id(&self) -> u32 {
        self.c_nv_pr()
            .and_then(|c| c.attr("id"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        self.c_nv_pr().and_then(|c| c.attr("name")).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        if let Some(c) = self
            .elem
            .elements_mut()
            .find(|e| e.local_name().starts_with("nv"))
            .and_then(|nv| nv.child_mut("cNvPr"))
        {
            c.set_attr("name", name);
        }
    }

    /// Alt text (`cNvPr descr`)
    pub fn description(&self) -> Option<&str> {
        self.c_nv_pr()?.attr("descr")
    }

    /// Placeholder type; a `p:ph` without a type is an `obj` placeholder
    pub fn placeholder(&self) -> Option<&str> {
        let ph = self.non_visual()?.descendant(&["nvPr", "ph"])?;
        Some(ph.attr("type").unwrap_or("obj"))
    }

    /// Whether this is a text box (`cNvSpPr txBox="1"`)
    pub fn is_text_box(&self) -> bool {
        self.non_visual()
            .and_then(|nv| nv.child("cNvSpPr"))
            .and_then(|c| c.attr("txBox"))
            .map(crate::xml::parse_bool_str)
            .unwrap_or(false)
    }

    /// The shape properties element (`p:spPr`, or `p:grpSpPr` for groups)
    fn shape_properties(&self) -> Option<&RawXmlElement> {
        self.elem.child("spPr").or_else(|| self.elem.child("grpSpPr"))
    }

    fn shape_properties_mut(&mut self) -> Option<&mut RawXmlElement> {
        let local = if self.elem.child("grpSpPr").is_some() {
            "grpSpPr"
        } else {
            "spPr"
        };
        self.elem.child_mut(local)
    }

    fn xfrm(&self) -> Option<&RawXmlElement> {
        match self.elem.child("xfrm") {
            Some(x) => Some(x),
            None => self.shape_properties()?.child("xfrm"),
        }
    }

    fn xfrm_mut(&mut self) -> Option<&mut RawXmlElement> {
        if self.elem.child("xfrm").is_some() {
            return self.elem.child_mut("xfrm");
        }
        let sppr = self.shape_properties_mut()?;
        if sppr.child("xfrm").is_none() {
            sppr.insert_child_ordered(RawXmlElement::new("a:xfrm"), SPPR_ORDER);
        }
        sppr.child_mut("xfrm")
    }

    fn xfrm_pair(&self, child: &str, a: &str, b: &str) -> Option<(i64, i64)> {
        let e = self.xfrm()?.child(child)?;
        Some((e.attr(a)?.parse().ok()?, e.attr(b)?.parse().ok()?))
    }

    /// Offset (`x`, `y`) in EMU
    pub fn position(&self) -> Option<(i64, i64)> {
        self.xfrm_pair("off", "x", "y")
    }

    /// Extents (`cx`, `cy`) in EMU
    pub fn size(&self) -> Option<(i64, i64)> {
        self.xfrm_pair("ext", "cx", "cy")
    }

    fn set_xfrm_pair(&mut self, child: &str, a: (&str, i64), b: (&str, i64)) -> Result<()> {
        let xfrm = self
            .xfrm_mut()
            .ok_or_else(|| Error::InvalidValue("shape has no transform".into()))?;
        if xfrm.child(child).is_none() {
            let elem = RawXmlElement::new(format!("a:{}", child))
                .with_attr(a.0, "0")
                .with_attr(b.0, "0");
            if child == "off" {
                xfrm.children.insert(0, crate::xml::RawXmlNode::Element(elem));
                xfrm.self_closing = false;
            } else {
                xfrm.insert_child_ordered(elem, &["off", "ext", "chOff", "chExt"]);
            }
        }
        if let Some(e) = xfrm.child_mut(child) {
            e.set_attr(a.0, a.1.to_string());
            e.set_attr(b.0, b.1.to_string());
        }
        Ok(())
    }

    pub fn set_position(&mut self, x: i64, y: i64) -> Result<()> {
        if x < 0 || y < 0 {
            return Err(Error::validation("position", "offset cannot be negative", format!("{},{}", x, y)));
        }
        self.set_xfrm_pair("off", ("x", x), ("y", y))
    }

    pub fn set_size(&mut self, cx: i64, cy: i64) -> Result<()> {
        dml::check_extent(cx, cy)?;
        self.set_xfrm_pair("ext", ("cx", cx), ("cy", cy))
    }

    /// Preset geometry name, e.g. `rect`
    pub fn geometry(&self) -> Option<&str> {
        self.shape_properties()?.child("prstGeom")?.attr("prst")
    }

    /// Replace the geometry with a preset
    pub fn set_geometry(&mut self, preset: &str) -> Result<()> {
        check_preset(preset)?;
        let sppr = self
            .shape_properties_mut()
            .ok_or_else(|| Error::InvalidValue("shape has no geometry".into()))?;
        sppr.remove_children("custGeom");
        sppr.remove_children("prstGeom");
        sppr.insert_child_ordered(preset_geometry(preset), SPPR_ORDER);
        Ok(())
    }

    /// RGB of a solid fill
    pub fn fill_color(&self) -> Option<&str> {
        srgb_of(self.shape_properties()?.child("solidFill")?)
    }

    pub fn set_fill_color(&mut self, rgb: &str) -> Result<()> {
        let rgb = check_rgb("fill", rgb)?;
        let sppr = self
            .shape_properties_mut()
            .ok_or_else(|| Error::InvalidValue("shape has no fill".into()))?;
        for fill in FILLS {
            sppr.remove_children(fill);
        }
        sppr.insert_child_ordered(solid_fill("a:solidFill", &rgb), SPPR_ORDER);
        Ok(())
    }

    /// RGB of the outline's solid fill
    pub fn line_color(&self) -> Option<&str> {
        srgb_of(self.shape_properties()?.child("ln")?.child("solidFill")?)
    }

    pub fn set_line_color(&mut self, rgb: &str) -> Result<()> {
        let rgb = check_rgb("line", rgb)?;
        let sppr = self
            .shape_properties_mut()
            .ok_or_else(|| Error::InvalidValue("shape has no outline".into()))?;
        if sppr.child("ln").is_none() {
            sppr.insert_child_ordered(RawXmlElement::new("a:ln"), SPPR_ORDER);
        }
        if let Some(ln) = sppr.child_mut("ln") {
            for fill in FILLS {
                ln.remove_children(fill);
            }
            ln.children
                .insert(0, crate::xml::RawXmlNode::Element(solid_fill("a:solidFill", &rgb)));
            ln.self_closing = false;
        }
        Ok(())
    }

    pub fn text_body(&self) -> Option<&TextBody> {
        self.text.as_ref()
    }

    pub fn text_body_mut(&mut self) -> Option<&mut TextBody> {
        self.text.as_mut()
    }

    /// Text of the shape; empty for shapes without a text body
    pub fn text(&self) -> String {
        self.text.as_ref().map(TextBody::text).unwrap_or_default()
    }

    /// Replace the text, creating a text body on a shape that has none
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        if self.kind() != ShapeKind::Shape {
            return Err(Error::InvalidValue(format!("a {:?} shape cannot hold text", self.kind())));
        }
        self.text.get_or_insert_with(TextBody::default).set_text(text);
        Ok(())
    }

    fn table_element(&self) -> Option<&RawXmlElement> {
        self.elem.descendant(&["graphic", "graphicData", "tbl"])
    }

    /// The table inside a table graphic frame
    pub fn table(&self) -> Option<SlideTable<'_>> {
        self.table_element().map(SlideTable::new)
    }

    pub fn table_mut(&mut self) -> Option<SlideTableMut<'_>> {
        self.elem
            .descendant_mut(&["graphic", "graphicData", "tbl"])
            .map(SlideTableMut::new)
    }

    /// Relationship IDs the shape references (`r:embed`, `r:id`, ...)
    pub(crate) fn rel_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_rel_ids(&self.elem, &mut out);
        out
    }

    /// Largest `cNvPr id` in this entry and its children
    pub(crate) fn max_id(&self) -> u32 {
        let mut found = Vec::new();
        self.elem.find_all("cNvPr", &mut found);
        found
            .iter()
            .filter_map(|c| c.attr("id")?.parse().ok())
            .max()
            .unwrap_or(0)
    }
}

pub(crate) fn collect_rel_ids(elem: &RawXmlElement, out: &mut Vec<String>) {
    for (key, value) in &elem.attributes {
        if let Some(("r", _)) = key.split_once(':') {
            out.push(value.clone());
        }
    }
    for child in elem.elements() {
        collect_rel_ids(child, out);
    }
}

pub(crate) fn check_preset(preset: &str) -> Result<()> {
    if preset.is_empty() || !preset.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::validation("preset", "invalid preset geometry", preset));
    }
    Ok(())
}

fn preset_geometry(preset: &str) -> RawXmlElement {
    RawXmlElement::new("a:prstGeom")
        .with_attr("prst", preset)
        .with_child(RawXmlElement::new("a:avLst"))
}

fn xfrm(bounds: &Bounds) -> RawXmlElement {
    RawXmlElement::new("a:xfrm")
        .with_child(
            RawXmlElement::new("a:off")
                .with_attr("x", bounds.x.to_string())
                .with_attr("y", bounds.y.to_string()),
        )
        .with_child(
            RawXmlElement::new("a:ext")
                .with_attr("cx", bounds.cx.to_string())
                .with_attr("cy", bounds.cy.to_string()),
        )
}

/// A `p:sp` with preset geometry; `text_box` marks it `txBox="1"` and gives it a text body
pub(crate) fn new_shape(id: u32, name: &str, preset: &str, bounds: &Bounds, text_box: bool) -> SlideShape {
    let mut c_nv_sp_pr = RawXmlElement::new("p:cNvSpPr");
    if text_box {
        c_nv_sp_pr.set_attr("txBox", "1");
    }
    let elem = RawXmlElement::new("p:sp")
        .with_child(
            RawXmlElement::new("p:nvSpPr")
                .with_child(
                    RawXmlElement::new("p:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", name),
                )
                .with_child(c_nv_sp_pr)
                .with_child(RawXmlElement::new("p:nvPr")),
        )
        .with_child(
            RawXmlElement::new("p:spPr")
                .with_child(xfrm(bounds))
                .with_child(preset_geometry(preset)),
        );
    let text = if text_box {
        let mut body = TextBody::default();
        body.body_properties = RawXmlElement::new("a:bodyPr")
            .with_attr("wrap", "square")
            .with_attr("rtlCol", "0");
        Some(body)
    } else {
        None
    };
    SlideShape { elem, text }
}

/// A `p:pic` at `bounds`
pub(crate) fn new_picture(id: u32, name: &str, embed: &str, bounds: &Bounds) -> SlideShape {
    let mut elem = dml::picture("p", id, name, embed, bounds.cx, bounds.cy);
    if let Some(off) = elem.descendant_mut(&["spPr", "xfrm", "off"]) {
        off.set_attr("x", bounds.x.to_string());
        off.set_attr("y", bounds.y.to_string());
    }
    if let Some(nv) = elem.child_mut("nvPicPr") {
        nv.push_child(RawXmlElement::new("p:nvPr"));
    }
    SlideShape { elem, text: None }
}

/// A `p:graphicFrame` wrapping `graphic`
pub(crate) fn new_graphic_frame(id: u32, name: &str, graphic: RawXmlElement, bounds: &Bounds) -> SlideShape {
    SlideShape {
        elem: dml::graphic_frame("p", id, name, graphic, bounds.tuple()),
        text: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::table::new_table;
    use pretty_assertions::assert_eq;

    fn shape(xml: &str) -> SlideShape {
        SlideShape::from_element(RawXmlElement::parse(xml.as_bytes()).unwrap())
    }

    #[test]
    fn test_loaded_shape_properties() {
        let sp = shape(
            r#"<p:sp xmlns:p="p" xmlns:a="a"><p:nvSpPr><p:cNvPr id="4" name="Title 3"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
            <p:spPr><a:xfrm><a:off x="10" y="20"/><a:ext cx="300" cy="400"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="00FF00"/></a:solidFill></p:spPr>
            <p:txBody><a:bodyPr/><a:p><a:r><a:t>Agenda</a:t></a:r></a:p></p:txBody></p:sp>"#,
        );
        assert_eq!(sp.kind(), ShapeKind::Shape);
        assert_eq!(sp.id(), 4);
        assert_eq!(sp.name(), "Title 3");
        assert_eq!(sp.placeholder(), Some("title"));
        assert_eq!(sp.position(), Some((10, 20)));
        assert_eq!(sp.size(), Some((300, 400)));
        assert_eq!(sp.geometry(), Some("rect"));
        assert_eq!(sp.fill_color(), Some("00FF00"));
        assert_eq!(sp.text(), "Agenda");
    }

    #[test]
    fn test_text_body_written_in_schema_order() {
        let mut sp = shape(
            r#"<p:sp xmlns:p="p" xmlns:a="a"><p:nvSpPr><p:cNvPr id="2" name="x"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:extLst/></p:sp>"#,
        );
        sp.set_text("hello").unwrap();
        let elem = sp.to_element();
        let names: Vec<&str> = elem.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["nvSpPr", "spPr", "txBody", "extLst"]);
    }

    #[test]
    fn test_new_text_box_and_edits() {
        let mut sp = new_shape(5, "TextBox 4", "rect", &Bounds::new(1, 2, 3, 4), true);
        assert!(sp.is_text_box());
        assert_eq!(sp.text(), "");
        sp.set_position(100, 200).unwrap();
        sp.set_size(300, 400).unwrap();
        sp.set_geometry("ellipse").unwrap();
        sp.set_fill_color("#abcdef").unwrap();
        sp.set_line_color("000000").unwrap();
        assert_eq!(sp.position(), Some((100, 200)));
        assert_eq!(sp.size(), Some((300, 400)));
        assert_eq!(sp.geometry(), Some("ellipse"));
        assert_eq!(sp.fill_color(), Some("ABCDEF"));
        assert_eq!(sp.line_color(), Some("000000"));
        assert!(sp.set_size(0, 1).is_err());
        assert!(sp.set_geometry("not a preset").is_err());

        let sppr = sp.to_element();
        let names: Vec<&str> = sppr.child("spPr").unwrap().elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["xfrm", "prstGeom", "solidFill", "ln"]);
    }

    #[test]
    fn test_picture_and_table_frames() {
        let pic = new_picture(3, "Picture 2", "rId2", &Bounds::new(5, 6, 7, 8));
        assert_eq!(pic.kind(), ShapeKind::Picture);
        assert_eq!(pic.position(), Some((5, 6)));
        assert_eq!(pic.rel_ids(), vec!["rId2".to_string()]);
        let mut pic = pic;
        assert!(pic.set_text("no").is_err());

        let tbl = new_table(2, 2, 200, 100).unwrap();
        let mut frame = new_graphic_frame(
            4,
            "Table 3",
            dml::graphic(dml::uri::TABLE, tbl),
            &Bounds::new(0, 0, 200, 100),
        );
        assert_eq!(frame.kind(), ShapeKind::Graphic(GraphicKind::Table));
        assert_eq!(frame.position(), Some((0, 0)));
        frame.table_mut().unwrap().set_cell_text(1, 1, "x").unwrap();
        assert_eq!(frame.table().unwrap().cell(1, 1).unwrap().text(), "x");
        assert_eq!(frame.max_id(), 4);
    }
}
