//! Styles part (word/styles.xml)

use crate::error::Result;
use crate::xml::{self, RawXmlElement};

/// One style definition
#[derive(Clone, Debug, PartialEq)]
pub struct StyleInfo {
    pub id: String,
    /// `paragraph`, `character`, `table` or `numbering`
    pub kind: String,
    pub name: Option<String>,
    pub based_on: Option<String>,
}

/// Parsed styles part; the whole tree is kept so unknown content survives
#[derive(Clone, Debug)]
pub struct Styles {
    root: RawXmlElement,
}

impl Styles {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Styles {
            root: RawXmlElement::parse(data)?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }

    /// Style definitions in document order
    pub fn styles(&self) -> Vec<StyleInfo> {
        self.root
            .elements()
            .filter(|e| e.local_name() == "style")
            .map(|e| StyleInfo {
                id: e.attr("w:styleId").unwrap_or_default().to_string(),
                kind: e.attr("w:type").unwrap_or("paragraph").to_string(),
                name: e.child("name").and_then(|n| n.attr("w:val")).map(str::to_string),
                based_on: e.child("basedOn").and_then(|n| n.attr("w:val")).map(str::to_string),
            })
            .collect()
    }

    pub fn style(&self, id: &str) -> Option<StyleInfo> {
        self.styles().into_iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.root
            .elements()
            .any(|e| e.local_name() == "style" && e.attr("w:styleId") == Some(id))
    }

    /// Default styles for a new document
    pub(crate) fn default_styles() -> Self {
        let mut root = RawXmlElement::new("w:styles")
            .with_attr("xmlns:w", xml::W)
            .with_attr("xmlns:r", xml::R);

        root.push_child(
            RawXmlElement::new("w:docDefaults")
                .with_child(RawXmlElement::new("w:rPrDefault").with_child(
                    RawXmlElement::new("w:rPr")
                        .with_child(
                            RawXmlElement::new("w:rFonts")
                                .with_attr("w:ascii", "Calibri")
                                .with_attr("w:hAnsi", "Calibri")
                                .with_attr("w:eastAsia", "Calibri")
                                .with_attr("w:cs", "Times New Roman"),
                        )
                        .with_child(val("w:sz", "22"))
                        .with_child(val("w:szCs", "22"))
                        .with_child(val("w:lang", "en-US")),
                ))
                .with_child(RawXmlElement::new("w:pPrDefault").with_child(
                    RawXmlElement::new("w:pPr").with_child(
                        RawXmlElement::new("w:spacing")
                            .with_attr("w:after", "160")
                            .with_attr("w:line", "259")
                            .with_attr("w:lineRule", "auto"),
                    ),
                )),
        );

        root.push_child(
            style("paragraph", "Normal", "Normal", None)
                .with_attr("w:default", "1")
                .with_child(RawXmlElement::new("w:qFormat")),
        );
        for (level, size) in [(1u8, "32"), (2, "26"), (3, "24")] {
            root.push_child(heading(level, size));
        }
        root.push_child(
            style("character", "Hyperlink", "Hyperlink", None).with_child(
                RawXmlElement::new("w:rPr")
                    .with_child(val("w:color", "0563C1"))
                    .with_child(val("w:u", "single")),
            ),
        );
        root.push_child(
            style("table", "TableGrid", "Table Grid", Some("TableNormal"))
                .with_child(RawXmlElement::new("w:pPr").with_child(
                    RawXmlElement::new("w:spacing")
                        .with_attr("w:after", "0")
                        .with_attr("w:line", "240")
                        .with_attr("w:lineRule", "auto"),
                ))
                .with_child(RawXmlElement::new("w:tblPr").with_child(table_borders())),
        );
        root.push_child(
            style("table", "TableNormal", "Normal Table", None)
                .with_attr("w:default", "1")
                .with_child(RawXmlElement::new("w:semiHidden"))
                .with_child(RawXmlElement::new("w:tblPr").with_child(
                    RawXmlElement::new("w:tblInd")
                        .with_attr("w:w", "0")
                        .with_attr("w:type", "dxa"),
                )),
        );

        Styles { root }
    }
}

fn val(name: &str, value: &str) -> RawXmlElement {
    RawXmlElement::new(name).with_attr("w:val", value)
}

fn style(kind: &str, id: &str, name: &str, based_on: Option<&str>) -> RawXmlElement {
    let mut elem = RawXmlElement::new("w:style")
        .with_attr("w:type", kind)
        .with_attr("w:styleId", id)
        .with_child(val("w:name", name));
    if let Some(base) = based_on {
        elem.push_child(val("w:basedOn", base));
    }
    elem
}

fn heading(level: u8, size: &str) -> RawXmlElement {
    style("paragraph", &format!("Heading{}", level), &format!("heading {}", level), Some("Normal"))
        .with_child(val("w:next", "Normal"))
        .with_child(RawXmlElement::new("w:qFormat"))
        .with_child(
            RawXmlElement::new("w:pPr")
                .with_child(RawXmlElement::new("w:keepNext"))
                .with_child(
                    RawXmlElement::new("w:spacing")
                        .with_attr("w:before", "240")
                        .with_attr("w:after", "0"),
                )
                .with_child(val("w:outlineLvl", &(level - 1).to_string())),
        )
        .with_child(
            RawXmlElement::new("w:rPr")
                .with_child(val("w:color", "2F5496"))
                .with_child(val("w:sz", size)),
        )
}

fn table_borders() -> RawXmlElement {
    let mut borders = RawXmlElement::new("w:tblBorders");
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        borders.push_child(
            RawXmlElement::new(format!("w:{}", side))
                .with_attr("w:val", "single")
                .with_attr("w:sz", "4")
                .with_attr("w:space", "0")
                .with_attr("w:color", "auto"),
        );
    }
    borders
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_styles() {
        let styles = Styles::default_styles();
        let ids: Vec<String> = styles.styles().into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec!["Normal", "Heading1", "Heading2", "Heading3", "Hyperlink", "TableGrid", "TableNormal"]
        );
        let heading = styles.style("Heading2").unwrap();
        assert_eq!(heading.name.as_deref(), Some("heading 2"));
        assert_eq!(heading.based_on.as_deref(), Some("Normal"));
        assert_eq!(styles.style("Hyperlink").unwrap().kind, "character");
    }

    #[test]
    fn test_unknown_content_survives() {
        let data = br#"<w:styles xmlns:w="w"><w:latentStyles w:count="1"/><w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/><w:rsid w:val="00AB"/></w:style></w:styles>"#;
        let styles = Styles::from_bytes(data).unwrap();
        assert!(styles.contains("Quote"));
        let out = String::from_utf8(styles.to_bytes().unwrap()).unwrap();
        assert!(out.contains(r#"<w:latentStyles w:count="1"/>"#));
        assert!(out.contains(r#"<w:rsid w:val="00AB"/>"#));
    }
}
