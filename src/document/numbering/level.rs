//! Level definitions for numbering (w:lvl)

use crate::xml::RawXmlElement;

/// Number format of a level (w:numFmt)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NumberFormat {
    /// 1, 2, 3
    Decimal,
    /// 01, 02, 03
    DecimalZero,
    /// I, II, III
    UpperRoman,
    /// i, ii, iii
    LowerRoman,
    /// A, B, C
    UpperLetter,
    /// a, b, c
    LowerLetter,
    /// Bullet glyph from `lvlText`
    Bullet,
    /// No number
    None,
    /// Any other format, kept verbatim
    Other(String),
}

impl NumberFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "decimal" => NumberFormat::Decimal,
            "decimalZero" => NumberFormat::DecimalZero,
            "upperRoman" => NumberFormat::UpperRoman,
            "lowerRoman" => NumberFormat::LowerRoman,
            "upperLetter" => NumberFormat::UpperLetter,
            "lowerLetter" => NumberFormat::LowerLetter,
            "bullet" => NumberFormat::Bullet,
            "none" => NumberFormat::None,
            other => NumberFormat::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NumberFormat::Decimal => "decimal",
            NumberFormat::DecimalZero => "decimalZero",
            NumberFormat::UpperRoman => "upperRoman",
            NumberFormat::LowerRoman => "lowerRoman",
            NumberFormat::UpperLetter => "upperLetter",
            NumberFormat::LowerLetter => "lowerLetter",
            NumberFormat::Bullet => "bullet",
            NumberFormat::None => "none",
            NumberFormat::Other(s) => s,
        }
    }

    pub fn is_bullet(&self) -> bool {
        matches!(self, NumberFormat::Bullet)
    }
}

/// One level of an abstract numbering definition.
///
/// The element is kept whole; the accessors read the commonly used children.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    pub element: RawXmlElement,
}

impl Level {
    /// Build a level starting at 1, indented half an inch per level
    pub fn new(ilvl: u8, format: NumberFormat, text: &str) -> Self {
        let left = 720 * (u32::from(ilvl) + 1);
        let element = RawXmlElement::new("w:lvl")
            .with_attr("w:ilvl", ilvl.to_string())
            .with_child(RawXmlElement::new("w:start").with_attr("w:val", "1"))
            .with_child(RawXmlElement::new("w:numFmt").with_attr("w:val", format.as_str()))
            .with_child(RawXmlElement::new("w:lvlText").with_attr("w:val", text))
            .with_child(RawXmlElement::new("w:lvlJc").with_attr("w:val", "left"))
            .with_child(
                RawXmlElement::new("w:pPr").with_child(
                    RawXmlElement::new("w:ind")
                        .with_attr("w:left", left.to_string())
                        .with_attr("w:hanging", "360"),
                ),
            );
        Level { element }
    }

    /// Level index (0-8)
    pub fn ilvl(&self) -> u8 {
        self.element
            .attr("w:ilvl")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn val(&self, local: &str) -> Option<&str> {
        self.element.child(local)?.attr("w:val")
    }

    pub fn start(&self) -> Option<u32> {
        self.val("start")?.parse().ok()
    }

    pub fn format(&self) -> Option<NumberFormat> {
        self.val("numFmt").map(NumberFormat::parse)
    }

    /// Level text, e.g. `%1.` or a bullet glyph
    pub fn text(&self) -> Option<&str> {
        self.val("lvlText")
    }

    pub fn justification(&self) -> Option<&str> {
        self.val("lvlJc")
    }

    /// Left indentation in twips
    pub fn indent_left(&self) -> Option<i32> {
        let ind = self.element.descendant(&["pPr", "ind"])?;
        ind.attr("w:left").or_else(|| ind.attr("w:start"))?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_level() {
        let level = Level::new(2, NumberFormat::LowerRoman, "%3.");
        assert_eq!(level.ilvl(), 2);
        assert_eq!(level.start(), Some(1));
        assert_eq!(level.format(), Some(NumberFormat::LowerRoman));
        assert_eq!(level.text(), Some("%3."));
        assert_eq!(level.indent_left(), Some(2160));
    }

    #[test]
    fn test_unknown_format_kept() {
        assert_eq!(
            NumberFormat::parse("chineseCounting").as_str(),
            "chineseCounting"
        );
    }
}
