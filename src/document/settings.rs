//! Settings part (word/settings.xml)

use crate::error::Result;
use crate::xml::{self, RawXmlElement};

/// Schema order of the settings children this crate inserts, with their neighbours
const SETTINGS_ORDER: &[&str] = &[
    "writeProtection", "view", "zoom", "removePersonalInformation", "removeDateAndTime",
    "doNotDisplayPageBoundaries", "displayBackgroundShape", "printPostScriptOverText",
    "printFractionalCharacterWidth", "printFormsData", "embedTrueTypeFonts", "embedSystemFonts",
    "saveSubsetFonts", "saveFormsData", "mirrorMargins", "alignBordersAndEdges",
    "bordersDoNotSurroundHeader", "bordersDoNotSurroundFooter", "gutterAtTop",
    "hideSpellingErrors", "hideGrammaticalErrors", "activeWritingStyle", "proofState",
    "formsDesign", "attachedTemplate", "linkStyles", "stylePaneFormatFilter",
    "stylePaneSortMethod", "documentType", "mailMerge", "revisionView", "trackRevisions",
    "doNotTrackMoves", "doNotTrackFormatting", "documentProtection", "autoFormatOverride",
    "styleLockTheme", "styleLockQFSet", "defaultTabStop", "autoHyphenation",
    "consecutiveHyphenLimit", "hyphenationZone", "doNotHyphenateCaps", "showEnvelope",
    "summaryLength", "clickAndTypeStyle", "defaultTableStyle", "evenAndOddHeaders",
];

/// Document settings, kept as a tree with typed access to a few switches
#[derive(Clone, Debug)]
pub struct Settings {
    root: RawXmlElement,
}

impl Default for Settings {
    fn default() -> Self {
        let root = RawXmlElement::new("w:settings")
            .with_attr("xmlns:w", xml::W)
            .with_attr("xmlns:r", xml::R)
            .with_child(RawXmlElement::new("w:zoom").with_attr("w:percent", "100"))
            .with_child(RawXmlElement::new("w:defaultTabStop").with_attr("w:val", "720"))
            .with_child(
                RawXmlElement::new("w:characterSpacingControl").with_attr("w:val", "doNotCompress"),
            )
            .with_child(
                RawXmlElement::new("w:compat").with_child(
                    RawXmlElement::new("w:compatSetting")
                        .with_attr("w:name", "compatibilityMode")
                        .with_attr("w:uri", "http://schemas.microsoft.com/office/word")
                        .with_attr("w:val", "15"),
                ),
            );
        Settings { root }
    }
}

impl Settings {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Settings {
            root: RawXmlElement::parse(data)?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_xml_bytes()
    }

    fn flag(&self, local: &str) -> bool {
        self.root
            .child(local)
            .map_or(false, |e| e.attr("w:val").map_or(true, xml::parse_bool_str))
    }

    fn set_flag(&mut self, local: &str, on: bool) {
        self.root.remove_children(local);
        if on {
            self.root
                .insert_child_ordered(RawXmlElement::new(format!("w:{}", local)), SETTINGS_ORDER);
        }
    }

    /// Whether edits are recorded as tracked changes
    pub fn track_revisions(&self) -> bool {
        self.flag("trackRevisions")
    }

    pub fn set_track_revisions(&mut self, on: bool) {
        self.set_flag("trackRevisions", on);
    }

    /// Whether even pages use their own headers and footers
    pub fn even_and_odd_headers(&self) -> bool {
        self.flag("evenAndOddHeaders")
    }

    pub fn set_even_and_odd_headers(&mut self, on: bool) {
        self.set_flag("evenAndOddHeaders", on);
    }
}
