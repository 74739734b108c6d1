//! Part URI handling for OPC packages

use crate::error::{Error, Result};
use std::fmt;

/// Represents a URI to a part within an OPC package.
///
/// Part URIs are package-rooted forward-slash paths stored without a leading '/'.
/// Example: `word/document.xml`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartUri {
    path: String,
}

impl PartUri {
    /// Create a new PartUri from a string.
    ///
    /// The path is normalized: a leading '/' is stripped, `.` segments and empty
    /// segments are collapsed and `..` is applied. A `..` escaping the root fails.
    pub fn new(path: &str) -> Result<Self> {
        let normalized = normalize(path)?;
        if normalized.is_empty() {
            return Err(Error::InvalidReference(format!(
                "invalid part URI '{}': empty path",
                path
            )));
        }
        Ok(Self { path: normalized })
    }

    /// Create PartUri without validation (for internal use)
    pub(crate) fn from_string_unchecked(path: String) -> Self {
        Self { path }
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Part name as written in `[Content_Types].xml` (with leading '/')
    pub fn part_name(&self) -> String {
        format!("/{}", self.path)
    }

    /// Get the file name portion
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        let pos = name.rfind('.')?;
        let ext = &name[pos + 1..];
        (!ext.is_empty()).then_some(ext)
    }

    /// Directory portion ("" for root-level parts)
    pub fn directory(&self) -> &str {
        dirname(&self.path)
    }

    /// Get the relationships URI for this part.
    ///
    /// For `word/document.xml`, returns `word/_rels/document.xml.rels`
    pub fn relationships_uri(&self) -> PartUri {
        PartUri {
            path: rels_path_for(&self.path),
        }
    }

    /// Resolve a relationship target against this part.
    ///
    /// For `word/document.xml` and `../media/image1.png`, returns `media/image1.png`
    pub fn resolve(&self, relative: &str) -> Result<PartUri> {
        PartUri::new(&resolve_target(&self.path, relative)?)
    }

    /// Check if this URI points to a relationships file
    pub fn is_relationships(&self) -> bool {
        is_rels_path(&self.path)
    }
}

impl fmt::Display for PartUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl std::str::FromStr for PartUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PartUri::new(s)
    }
}

impl AsRef<str> for PartUri {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

/// Normalize a package path (may yield "" for the root)
pub fn normalize(path: &str) -> Result<String> {
    let path = path.trim().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::InvalidReference(format!(
                        "invalid part URI '{}': escapes package root",
                        path
                    )));
                }
            }
            s => parts.push(s),
        }
    }

    Ok(parts.join("/"))
}

/// Directory of a package path ("" at root)
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Resolve a wire target relative to a source part ("" = package root)
pub fn resolve_target(source: &str, target: &str) -> Result<String> {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let base = dirname(source);
    if base.is_empty() {
        normalize(target)
    } else {
        normalize(&format!("{}/{}", base, target))
    }
}

/// Express a package-rooted target relative to the source part's directory
pub fn relative_target(source: &str, target: &str) -> String {
    let base: Vec<&str> = dirname(source).split('/').filter(|s| !s.is_empty()).collect();
    let dest: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();

    let common = base
        .iter()
        .zip(dest.iter())
        .take(dest.len().saturating_sub(1))
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat("..").take(base.len() - common));
    parts.extend(&dest[common..]);
    parts.join("/")
}

/// Path of the `.rels` sidecar for a source ("" = package)
pub fn rels_path_for(source: &str) -> String {
    if source.is_empty() {
        return "_rels/.rels".to_string();
    }
    let dir = dirname(source);
    let name = source.rsplit('/').next().unwrap_or(source);
    if dir.is_empty() {
        format!("_rels/{}.rels", name)
    } else {
        format!("{}/_rels/{}.rels", dir, name)
    }
}

/// Whether a package path names a relationships part
pub fn is_rels_path(path: &str) -> bool {
    let dir = dirname(path);
    (dir == "_rels" || dir.ends_with("/_rels")) && path.ends_with(".rels")
}

/// Infer the source part of a `.rels` path: `_rels/.rels` is the package ("")
pub fn source_of_rels(path: &str) -> Option<String> {
    if !is_rels_path(path) {
        return None;
    }
    let dir = dirname(path);
    let name = path.rsplit('/').next()?.strip_suffix(".rels")?;
    let parent = dir.strip_suffix("_rels")?.trim_end_matches('/');
    if name.is_empty() {
        return parent.is_empty().then(String::new);
    }
    if parent.is_empty() {
        Some(name.to_string())
    } else {
        Some(format!("{}/{}", parent, name))
    }
}

/// Well-known part URIs
pub mod well_known {
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const PACKAGE_RELS: &str = "_rels/.rels";
    pub const CORE_PROPS: &str = "docProps/core.xml";
    pub const APP_PROPS: &str = "docProps/app.xml";
    pub const DOCUMENT: &str = "word/document.xml";
    pub const WORD_STYLES: &str = "word/styles.xml";
    pub const WORD_SETTINGS: &str = "word/settings.xml";
    pub const WORD_NUMBERING: &str = "word/numbering.xml";
    pub const WORD_COMMENTS: &str = "word/comments.xml";
    pub const WORD_COMMENTS_EXTENDED: &str = "word/commentsExtended.xml";
    pub const WORKBOOK: &str = "xl/workbook.xml";
    pub const XL_STYLES: &str = "xl/styles.xml";
    pub const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
    pub const XL_THEME: &str = "xl/theme/theme1.xml";
    pub const PRESENTATION: &str = "ppt/presentation.xml";
    pub const PPT_AUTHORS: &str = "ppt/authors.xml";
}
