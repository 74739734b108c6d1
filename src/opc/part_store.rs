//! Part storage: URI -> part

use crate::error::{Error, Result};
use crate::opc::{Part, PartUri};
use std::collections::BTreeMap;

/// Behaviour of [`PartStore::add`] when the URI is already taken
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddMode {
    /// Fail if the part exists
    #[default]
    Create,
    /// Replace the existing payload
    Overwrite,
}

/// Ordered map of parts keyed by normalized URI.
///
/// Package-meta parts (`[Content_Types].xml`, `*.rels`) are never stored here;
/// the content-type registry and relationship graph own them.
#[derive(Clone, Debug, Default)]
pub struct PartStore {
    parts: BTreeMap<PartUri, Part>,
}

impl PartStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a part
    pub fn get(&self, uri: &PartUri) -> Option<&Part> {
        self.parts.get(uri)
    }

    /// Get a part mutably
    pub fn get_mut(&mut self, uri: &PartUri) -> Option<&mut Part> {
        self.parts.get_mut(uri)
    }

    /// Add a part
    pub fn add(
        &mut self,
        uri: PartUri,
        content_type: &str,
        data: Vec<u8>,
        mode: AddMode,
    ) -> Result<&mut Part> {
        if uri.is_relationships() || uri.as_str() == super::well_known::CONTENT_TYPES {
            return Err(Error::InvalidValue(format!(
                "'{}' is managed by the package",
                uri
            )));
        }
        if mode == AddMode::Create && self.parts.contains_key(&uri) {
            return Err(Error::InvalidValue(format!("part '{}' already exists", uri)));
        }

        self.parts
            .insert(uri.clone(), Part::new(uri.clone(), content_type, data));
        self.parts
            .get_mut(&uri)
            .ok_or_else(|| Error::PartNotFound(uri.to_string()))
    }

    /// Insert a part as read from a container, skipping the meta-part check
    pub(crate) fn insert_loaded(&mut self, mut part: Part) {
        part.mark_clean();
        self.parts.insert(part.uri().clone(), part);
    }

    /// Delete a part
    pub fn delete(&mut self, uri: &PartUri) -> Option<Part> {
        self.parts.remove(uri)
    }

    /// Check whether a part exists
    pub fn exists(&self, uri: &PartUri) -> bool {
        self.parts.contains_key(uri)
    }

    /// Iterate over all parts in URI order
    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Drop every part
    pub(crate) fn clear(&mut self) {
        self.parts.clear();
    }
}
