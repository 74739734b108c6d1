//! A single stored part: URI, content type and payload

use crate::opc::PartUri;

/// A part within an OPC package
#[derive(Clone, Debug)]
pub struct Part {
    uri: PartUri,
    content_type: String,
    data: Vec<u8>,
    modified: bool,
}

impl Part {
    pub fn new(uri: PartUri, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            uri,
            content_type: content_type.into(),
            data,
            modified: true,
        }
    }

    pub fn uri(&self) -> &PartUri {
        &self.uri
    }

    /// Content type as registered when the part was added or loaded
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload as UTF-8, without a leading byte-order mark
    pub fn data_as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(crate::xml::strip_bom(&self.data))
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.modified = true;
    }

    /// New or rewritten since the package was read
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }
}
