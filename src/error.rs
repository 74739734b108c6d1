//! Error types for linch-ooxml-rs

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML encoding error: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("package is closed")]
    Closed,

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Corrupted package: {0}")]
    Corrupted(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Validation failed for '{field}': {message} (value: '{value}')")]
    Validation {
        field: String,
        message: String,
        value: String,
    },
}

/// Coarse classification of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Closed,
    PartNotFound,
    InvalidFormat,
    Corrupted,
    InvalidReference,
    InvalidIndex,
    InvalidValue,
    Validation,
}

impl ErrorKind {
    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::Closed => "closed",
            ErrorKind::PartNotFound => "part-not-found",
            ErrorKind::InvalidFormat => "invalid-format",
            ErrorKind::Corrupted => "corrupted",
            ErrorKind::InvalidReference => "invalid-reference",
            ErrorKind::InvalidIndex => "invalid-index",
            ErrorKind::InvalidValue => "invalid-value",
            ErrorKind::Validation => "validation",
        }
    }
}

impl Error {
    /// Build a validation error
    pub fn validation(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
            value: value.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Zip(_)
            | Error::Xml(_)
            | Error::XmlEncoding(_)
            | Error::XmlAttr(_)
            | Error::Utf8(_)
            | Error::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Error::Closed => ErrorKind::Closed,
            Error::PartNotFound(_) => ErrorKind::PartNotFound,
            Error::Corrupted(_) => ErrorKind::Corrupted,
            Error::InvalidReference(_) => ErrorKind::InvalidReference,
            Error::InvalidIndex(_) => ErrorKind::InvalidIndex,
            Error::InvalidValue(_) => ErrorKind::InvalidValue,
            Error::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// Short machine-readable code, see [`ErrorKind::code`]
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
