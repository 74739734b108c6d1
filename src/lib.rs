//! # linch-ooxml-rs
//!
//! Reading and writing of Office Open XML packages: DOCX, XLSX and PPTX.
//!
//! ## Features
//!
//! - Open Packaging Convention engine (parts, content types, relationships)
//! - Round-trip preservation (unknown elements and parts are kept intact)
//! - Typed models for word-processing documents, workbooks and presentations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use linch_ooxml_rs::{Document, Workbook, Presentation};
//!
//! let mut doc = Document::new();
//! doc.add_paragraph("Hello World!")?;
//! doc.save("output.docx")?;
//!
//! let mut book = Workbook::new()?;
//! book.sheet_mut("Sheet1")?.set_value("A1", 42.0)?;
//! book.save("output.xlsx")?;
//!
//! let mut deck = Presentation::new()?;
//! deck.add_slide(0)?;
//! deck.save("output.pptx")?;
//! ```

pub mod document;
pub mod drawing;
pub mod error;
pub mod opc;
pub mod presentation;
pub mod spreadsheet;
pub mod xml;

pub use document::{Document, Paragraph, Run, Table};
pub use error::{Error, ErrorKind, Result};
pub use opc::{Package, Part, PartUri};
pub use presentation::Presentation;
pub use spreadsheet::Workbook;
