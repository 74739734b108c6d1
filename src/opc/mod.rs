//! Open Packaging Convention (OPC) implementation
//!
//! This module handles the ZIP-based package format shared by DOCX, XLSX and
//! PPTX files: parts, content types and the relationship graph.

mod container;
pub mod content_types;
mod core_properties;
mod package;
mod part;
mod part_store;
mod part_uri;
mod relationships;

pub use container::{Container, ContainerWriter};
pub use content_types::ContentTypes;
pub use core_properties::CoreProperties;
pub use package::Package;
pub use part::Part;
pub use part_store::{AddMode, PartStore};
pub use part_uri::{relative_target, resolve_target, well_known, PartUri};
pub use relationships::{rel_types, Relationship, RelationshipGraph, Relationships, TargetMode};
