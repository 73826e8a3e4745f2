//! Raw model loading for service-interface descriptions
//!
//! This crate deserializes a JSON service description into an in-memory AST
//! of raw shape and operation records (`RawModel`). It performs no semantic
//! validation: dangling references, duplicate names and malformed HTTP
//! bindings are all detected later by the transformation pipeline.
//!
//! ## Format
//! A description contains:
//! - `metadata` with the protocol id, API version and signing information
//! - `operations` keyed by name, with HTTP bindings and input/output/error references
//! - `shapes` keyed by name, describing structures, collections, enums and primitives

mod loader;
mod types;

pub use loader::ModelLoader;
pub use types::*;

use apigen_common::Result;
use std::path::Path;

/// Load a raw service description from a file
///
/// # Arguments
/// * `path` - Path to the JSON description
///
/// # Returns
/// * `RawModel` - The undecorated shape/operation records
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<RawModel> {
    ModelLoader::from_file(path).map(ModelLoader::into_model)
}
