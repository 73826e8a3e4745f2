//! Service description file loader

use super::types::RawModel;
use apigen_common::{Result, TransformError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Raw model loader
///
/// Reads a service description into a [`RawModel`] without interpreting it.
pub struct ModelLoader {
    model: RawModel,
}

impl ModelLoader {
    /// Load a description from a file path
    ///
    /// # Example
    /// ```rust,ignore
    /// let loader = ModelLoader::from_file("models/s3-2006-03-01.normal.json")?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            TransformError::Parse(format!(
                "Failed to read service description {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parse a description from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let model: RawModel = serde_json::from_str(json).map_err(|e| {
            TransformError::Parse(format!("Failed to parse service description: {}", e))
        })?;

        debug!(
            shapes = model.shapes.len(),
            operations = model.operations.len(),
            protocol = model.protocol(),
            "loaded raw service description"
        );

        Ok(Self { model })
    }

    /// Get reference to the loaded raw model
    pub fn model(&self) -> &RawModel {
        &self.model
    }

    /// Take ownership of the loaded raw model
    pub fn into_model(self) -> RawModel {
        self.model
    }
}
