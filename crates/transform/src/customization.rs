//! Per-service customization data loaded from YAML
//!
//! Customizations are configuration consumed by the pipeline, not code:
//! cosmetic enum identifier patches, extra collision-table entries,
//! operations to leave out and error names to treat as retryable.
//!
//! ```yaml
//! enum_patches:
//!   StorageClass:
//!     "GLACIER_IR": "GLACIER_INSTANT_RETRIEVAL"
//! collisions:
//!   - name: CopyPartResult
//!     operation: UploadPartCopy
//!     resolution: rename_existing
//!     new_name: CopyPartResultDetails
//! excluded_operations:
//!   - SelectObjectContent
//! retryable_errors:
//!   - RequestLimitExceeded
//! ```

use crate::collision::{CollisionRule, CollisionTable};
use apigen_common::{Result, TransformError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Root structure of a customization file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Customizations {
    /// Shape name → raw enum literal → identifier literal to sanitize instead
    #[serde(default)]
    pub enum_patches: BTreeMap<String, BTreeMap<String, String>>,
    /// Entries appended to the built-in collision table
    #[serde(default)]
    pub collisions: Vec<CollisionRule>,
    /// Operations dropped before binding, like deprecated ones
    #[serde(default)]
    pub excluded_operations: BTreeSet<String>,
    /// Error names flagged retryable in addition to the protocol policy
    #[serde(default)]
    pub retryable_errors: BTreeSet<String>,
}

impl Customizations {
    /// Load customizations from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TransformError::Config(format!(
                "Failed to read customization file {:?}: {}",
                path, e
            ))
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            TransformError::Config(msg) => {
                TransformError::Config(format!("{} (in {:?})", msg, path))
            }
            other => other,
        })
    }

    /// Parse customizations from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            TransformError::Config(format!("Failed to parse customization YAML: {}", e))
        })
    }

    /// Replacement literal for an enum value, if one is configured
    pub fn enum_patch(&self, shape: &str, literal: &str) -> Option<&str> {
        self.enum_patches
            .get(shape)
            .and_then(|patches| patches.get(literal))
            .map(String::as_str)
    }

    pub fn is_excluded(&self, operation: &str) -> bool {
        self.excluded_operations.contains(operation)
    }

    /// The built-in collision table extended with the configured rules
    pub fn collision_table(&self) -> CollisionTable {
        CollisionTable::builtin().with_rules(self.collisions.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionResolution;

    const SAMPLE: &str = r#"
enum_patches:
  StorageClass:
    "GLACIER_IR": "GLACIER_INSTANT_RETRIEVAL"
collisions:
  - name: CopyPartResult
    operation: UploadPartCopy
    resolution: rename_existing
    new_name: CopyPartResultDetails
  - name: LegacyRequest
    resolution: drop_existing
excluded_operations:
  - SelectObjectContent
retryable_errors:
  - RequestLimitExceeded
"#;

    #[test]
    fn test_parse_customizations() {
        let custom = Customizations::from_yaml(SAMPLE).unwrap();

        assert_eq!(
            custom.enum_patch("StorageClass", "GLACIER_IR"),
            Some("GLACIER_INSTANT_RETRIEVAL")
        );
        assert_eq!(custom.enum_patch("StorageClass", "STANDARD"), None);
        assert!(custom.is_excluded("SelectObjectContent"));
        assert!(custom.retryable_errors.contains("RequestLimitExceeded"));

        assert_eq!(custom.collisions.len(), 2);
        assert_eq!(
            custom.collisions[0].resolution,
            CollisionResolution::RenameExisting {
                new_name: "CopyPartResultDetails".to_string()
            }
        );
        assert_eq!(custom.collisions[1].operation, None);
        assert_eq!(
            custom.collisions[1].resolution,
            CollisionResolution::DropExisting
        );
    }

    #[test]
    fn test_collision_table_extends_builtin() {
        let custom = Customizations::from_yaml(SAMPLE).unwrap();
        let table = custom.collision_table();
        assert_eq!(table.len(), CollisionTable::builtin().len() + 2);
        assert!(table.resolve("CopyPartResult", "UploadPartCopy").is_some());
        assert!(table.resolve("CopyObjectResult", "CopyObject").is_some());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let custom = Customizations::from_yaml("{}").unwrap();
        assert_eq!(custom, Customizations::default());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let result = Customizations::from_yaml("collisions: [ { name: 1, resolution: bogus } ]");
        assert!(matches!(result, Err(TransformError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let custom = Customizations::load(&path).unwrap();
        assert!(custom.is_excluded("SelectObjectContent"));

        let missing = Customizations::load(&dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(TransformError::Config(_))));
    }
}
