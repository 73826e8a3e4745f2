//! Shape-name collision table
//!
//! Binding an operation renames its input/output shapes to
//! `<Operation>Request` / `<Operation>Result`. When that name is already
//! taken by a different shape, the collision must be listed here with a
//! named resolution. Anything not listed is an `UnhandledNameConflict`.

use serde::{Deserialize, Serialize};

/// How a listed collision is resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum CollisionResolution {
    /// Move the pre-existing shape to `new_name` and relink every edge to it
    RenameExisting { new_name: String },
    /// Discard the pre-existing shape; edges that named it now reach the
    /// operation's shape
    DropExisting,
}

/// One entry of the collision table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionRule {
    /// The contested shape name, e.g. `CopyObjectResult`
    pub name: String,
    /// Restrict the rule to one operation; any operation when absent
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(flatten)]
    pub resolution: CollisionResolution,
}

/// Closed set of known collisions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionTable {
    rules: Vec<CollisionRule>,
}

impl CollisionTable {
    /// An empty table: every collision is fatal
    pub fn empty() -> Self {
        Self::default()
    }

    /// The collisions known to occur in published service descriptions
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                CollisionRule {
                    name: "CopyObjectResult".to_string(),
                    operation: Some("CopyObject".to_string()),
                    resolution: CollisionResolution::RenameExisting {
                        new_name: "CopyObjectResultDetails".to_string(),
                    },
                },
                CollisionRule {
                    name: "GetBucketNotificationConfigurationRequest".to_string(),
                    operation: Some("GetBucketNotificationConfiguration".to_string()),
                    resolution: CollisionResolution::DropExisting,
                },
            ],
        }
    }

    /// Append rules, e.g. from a customization file
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = CollisionRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Look up the resolution for `name` contested while binding `operation`
    ///
    /// Operation-specific rules win over wildcard ones.
    pub fn resolve(&self, name: &str, operation: &str) -> Option<&CollisionResolution> {
        let exact = self
            .rules
            .iter()
            .find(|r| r.name == name && r.operation.as_deref() == Some(operation));
        let wildcard = || {
            self.rules
                .iter()
                .find(|r| r.name == name && r.operation.is_none())
        };

        exact.or_else(wildcard).map(|r| &r.resolution)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules() {
        let table = CollisionTable::builtin();
        assert_eq!(
            table.resolve("CopyObjectResult", "CopyObject"),
            Some(&CollisionResolution::RenameExisting {
                new_name: "CopyObjectResultDetails".to_string()
            })
        );
        assert_eq!(table.resolve("CopyObjectResult", "UploadPartCopy"), None);
        assert_eq!(table.resolve("SomethingElse", "CopyObject"), None);
    }

    #[test]
    fn test_exact_rule_beats_wildcard() {
        let table = CollisionTable::empty().with_rules([
            CollisionRule {
                name: "ListResult".to_string(),
                operation: None,
                resolution: CollisionResolution::DropExisting,
            },
            CollisionRule {
                name: "ListResult".to_string(),
                operation: Some("List".to_string()),
                resolution: CollisionResolution::RenameExisting {
                    new_name: "ListResultEntry".to_string(),
                },
            },
        ]);

        assert!(matches!(
            table.resolve("ListResult", "List"),
            Some(CollisionResolution::RenameExisting { .. })
        ));
        assert_eq!(
            table.resolve("ListResult", "Other"),
            Some(&CollisionResolution::DropExisting)
        );
    }

    #[test]
    fn test_empty_table_resolves_nothing() {
        let table = CollisionTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.resolve("CopyObjectResult", "CopyObject"), None);
    }
}
