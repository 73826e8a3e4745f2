//! Type mapping from raw type names to shape kinds
//!
//! The table is built once and never mutated, so concurrent readers need no
//! synchronization.

use apigen_common::ShapeKind;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static SHAPE_KINDS: Lazy<HashMap<&'static str, ShapeKind>> = Lazy::new(|| {
    HashMap::from([
        ("structure", ShapeKind::Structure),
        ("list", ShapeKind::List),
        ("map", ShapeKind::Map),
        ("string", ShapeKind::String),
        ("character", ShapeKind::String),
        ("integer", ShapeKind::Integer),
        ("short", ShapeKind::Integer),
        ("byte", ShapeKind::Integer),
        ("long", ShapeKind::Long),
        ("biginteger", ShapeKind::Long),
        ("double", ShapeKind::Double),
        ("float", ShapeKind::Double),
        ("bigdecimal", ShapeKind::Double),
        ("boolean", ShapeKind::Boolean),
        ("timestamp", ShapeKind::Timestamp),
        ("blob", ShapeKind::Blob),
    ])
});

/// Maps raw type names to [`ShapeKind`]
pub struct TypeMapper;

impl TypeMapper {
    /// Map a raw type name to a shape kind
    ///
    /// A string with enum values is an `Enum`. Unknown type names return `None`.
    ///
    /// # Examples
    /// ```
    /// use apigen_transform::TypeMapper;
    /// use apigen_common::ShapeKind;
    ///
    /// assert_eq!(TypeMapper::kind_of("string", false), Some(ShapeKind::String));
    /// assert_eq!(TypeMapper::kind_of("string", true), Some(ShapeKind::Enum));
    /// assert_eq!(TypeMapper::kind_of("float", false), Some(ShapeKind::Double));
    /// ```
    pub fn kind_of(raw_type: &str, has_enum_values: bool) -> Option<ShapeKind> {
        let kind = SHAPE_KINDS.get(raw_type.to_ascii_lowercase().as_str()).copied()?;
        if kind == ShapeKind::String && has_enum_values {
            Some(ShapeKind::Enum)
        } else {
            Some(kind)
        }
    }
}
