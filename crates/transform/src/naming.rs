//! Identifier canonicalization
//!
//! Every function here is total and idempotent: applying it to its own
//! output returns that output unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Characters that may not appear in an emitted enum identifier
const FORBIDDEN_ENUM_CHARS: [char; 9] = ['-', ':', '.', '*', '/', '(', ')', ' ', '_'];

/// Identifiers that clash with macros or keywords in generated clients
static RESERVED_IDENTIFIERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "DELETE", "IN", "OUT", "OPTIONAL", "ERROR", "NULL", "TRUE", "FALSE", "DOMAIN",
        "INTERFACE", "CONST", "VOID", "EOF", "DEBUG", "NO_ERROR", "min", "max", "NOT_SET",
        "override", "Self", "self", "type", "struct", "enum", "impl", "fn", "mod", "use",
        "match", "loop", "while", "for", "if", "else", "return", "true", "false", "static",
    ]
    .into_iter()
    .collect()
});

/// ASCII identifier accepted by every emitter
static VALID_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Whether an identifier collides with a reserved word
pub fn is_reserved(identifier: &str) -> bool {
    RESERVED_IDENTIFIERS.contains(identifier)
}

/// Whether `identifier` can be emitted as-is
pub fn is_valid_identifier(identifier: &str) -> bool {
    VALID_IDENTIFIER.is_match(identifier)
}

/// Upper-case the first character
///
/// # Examples
/// ```
/// use apigen_transform::naming::capitalize;
///
/// assert_eq!(capitalize("listBuckets"), "ListBuckets");
/// assert_eq!(capitalize("ListBuckets"), "ListBuckets");
/// ```
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper camel case identifier with every non-alphanumeric character dropped
///
/// The character after a dropped separator is upper-cased, so
/// `"Elastic Load-Balancing"` becomes `"ElasticLoadBalancing"`.
pub fn to_upper_camel(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut upper_next = true;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if upper_next {
                result.extend(ch.to_uppercase());
            } else {
                result.push(ch);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }

    result
}

/// Sanitize a raw enum literal into an identifier
///
/// Forbidden characters become `_`, runs of `_` collapse, a trailing `_` is
/// stripped, reserved identifiers get a `_` suffix and identifiers starting
/// with a digit get a `_` prefix.
///
/// # Examples
/// ```
/// use apigen_transform::naming::sanitize_enum_value;
///
/// assert_eq!(sanitize_enum_value("PACKAGE.NAME"), "PACKAGE_NAME");
/// assert_eq!(sanitize_enum_value("OH:DARK:THIRTY"), "OH_DARK_THIRTY");
/// assert_eq!(sanitize_enum_value("DELETE"), "DELETE_");
/// ```
pub fn sanitize_enum_value(literal: &str) -> String {
    let mut result = String::with_capacity(literal.len() + 1);

    for ch in literal.chars() {
        if FORBIDDEN_ENUM_CHARS.contains(&ch) {
            if !result.ends_with('_') {
                result.push('_');
            }
        } else {
            result.push(ch);
        }
    }

    if result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        return "_".to_string();
    }

    if is_reserved(&result) {
        result.push('_');
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }

    result
}

/// Strip a trailing `Exception` from an error shape name
pub fn error_name(shape_name: &str) -> &str {
    match shape_name.strip_suffix("Exception") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => shape_name,
    }
}
