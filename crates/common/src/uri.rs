//! Request-URI template parsing
//!
//! A template such as `/test/{var1}/test1/{var2+}?varParam={var3}` is split
//! into its literal segments and its labels. Labels ending in `+` are greedy
//! and may span `/`.

use serde::{Deserialize, Serialize};

use crate::{Result, TransformError};

/// A `{label}` inside a request-URI template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriLabel {
    pub name: String,
    pub greedy: bool,
    /// Whether the label sits after the query separator
    pub in_query: bool,
}

/// Parsed request-URI template
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestUri {
    /// The template exactly as declared
    pub raw: String,
    /// Non-empty literal text between labels, in order
    pub literals: Vec<String>,
    pub labels: Vec<UriLabel>,
    /// Path portion, before any `?`
    pub path: String,
    /// Query portion, after the `?`
    pub query: Option<String>,
}

impl RequestUri {
    /// Parse a request-URI template
    ///
    /// # Examples
    /// ```
    /// use apigen_common::RequestUri;
    ///
    /// let uri = RequestUri::parse("/test/{var1}/test1/{var2+}?varParam={var3}").unwrap();
    /// assert_eq!(uri.literals, vec!["/test/", "/test1/", "?varParam="]);
    /// assert_eq!(uri.label_names(), vec!["var1", "var2", "var3"]);
    /// ```
    pub fn parse(template: &str) -> Result<Self> {
        let malformed = |reason: &str| TransformError::MalformedHttpBinding {
            uri: template.to_string(),
            reason: reason.to_string(),
        };

        let (path, query) = match template.matches('?').count() {
            0 => (template.to_string(), None),
            1 => {
                let (path, query) = template.split_once('?').unwrap_or((template, ""));
                (path.to_string(), Some(query.to_string()))
            }
            _ => return Err(malformed("more than one query separator")),
        };
        let query_start = path.len();

        let mut literals = Vec::new();
        let mut labels = Vec::new();
        let mut rest = template;
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            let literal = &rest[..open];
            if literal.contains('}') {
                return Err(malformed("unbalanced '}'"));
            }
            if !literal.is_empty() {
                literals.push(literal.to_string());
            }

            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| malformed("unterminated label"))?;
            let body = &after[..close];
            if body.contains('{') {
                return Err(malformed("nested label"));
            }

            let (name, greedy) = match body.strip_suffix('+') {
                Some(name) => (name, true),
                None => (body, false),
            };
            if name.is_empty() {
                return Err(malformed("empty label"));
            }

            labels.push(UriLabel {
                name: name.to_string(),
                greedy,
                in_query: query.is_some() && offset + open > query_start,
            });

            let consumed = open + 1 + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if rest.contains('}') {
            return Err(malformed("unbalanced '}'"));
        }
        if !rest.is_empty() {
            literals.push(rest.to_string());
        }

        Ok(Self {
            raw: template.to_string(),
            literals,
            labels,
            path,
            query,
        })
    }

    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    /// Whether the path starts with the given label, e.g. `/{Bucket}`
    pub fn starts_with_label(&self, label: &str) -> bool {
        self.path
            .strip_prefix('/')
            .and_then(|p| p.strip_prefix('{'))
            .and_then(|p| p.strip_prefix(label))
            .is_some_and(|p| p.starts_with('}') || p.starts_with("+}"))
    }
}
