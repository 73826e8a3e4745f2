//! Raw service description type definitions
//!
//! These types mirror the JSON description one-to-one. No semantic
//! validation happens here; unknown keys are ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root document of a service description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawModel {
    /// Description format version (e.g., "2.0")
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub metadata: RawMetadata,

    /// Operations keyed by name, in declaration order
    #[serde(default)]
    pub operations: IndexMap<String, RawOperation>,

    /// Shapes keyed by name, in declaration order
    #[serde(default)]
    pub shapes: IndexMap<String, RawShape>,

    #[serde(default)]
    pub documentation: Option<String>,
}

/// Service-level metadata block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetadata {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub endpoint_prefix: Option<String>,
    #[serde(default)]
    pub global_endpoint: Option<String>,
    #[serde(default)]
    pub json_version: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub service_abbreviation: Option<String>,
    #[serde(default)]
    pub service_full_name: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub signature_version: Option<String>,
    #[serde(default)]
    pub signing_name: Option<String>,
    #[serde(default)]
    pub target_prefix: Option<String>,
    /// Default wire format of timestamp shapes
    #[serde(default)]
    pub timestamp_format: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

/// HTTP binding block of an operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHttp {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub request_uri: Option<String>,
    #[serde(default)]
    pub response_code: Option<u16>,
}

/// XML namespace attached to a shape, member or operation input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawXmlNamespace {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Reference from an operation to a shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShapeRef {
    pub shape: String,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub xml_namespace: Option<RawXmlNamespace>,
    #[serde(default)]
    pub result_wrapper: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
}

/// A raw operation record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub http: RawHttp,
    #[serde(default)]
    pub input: Option<RawShapeRef>,
    #[serde(default)]
    pub output: Option<RawShapeRef>,
    #[serde(default)]
    pub errors: Vec<RawShapeRef>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, rename = "authtype")]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub authorizer: Option<String>,
    #[serde(default)]
    pub http_checksum_required: bool,
}

/// A raw member edge of a structure, list or map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMember {
    pub shape: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub idempotency_token: bool,
    #[serde(default)]
    pub flattened: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub xml_namespace: Option<RawXmlNamespace>,
}

/// Error metadata block of a shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawErrorInfo {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub http_status_code: Option<u16>,
    #[serde(default)]
    pub sender_fault: bool,
}

/// Retry hint of an error shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRetryable {
    #[serde(default)]
    pub throttling: bool,
}

/// A raw shape record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShape {
    /// Raw type name (e.g., "structure", "string", "long")
    #[serde(rename = "type")]
    pub shape_type: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Vec<String>,
    #[serde(default)]
    pub members: IndexMap<String, RawMember>,
    #[serde(default)]
    pub member: Option<RawMember>,
    #[serde(default)]
    pub key: Option<RawMember>,
    #[serde(default)]
    pub value: Option<RawMember>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub flattened: bool,
    #[serde(default)]
    pub error: Option<RawErrorInfo>,
    #[serde(default)]
    pub exception: bool,
    #[serde(default)]
    pub fault: bool,
    #[serde(default)]
    pub retryable: Option<RawRetryable>,
    #[serde(default)]
    pub timestamp_format: Option<String>,
    #[serde(default, rename = "eventstream")]
    pub event_stream: bool,
    #[serde(default)]
    pub event: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub xml_namespace: Option<RawXmlNamespace>,
}

impl RawShape {
    /// Whether the shape models a service error
    pub fn is_error(&self) -> bool {
        self.exception || self.error.is_some() || self.fault
    }

    /// Whether the shape is excluded from generation (event streams and their events)
    pub fn is_excluded(&self) -> bool {
        self.event_stream || self.event
    }

    /// Every member-like edge of this shape, paired with its member name
    ///
    /// List elements are reported as `member`, map edges as `key` and `value`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &RawMember)> {
        self.members
            .iter()
            .map(|(name, member)| (name.as_str(), member))
            .chain(self.member.iter().map(|m| ("member", m)))
            .chain(self.key.iter().map(|m| ("key", m)))
            .chain(self.value.iter().map(|m| ("value", m)))
    }
}

impl RawModel {
    pub fn get_shape(&self, name: &str) -> Option<&RawShape> {
        self.shapes.get(name)
    }

    pub fn get_operation(&self, name: &str) -> Option<&RawOperation> {
        self.operations.get(name)
    }

    /// Protocol identifier declared in the metadata, empty when absent
    pub fn protocol(&self) -> &str {
        self.metadata.protocol.as_deref().unwrap_or_default()
    }
}
