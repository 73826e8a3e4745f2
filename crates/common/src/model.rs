//! Normalized service model
//!
//! Shapes live in a name-keyed table; every cross-shape edge is stored as the
//! target shape's name. `referenced_by` on a shape is the reverse index of
//! those edges and is maintained by the pipeline, it never implies ownership.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::RequestUri;

/// Kind of a shape in the type graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Structure,
    List,
    Map,
    Enum,
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Timestamp,
    Blob,
}

impl ShapeKind {
    /// Whether shapes of this kind carry outgoing edges
    pub fn is_container(self) -> bool {
        matches!(self, ShapeKind::Structure | ShapeKind::List | ShapeKind::Map)
    }
}

/// Where a member is bound on the HTTP message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Location {
    #[default]
    Body,
    Header,
    QueryString,
    Uri,
    StatusCode,
}

/// Signer attached to a request shape, derived from the operation's auth type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signer {
    Default,
    UnsignedBody,
    Custom(String),
    Anonymous,
}

/// Raw enum literal paired with the identifier emitted for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub raw: String,
    pub identifier: String,
}

/// An edge from a container shape to its target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeMember {
    /// Name of the target shape in `ServiceModel::shapes`
    pub target: String,
    pub required: bool,
    pub location: Location,
    pub location_name: Option<String>,
    pub streaming: bool,
    pub idempotency_token: bool,
    pub flattened: bool,
    pub xml_namespace: Option<String>,
    pub documentation: Option<String>,
}

impl ShapeMember {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            required: false,
            location: Location::Body,
            location_name: None,
            streaming: false,
            idempotency_token: false,
            flattened: false,
            xml_namespace: None,
            documentation: None,
        }
    }
}

/// Error metadata attached to shapes that model service errors
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorTraits {
    pub code: Option<String>,
    pub http_status_code: Option<u16>,
    pub sender_fault: bool,
    pub fault: bool,
    pub retryable: bool,
}

/// A data type node in the service's type graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    pub kind: ShapeKind,
    pub documentation: Option<String>,
    /// Ordered members, only populated for structures
    pub members: IndexMap<String, ShapeMember>,
    pub list_member: Option<ShapeMember>,
    pub map_key: Option<ShapeMember>,
    pub map_value: Option<ShapeMember>,
    pub enum_values: Vec<EnumValue>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Names of the shapes and operations holding an edge to this shape
    pub referenced_by: BTreeSet<String>,
    pub is_request: bool,
    pub is_result: bool,
    pub is_referenced: bool,
    pub flattened: bool,
    pub sensitive: bool,
    pub streaming: bool,
    pub event_stream: bool,
    pub event: bool,
    pub timestamp_format: Option<String>,
    pub payload: Option<String>,
    pub xml_namespace: Option<String>,
    pub error: Option<ErrorTraits>,
    pub signer: Option<Signer>,
    pub computes_content_md5: bool,
}

impl Shape {
    /// Create a bare shape with no edges and no flags set
    pub fn new(name: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            documentation: None,
            members: IndexMap::new(),
            list_member: None,
            map_key: None,
            map_value: None,
            enum_values: Vec::new(),
            min: None,
            max: None,
            referenced_by: BTreeSet::new(),
            is_request: false,
            is_result: false,
            is_referenced: false,
            flattened: false,
            sensitive: false,
            streaming: false,
            event_stream: false,
            event: false,
            timestamp_format: None,
            payload: None,
            xml_namespace: None,
            error: None,
            signer: None,
            computes_content_md5: false,
        }
    }

    pub fn is_structure(&self) -> bool {
        self.kind == ShapeKind::Structure
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// All outgoing edges of this shape, members first, then list/map edges
    pub fn edges(&self) -> impl Iterator<Item = &ShapeMember> {
        self.members
            .values()
            .chain(self.list_member.iter())
            .chain(self.map_key.iter())
            .chain(self.map_value.iter())
    }

    /// Mutable access to every outgoing edge
    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut ShapeMember> {
        self.members
            .values_mut()
            .chain(self.list_member.iter_mut())
            .chain(self.map_key.iter_mut())
            .chain(self.map_value.iter_mut())
    }

    /// Distinct names of the shapes this shape points at
    pub fn targets(&self) -> BTreeSet<String> {
        self.edges().map(|m| m.target.clone()).collect()
    }
}

/// Auth scheme declared on an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthType {
    #[default]
    V4,
    V4UnsignedBody,
    Custom,
    None,
}

/// HTTP binding of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpBinding {
    pub method: String,
    pub request_uri: RequestUri,
    pub response_code: Option<u16>,
}

/// Reference from an operation to its request or result shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRef {
    pub shape: String,
    pub location_name: Option<String>,
    pub xml_namespace: Option<String>,
    /// Element wrapping a query-protocol response body
    pub result_wrapper: Option<String>,
    pub documentation: Option<String>,
}

impl ShapeRef {
    pub fn new(shape: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            location_name: None,
            xml_namespace: None,
            result_wrapper: None,
            documentation: None,
        }
    }
}

/// A callable API method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub documentation: Option<String>,
    pub http: HttpBinding,
    /// Always named `<Operation>Request` once bound
    pub request: Option<ShapeRef>,
    /// Always named `<Operation>Result` once bound
    pub result: Option<ShapeRef>,
    /// Error shape names in declaration order
    pub errors: Vec<String>,
    pub auth_type: AuthType,
    pub authorizer_name: Option<String>,
    pub http_checksum_required: bool,
    pub virtual_addressing: bool,
}

/// A service error, deduplicated by name across the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    /// Error name with any trailing `Exception` removed
    pub name: String,
    /// Shape carrying the error's members
    pub shape: String,
    pub http_status_code: Option<u16>,
    pub is_retryable: bool,
    pub is_fault: bool,
    pub is_client_exception: bool,
}

/// Signing information for the service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SigningInfo {
    pub signing_name: String,
    pub signature_version: String,
    pub default_signer: Option<Signer>,
}

/// Service-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub namespace: String,
    pub service_id: String,
    pub service_full_name: String,
    pub api_version: String,
    pub endpoint_prefix: String,
    pub protocol: String,
    pub json_version: Option<String>,
    pub target_prefix: Option<String>,
    pub global_endpoint: Option<String>,
    pub signing: SigningInfo,
    /// Content type of request bodies, filled in by the protocol policy
    pub request_content_type: Option<String>,
}

/// The pipeline's terminal artifact handed to an emitter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceModel {
    pub metadata: Metadata,
    pub shapes: BTreeMap<String, Shape>,
    pub operations: BTreeMap<String, Operation>,
    pub service_errors: Vec<ServiceError>,
}

impl ServiceModel {
    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.get(name)
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Request shape of an operation, if it has one
    pub fn request_shape(&self, operation: &str) -> Option<&Shape> {
        let op = self.operations.get(operation)?;
        self.shapes.get(&op.request.as_ref()?.shape)
    }

    /// Result shape of an operation, if it has one
    pub fn result_shape(&self, operation: &str) -> Option<&Shape> {
        let op = self.operations.get(operation)?;
        self.shapes.get(&op.result.as_ref()?.shape)
    }

    pub fn service_error(&self, name: &str) -> Option<&ServiceError> {
        self.service_errors.iter().find(|e| e.name == name)
    }

    /// Shapes kept alive by the service error list
    ///
    /// Service errors outlive the operations that declared them, so their
    /// shapes are roots of the graph without appearing in `referenced_by`.
    pub fn service_error_shapes(&self) -> BTreeSet<String> {
        self.service_errors.iter().map(|e| e.shape.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_edges_cover_members_and_collections() {
        let mut structure = Shape::new("Outer", ShapeKind::Structure);
        structure
            .members
            .insert("A".to_string(), ShapeMember::new("StringShape"));
        structure
            .members
            .insert("B".to_string(), ShapeMember::new("StringShape"));
        assert_eq!(structure.edges().count(), 2);
        assert_eq!(
            structure.targets().into_iter().collect::<Vec<_>>(),
            vec!["StringShape".to_string()]
        );

        let mut map = Shape::new("Tags", ShapeKind::Map);
        map.map_key = Some(ShapeMember::new("TagKey"));
        map.map_value = Some(ShapeMember::new("TagValue"));
        let targets: Vec<_> = map.edges().map(|m| m.target.as_str()).collect();
        assert_eq!(targets, vec!["TagKey", "TagValue"]);
    }

    #[test]
    fn test_container_kinds() {
        assert!(ShapeKind::Structure.is_container());
        assert!(ShapeKind::List.is_container());
        assert!(!ShapeKind::Enum.is_container());
        assert!(!ShapeKind::Blob.is_container());
    }
}
