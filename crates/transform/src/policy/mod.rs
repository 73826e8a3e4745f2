//! Protocol policy
//!
//! A [`ProtocolPolicy`] is a capability set describing which derived
//! artifacts a protocol needs: the request content type, default signer,
//! retryable error names, virtual host addressing, precomputed content
//! digests, synthetic wrapper shapes and synthesized request shapes.
//!
//! Policies are resolved from `(protocol, service)`: an exact service
//! override wins, otherwise the protocol default applies, otherwise the
//! protocol is unsupported.

mod apply;
mod overrides;

pub use apply::{apply_policy, POLICY_STEPS};
pub use overrides::{ModelOverride, OverrideStage, PolicyOverrides};

use apigen_common::{Metadata, Result, ShapeKind, Signer, TransformError};
use std::collections::{BTreeSet, HashMap};

/// Which operations may address the service through a virtual host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VirtualAddressing {
    #[default]
    Disabled,
    /// Operations whose request URI starts with this label and whose request
    /// binds a member to it
    LeadingUriLabel(String),
}

/// A structure injected into every result shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperShape {
    /// Name of the injected structure
    pub name: String,
    /// Member name under which result shapes hold the wrapper
    pub member_name: String,
    /// Primitive fields of the wrapper; each gets a `<name><field>` shape
    pub fields: Vec<(String, ShapeKind)>,
}

/// Default signing behaviour of a protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningDefaults {
    pub signer: Signer,
    /// Used when the description does not declare a signature version
    pub signature_version: String,
}

/// Capability set for one protocol, optionally specialized for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolPolicy {
    pub protocol: String,
    /// `{version}` is replaced with the description's JSON version
    pub request_content_type: String,
    pub signing_defaults: SigningDefaults,
    pub retryable_error_names: BTreeSet<String>,
    pub virtual_addressing: VirtualAddressing,
    /// Operations whose request shape needs a precomputed content MD5
    pub precomputed_content_hash_ops: BTreeSet<String>,
    /// Also precompute the digest for operations marked checksum-required
    pub hash_checksum_required_ops: bool,
    pub synthetic_wrapper_shapes: Vec<WrapperShape>,
    /// Operations without input still get an empty request shape
    pub requires_request_shape: bool,
}

impl ProtocolPolicy {
    /// A policy with neutral capabilities
    pub fn new(protocol: &str, request_content_type: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            request_content_type: request_content_type.to_string(),
            signing_defaults: SigningDefaults {
                signer: Signer::Default,
                signature_version: "v4".to_string(),
            },
            retryable_error_names: BTreeSet::new(),
            virtual_addressing: VirtualAddressing::Disabled,
            precomputed_content_hash_ops: BTreeSet::new(),
            hash_checksum_required_ops: false,
            synthetic_wrapper_shapes: Vec::new(),
            requires_request_shape: false,
        }
    }

    /// Request content type for a service's metadata
    pub fn content_type_for(&self, metadata: &Metadata) -> String {
        let version = metadata.json_version.as_deref().unwrap_or("1.0");
        self.request_content_type.replace("{version}", version)
    }

    /// Query-protocol `ResponseMetadata` wrapper
    pub fn response_metadata_wrapper() -> WrapperShape {
        WrapperShape {
            name: "ResponseMetadata".to_string(),
            member_name: "ResponseMetadata".to_string(),
            fields: vec![("RequestId".to_string(), ShapeKind::String)],
        }
    }
}

/// Protocol defaults plus service-specific overrides
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    defaults: HashMap<String, ProtocolPolicy>,
    services: HashMap<(String, String), ProtocolPolicy>,
}

impl PolicyRegistry {
    /// A registry with no policies at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Defaults for the supported protocols and the known service overrides
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        let json = ProtocolPolicy::new("json", "application/x-amz-json-{version}");
        let rest_json = ProtocolPolicy::new("rest-json", "application/json");

        let mut rest_xml = ProtocolPolicy::new("rest-xml", "application/xml");
        rest_xml.hash_checksum_required_ops = true;

        let mut query = ProtocolPolicy::new("query", "application/x-www-form-urlencoded");
        query.requires_request_shape = true;
        query.synthetic_wrapper_shapes = vec![ProtocolPolicy::response_metadata_wrapper()];

        let mut ec2 = ProtocolPolicy::new("ec2", "application/x-www-form-urlencoded");
        ec2.requires_request_shape = true;

        let mut s3 = rest_xml.clone();
        s3.virtual_addressing = VirtualAddressing::LeadingUriLabel("Bucket".to_string());
        s3.signing_defaults.signer = Signer::UnsignedBody;
        s3.precomputed_content_hash_ops = [
            "DeleteObjects",
            "PutBucketCors",
            "PutBucketLifecycle",
            "PutBucketLifecycleConfiguration",
            "PutBucketPolicy",
            "PutBucketTagging",
            "PutObjectLegalHold",
            "PutObjectLockConfiguration",
            "PutObjectRetention",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let mut dynamodb = json.clone();
        dynamodb.retryable_error_names = [
            "ProvisionedThroughputExceeded",
            "RequestLimitExceeded",
            "TransactionInProgress",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let mut glacier = rest_json.clone();
        glacier.hash_checksum_required_ops = true;

        for policy in [json, rest_json, rest_xml, query, ec2] {
            registry.register_protocol(policy);
        }
        registry.register_service("s3", s3);
        registry.register_service("dynamodb", dynamodb);
        registry.register_service("glacier", glacier);

        registry
    }

    pub fn register_protocol(&mut self, policy: ProtocolPolicy) {
        self.defaults.insert(policy.protocol.clone(), policy);
    }

    /// Register a complete policy for one service
    pub fn register_service(&mut self, service: &str, policy: ProtocolPolicy) {
        self.services
            .insert((policy.protocol.clone(), service_key(service)), policy);
    }

    /// Derive a service policy from the protocol default
    pub fn override_service(
        &mut self,
        protocol: &str,
        service: &str,
        customize: impl FnOnce(&mut ProtocolPolicy),
    ) -> Result<()> {
        let mut policy = self
            .defaults
            .get(protocol)
            .cloned()
            .ok_or_else(|| TransformError::UnsupportedProtocol {
                protocol: protocol.to_string(),
                service: service.to_string(),
            })?;
        customize(&mut policy);
        self.register_service(service, policy);
        Ok(())
    }

    /// Resolve the policy for a protocol/service pair
    pub fn resolve(&self, protocol: &str, service: &str) -> Result<&ProtocolPolicy> {
        self.services
            .get(&(protocol.to_string(), service_key(service)))
            .or_else(|| self.defaults.get(protocol))
            .ok_or_else(|| TransformError::UnsupportedProtocol {
                protocol: protocol.to_string(),
                service: service.to_string(),
            })
    }
}

/// Normalized service key: lower case, no spaces or dashes
pub fn service_key(service: &str) -> String {
    service
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}
