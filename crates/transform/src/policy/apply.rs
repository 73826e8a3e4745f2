//! Built-in policy mutations
//!
//! Each step inspects the policy's capability set and rewrites the model
//! accordingly. Steps run in [`POLICY_STEPS`] order and are idempotent, so
//! applying a policy twice yields the same model.

use super::{ProtocolPolicy, VirtualAddressing, WrapperShape};
use apigen_common::{
    Location, Result, ServiceModel, Shape, ShapeKind, ShapeMember, ShapeRef, TransformError,
};
use tracing::{debug, info};

/// A single model mutation driven by a policy
pub type PolicyStep = fn(&mut ServiceModel, &ProtocolPolicy) -> Result<()>;

/// Built-in mutations in application order
pub const POLICY_STEPS: &[(&str, PolicyStep)] = &[
    ("synthesize_request_shapes", synthesize_request_shapes),
    ("inject_wrapper_shapes", inject_wrapper_shapes),
    ("mark_virtual_addressing", mark_virtual_addressing),
    ("mark_content_md5", mark_content_md5),
    ("mark_retryable_errors", mark_retryable_errors),
    ("apply_service_defaults", apply_service_defaults),
];

/// Run every built-in mutation against `model`
pub fn apply_policy(model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
    for (step, mutate) in POLICY_STEPS {
        debug!(step, protocol = %policy.protocol, "applying policy step");
        mutate(model, policy)?;
    }
    info!(protocol = %policy.protocol, "applied protocol policy");
    Ok(())
}

/// Give input-less operations an empty `<Op>Request` shape
fn synthesize_request_shapes(model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
    if !policy.requires_request_shape {
        return Ok(());
    }

    for op in model.operations.values_mut() {
        if op.request.is_some() {
            continue;
        }

        let name = format!("{}Request", op.name);
        if model.shapes.contains_key(&name) {
            return Err(TransformError::UnhandledNameConflict {
                name,
                operation: op.name.clone(),
            });
        }

        let mut shape = Shape::new(name.clone(), ShapeKind::Structure);
        shape.is_request = true;
        shape.signer = Some(policy.signing_defaults.signer.clone());
        shape.referenced_by.insert(op.name.clone());
        debug!(operation = %op.name, shape = %name, "synthesized empty request shape");

        model.shapes.insert(name.clone(), shape);
        op.request = Some(ShapeRef::new(name));
    }
    Ok(())
}

/// Add every wrapper shape as a member of each result shape
fn inject_wrapper_shapes(model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
    let has_results = model.shapes.values().any(|s| s.is_result);
    if !has_results {
        return Ok(());
    }

    for wrapper in &policy.synthetic_wrapper_shapes {
        ensure_wrapper(model, wrapper)?;

        for shape in model.shapes.values_mut().filter(|s| s.is_result) {
            if !shape.members.contains_key(&wrapper.member_name) {
                shape
                    .members
                    .insert(wrapper.member_name.clone(), ShapeMember::new(&wrapper.name));
            }
        }
    }
    Ok(())
}

/// Create the wrapper structure and its primitive field shapes if missing
fn ensure_wrapper(model: &mut ServiceModel, wrapper: &WrapperShape) -> Result<()> {
    if let Some(existing) = model.shapes.get(&wrapper.name) {
        let ours = existing.is_structure()
            && wrapper
                .fields
                .iter()
                .all(|(field, _)| existing.members.contains_key(field));
        if !ours {
            return Err(TransformError::UnhandledNameConflict {
                name: wrapper.name.clone(),
                operation: wrapper.member_name.clone(),
            });
        }
        return Ok(());
    }

    let mut structure = Shape::new(wrapper.name.clone(), ShapeKind::Structure);
    for (field, kind) in &wrapper.fields {
        let field_shape = format!("{}{}", wrapper.name, field);
        model
            .shapes
            .entry(field_shape.clone())
            .or_insert_with(|| Shape::new(field_shape.clone(), *kind));
        structure
            .members
            .insert(field.clone(), ShapeMember::new(field_shape));
    }
    debug!(shape = %wrapper.name, "injected wrapper shape");
    model.shapes.insert(wrapper.name.clone(), structure);
    Ok(())
}

/// Flag operations addressable through a virtual host
fn mark_virtual_addressing(model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
    let VirtualAddressing::LeadingUriLabel(label) = &policy.virtual_addressing else {
        return Ok(());
    };

    for op in model.operations.values_mut() {
        let binds_label = op
            .request
            .as_ref()
            .and_then(|r| model.shapes.get(&r.shape))
            .is_some_and(|request| {
                request.members.iter().any(|(member_name, member)| {
                    member.location == Location::Uri
                        && member.location_name.as_deref().unwrap_or(member_name) == label.as_str()
                })
            });
        op.virtual_addressing = binds_label && op.http.request_uri.starts_with_label(label);
    }
    Ok(())
}

/// Flag request shapes whose body digest must be precomputed
fn mark_content_md5(model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
    for op in model.operations.values() {
        let needs_md5 = policy.precomputed_content_hash_ops.contains(&op.name)
            || (policy.hash_checksum_required_ops && op.http_checksum_required);
        if !needs_md5 {
            continue;
        }
        if let Some(shape) = op
            .request
            .as_ref()
            .and_then(|r| model.shapes.get_mut(&r.shape))
        {
            shape.computes_content_md5 = true;
        }
    }
    Ok(())
}

fn mark_retryable_errors(model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
    for error in &mut model.service_errors {
        if !policy.retryable_error_names.contains(&error.name) {
            continue;
        }
        error.is_retryable = true;
        if let Some(traits) = model
            .shapes
            .get_mut(&error.shape)
            .and_then(|s| s.error.as_mut())
        {
            traits.retryable = true;
        }
    }
    Ok(())
}

/// Content type and signing defaults on the service metadata
fn apply_service_defaults(model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
    let metadata = &mut model.metadata;
    metadata.request_content_type = Some(policy.content_type_for(metadata));
    metadata.signing.default_signer = Some(policy.signing_defaults.signer.clone());
    if metadata.signing.signature_version.is_empty() {
        metadata.signing.signature_version = policy.signing_defaults.signature_version.clone();
    }
    Ok(())
}
