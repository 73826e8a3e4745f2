//! Transformation pipeline
//!
//! Graph builder, operation binder, error synthesis, pruner, name resolver
//! and protocol policy run in that order over a single [`ServiceModel`].
//! Every stage mutates the model synchronously; the result is handed to an
//! [`Emitter`] and never mutated again.

use crate::binder::OperationBinder;
use crate::errors::collect_service_errors;
use crate::graph::GraphBuilder;
use crate::naming::{is_valid_identifier, sanitize_enum_value, to_upper_camel};
use crate::policy::PolicyOverrides;
use crate::prune::{prune, rebuild_back_references};
use apigen_common::{Metadata, Result, ServiceModel, SigningInfo};
use apigen_parser::RawModel;
use tracing::{info, info_span, warn};

/// Consumer of a finished service model
#[cfg_attr(test, mockall::automock)]
pub trait Emitter {
    fn emit(&mut self, model: &ServiceModel) -> Result<()>;
}

/// Transform a raw description into a finished service model
pub fn transform(raw: &RawModel, overrides: &PolicyOverrides) -> Result<ServiceModel> {
    let metadata = build_metadata(raw);
    let span = info_span!("transform", service = %metadata.service_id);
    let _guard = span.enter();

    let policy = overrides
        .registry
        .resolve(&metadata.protocol, &metadata.service_id)?;
    let customizations = &overrides.customizations;

    let mut graph = GraphBuilder::new(raw, customizations).build()?;
    let operations = OperationBinder::new(raw, customizations, customizations.collision_table())
        .bind(&mut graph.shapes)?;
    let service_errors = collect_service_errors(&mut graph.shapes, &operations, customizations);

    let mut model = ServiceModel {
        metadata,
        shapes: graph.shapes,
        operations,
        service_errors,
    };

    prune(&mut model, &graph.removed);
    resolve_names(&mut model);

    let service = model.metadata.service_id.clone();
    overrides.apply(&mut model, policy, &service)?;
    rebuild_back_references(&mut model);

    info!(
        operations = model.operations.len(),
        shapes = model.shapes.len(),
        errors = model.service_errors.len(),
        "transformed service model"
    );
    Ok(model)
}

/// Transform and hand the finished model to `emitter`
pub fn run<E: Emitter + ?Sized>(
    raw: &RawModel,
    overrides: &PolicyOverrides,
    emitter: &mut E,
) -> Result<ServiceModel> {
    let model = transform(raw, overrides)?;
    emitter.emit(&model)?;
    Ok(model)
}

/// Service metadata with the namespace derived from the service id
pub fn build_metadata(raw: &RawModel) -> Metadata {
    let meta = &raw.metadata;
    let service_full_name = meta.service_full_name.clone().unwrap_or_default();
    let service_id = meta
        .service_id
        .clone()
        .or_else(|| meta.service_abbreviation.clone())
        .unwrap_or_else(|| service_full_name.clone());

    Metadata {
        namespace: to_upper_camel(&service_id),
        service_id,
        service_full_name,
        api_version: meta.api_version.clone().unwrap_or_default(),
        endpoint_prefix: meta.endpoint_prefix.clone().unwrap_or_default(),
        protocol: raw.protocol().to_string(),
        json_version: meta.json_version.clone(),
        target_prefix: meta.target_prefix.clone(),
        global_endpoint: meta.global_endpoint.clone(),
        signing: SigningInfo {
            signing_name: meta
                .signing_name
                .clone()
                .or_else(|| meta.endpoint_prefix.clone())
                .unwrap_or_default(),
            signature_version: meta.signature_version.clone().unwrap_or_default(),
            default_signer: None,
        },
        request_content_type: None,
    }
}

/// Canonicalize the identifiers emitters will print
fn resolve_names(model: &mut ServiceModel) {
    for shape in model.shapes.values_mut() {
        for value in &mut shape.enum_values {
            value.identifier = sanitize_enum_value(&value.identifier);
            if !is_valid_identifier(&value.identifier) {
                warn!(shape = %shape.name, identifier = %value.identifier, "enum identifier is not plain ASCII");
            }
        }
    }
}
