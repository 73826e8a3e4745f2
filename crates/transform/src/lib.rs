//! Service model transformation
//!
//! Turns a loosely-typed [`RawModel`](apigen_parser::RawModel) into a
//! normalized, back-referenced [`ServiceModel`](apigen_common::ServiceModel):
//!
//! 1. the shape graph is built in two passes so circular references resolve
//! 2. operations are bound and their request/result shapes renamed or cloned
//!    to `<Operation>Request` / `<Operation>Result`
//! 3. service errors are collected and deduplicated
//! 4. shapes excluded by policy, and everything only they kept alive, are pruned
//! 5. emitted identifiers are canonicalized
//! 6. the protocol policy and any registered overrides are applied
//!
//! ```no_run
//! use apigen_transform::{transform, PolicyOverrides};
//!
//! let raw = apigen_parser::load_model("s3-2006-03-01.normal.json")?;
//! let model = transform(&raw, &PolicyOverrides::new())?;
//! println!("{} operations", model.operations.len());
//! # Ok::<(), apigen_common::TransformError>(())
//! ```

mod binder;
mod collision;
mod customization;
mod errors;
mod graph;
pub mod naming;
mod pipeline;
pub mod policy;
mod prune;
pub mod queries;
mod type_map;

pub use binder::OperationBinder;
pub use collision::{CollisionResolution, CollisionRule, CollisionTable};
pub use customization::Customizations;
pub use errors::{collect_service_errors, is_transport_error};
pub use graph::{GraphBuilder, ShapeGraph, ShapeTable};
pub use pipeline::{build_metadata, run, transform, Emitter};
pub use policy::{
    ModelOverride, OverrideStage, PolicyOverrides, PolicyRegistry, ProtocolPolicy,
    VirtualAddressing, WrapperShape,
};
pub use prune::{prune, rebuild_back_references, PruneReport};
pub use type_map::TypeMapper;
