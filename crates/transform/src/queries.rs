//! Shape queries used by emitters
//!
//! Predicates answer questions about a shape's members directly, without
//! walking into nested shapes unless the name says so.

use apigen_common::{Location, ServiceModel, Shape, ShapeKind};
use rayon::prelude::*;

fn member_kinds<'a>(
    model: &'a ServiceModel,
    shape: &'a Shape,
) -> impl Iterator<Item = ShapeKind> + 'a {
    shape
        .members
        .values()
        .filter_map(|m| model.shapes.get(&m.target))
        .map(|s| s.kind)
}

fn has_location(shape: &Shape, location: Location) -> bool {
    shape.members.values().any(|m| m.location == location)
}

pub fn has_blob_members(model: &ServiceModel, shape: &Shape) -> bool {
    member_kinds(model, shape).any(|k| k == ShapeKind::Blob)
}

pub fn has_header_members(shape: &Shape) -> bool {
    has_location(shape, Location::Header)
}

pub fn has_query_string_members(shape: &Shape) -> bool {
    has_location(shape, Location::QueryString)
}

pub fn has_status_code_member(shape: &Shape) -> bool {
    has_location(shape, Location::StatusCode)
}

pub fn has_uri_members(shape: &Shape) -> bool {
    has_location(shape, Location::Uri)
}

/// A member streams its body, or the shape itself is a streaming payload
pub fn has_streaming_member(shape: &Shape) -> bool {
    shape.streaming || shape.members.values().any(|m| m.streaming)
}

pub fn has_payload_member(shape: &Shape) -> bool {
    shape
        .payload
        .as_ref()
        .is_some_and(|p| shape.members.contains_key(p))
}

/// A member targets another structure
pub fn has_nested_structure(model: &ServiceModel, shape: &Shape) -> bool {
    member_kinds(model, shape).any(|k| k == ShapeKind::Structure)
}

pub fn has_idempotency_token(shape: &Shape) -> bool {
    shape.members.values().any(|m| m.idempotency_token)
}

/// Names of all shapes matching `predicate`, sorted
pub fn shapes_where<F>(model: &ServiceModel, predicate: F) -> Vec<String>
where
    F: Fn(&ServiceModel, &Shape) -> bool + Sync,
{
    let mut names: Vec<String> = model
        .shapes
        .par_iter()
        .filter(|(_, shape)| predicate(model, shape))
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}
