//! Shape graph construction
//!
//! Raw shapes reference each other by name and may be circular, so the graph
//! is built in two passes: every shape is created first, then every edge is
//! resolved against the complete table and recorded on its target's
//! `referenced_by` set.

use crate::customization::Customizations;
use crate::naming::capitalize;
use crate::type_map::TypeMapper;
use apigen_common::{
    EnumValue, ErrorTraits, Location, Operation, Result, Shape, ShapeKind, ShapeMember,
    TransformError,
};
use apigen_parser::{RawMember, RawModel, RawShape};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Name-keyed shape arena
pub type ShapeTable = BTreeMap<String, Shape>;

/// Output of the graph builder
#[derive(Debug, Clone, Default)]
pub struct ShapeGraph {
    pub shapes: ShapeTable,
    /// Shapes excluded by policy, to be removed by the pruner
    pub removed: BTreeSet<String>,
}

/// Builds the shape graph from a raw model
pub struct GraphBuilder<'a> {
    raw: &'a RawModel,
    customizations: &'a Customizations,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(raw: &'a RawModel, customizations: &'a Customizations) -> Self {
        Self {
            raw,
            customizations,
        }
    }

    /// Run both passes
    pub fn build(&self) -> Result<ShapeGraph> {
        let mut graph = self.basics_pass()?;
        self.reference_pass(&mut graph)?;

        info!(
            shapes = graph.shapes.len(),
            excluded = graph.removed.len(),
            "built shape graph"
        );
        Ok(graph)
    }

    /// Create every shape with its own attributes, no edges yet
    ///
    /// Shapes are keyed by their upper camel case name.
    fn basics_pass(&self) -> Result<ShapeGraph> {
        let mut graph = ShapeGraph::default();

        for (raw_name, raw) in &self.raw.shapes {
            let name = capitalize(raw_name);
            if graph.shapes.contains_key(&name) {
                return Err(TransformError::Parse(format!(
                    "Shape '{}' clashes with another shape named '{}'",
                    raw_name, name
                )));
            }

            let shape = self.convert_basics(&name, raw);
            if raw.is_excluded() {
                debug!(shape = %name, "shape excluded from generation");
                graph.removed.insert(name.clone());
            }
            graph.shapes.insert(name, shape);
        }

        Ok(graph)
    }

    fn convert_basics(&self, name: &str, raw: &RawShape) -> Shape {
        let kind = TypeMapper::kind_of(&raw.shape_type, !raw.enum_values.is_empty())
            .unwrap_or_else(|| {
                warn!(shape = %name, raw_type = %raw.shape_type, "unknown shape type, treating as string");
                ShapeKind::String
            });

        let mut shape = Shape::new(name, kind);
        shape.documentation = raw.documentation.clone();
        shape.min = raw.min.map(|v| v as i64);
        shape.max = raw.max.map(|v| v as i64);
        shape.flattened = raw.flattened;
        shape.sensitive = raw.sensitive;
        shape.streaming = raw.streaming;
        shape.event_stream = raw.event_stream;
        shape.event = raw.event;
        shape.payload = raw.payload.clone();
        shape.xml_namespace = raw.xml_namespace.as_ref().and_then(|ns| ns.uri.clone());
        if kind == ShapeKind::Timestamp {
            shape.timestamp_format = raw
                .timestamp_format
                .clone()
                .or_else(|| self.raw.metadata.timestamp_format.clone());
        }

        // Identifiers are sanitized later by the name resolver.
        shape.enum_values = raw
            .enum_values
            .iter()
            .map(|literal| EnumValue {
                raw: literal.clone(),
                identifier: self
                    .customizations
                    .enum_patch(name, literal)
                    .unwrap_or(literal)
                    .to_string(),
            })
            .collect();

        if raw.is_error() {
            let info = raw.error.clone().unwrap_or_default();
            shape.error = Some(ErrorTraits {
                code: info.code,
                http_status_code: info.http_status_code,
                sender_fault: info.sender_fault,
                fault: raw.fault,
                retryable: raw.retryable.is_some(),
            });
        }

        shape
    }

    /// Resolve every edge and record back-references
    fn reference_pass(&self, graph: &mut ShapeGraph) -> Result<()> {
        for (raw_name, raw) in &self.raw.shapes {
            let name = capitalize(raw_name);
            if graph.removed.contains(&name) {
                continue;
            }

            let required: BTreeSet<&str> = raw.required.iter().map(String::as_str).collect();

            for (member_name, raw_member) in raw.edges() {
                if raw_member.deprecated {
                    debug!(shape = %name, member = %member_name, "skipping deprecated member");
                    continue;
                }

                let member = convert_member(raw_member, required.contains(member_name));
                let target = graph.shapes.get_mut(&member.target).ok_or_else(|| {
                    TransformError::UnresolvedShapeReference {
                        shape: name.clone(),
                        target: raw_member.shape.clone(),
                    }
                })?;
                target.referenced_by.insert(name.clone());

                let shape = graph
                    .shapes
                    .get_mut(&name)
                    .ok_or_else(|| TransformError::UnresolvedShapeReference {
                        shape: name.clone(),
                        target: name.clone(),
                    })?;
                if member.streaming {
                    shape.streaming = true;
                }
                match (shape.kind, member_name) {
                    (ShapeKind::List, "member") => shape.list_member = Some(member),
                    (ShapeKind::Map, "key") => shape.map_key = Some(member),
                    (ShapeKind::Map, "value") => shape.map_value = Some(member),
                    _ => {
                        shape.members.insert(member_name.to_string(), member);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Streaming members are always required; header names are lower case.
fn convert_member(raw: &RawMember, required: bool) -> ShapeMember {
    let mut member = ShapeMember::new(capitalize(&raw.shape));
    member.location = parse_location(raw.location.as_deref());
    member.location_name = raw.location_name.clone();
    if member.location == Location::Header {
        member.location_name = member.location_name.map(|n| n.to_lowercase());
    }
    member.streaming = raw.streaming;
    member.required = required || raw.streaming;
    member.idempotency_token = raw.idempotency_token;
    member.flattened = raw.flattened;
    member.xml_namespace = raw.xml_namespace.as_ref().and_then(|ns| ns.uri.clone());
    member.documentation = raw.documentation.clone();
    member
}

/// Map a raw `location` to a [`Location`]; absent or unknown means body
pub fn parse_location(location: Option<&str>) -> Location {
    match location {
        Some("header") | Some("headers") => Location::Header,
        Some("querystring") => Location::QueryString,
        Some("uri") => Location::Uri,
        Some("statusCode") => Location::StatusCode,
        _ => Location::Body,
    }
}

/// Record `referrer` on every target of `shape`'s edges
pub fn link_edges(shapes: &mut ShapeTable, shape: &str, referrer: &str) {
    let targets = match shapes.get(shape) {
        Some(s) => s.targets(),
        None => return,
    };
    for target in targets {
        if let Some(t) = shapes.get_mut(&target) {
            t.referenced_by.insert(referrer.to_string());
        }
    }
}

/// Copy `source` under `new_name`, linking the copy's edges
///
/// The copy starts with an empty `referenced_by` set and without the
/// request/result role, signer or digest flag `source` may have picked up
/// when an operation bound it.
pub fn clone_shape(shapes: &mut ShapeTable, source: &str, new_name: &str) -> Option<()> {
    let mut copy = shapes.get(source)?.clone();
    copy.name = new_name.to_string();
    copy.referenced_by.clear();
    copy.is_request = false;
    copy.is_result = false;
    copy.signer = None;
    copy.computes_content_md5 = false;

    // A self-edge of the source becomes a self-edge of the copy.
    for edge in copy.edges_mut() {
        if edge.target == source {
            edge.target = new_name.to_string();
        }
    }

    shapes.insert(new_name.to_string(), copy);
    link_edges(shapes, new_name, new_name);
    Some(())
}

/// Rename a shape in place, relinking every edge and back-reference
///
/// Member targets, `referenced_by` entries and operation request, result
/// and error references naming `old` are all moved to `new`.
pub fn rename_shape(
    shapes: &mut ShapeTable,
    operations: &mut BTreeMap<String, Operation>,
    old: &str,
    new: &str,
) -> Option<()> {
    let mut shape = shapes.remove(old)?;
    shape.name = new.to_string();
    // A payload naming the shape itself follows the rename; member names do not.
    if shape.payload.as_deref() == Some(old) && !shape.members.contains_key(old) {
        shape.payload = Some(new.to_string());
    }
    shapes.insert(new.to_string(), shape);

    for s in shapes.values_mut() {
        for edge in s.edges_mut() {
            if edge.target == old {
                edge.target = new.to_string();
            }
        }
        if s.referenced_by.remove(old) {
            s.referenced_by.insert(new.to_string());
        }
    }

    for op in operations.values_mut() {
        for shape_ref in op.request.iter_mut().chain(op.result.iter_mut()) {
            if shape_ref.shape == old {
                shape_ref.shape = new.to_string();
            }
        }
        for error in op.errors.iter_mut() {
            if error == old {
                *error = new.to_string();
            }
        }
    }

    Some(())
}

/// Drop `shape` from the back-references of its targets
///
/// Targets left without any back-reference are dereferenced in turn, except
/// `roots`, which stay alive on their own. Returns the names of the shapes
/// that became unreferenced.
pub fn dereference(
    shapes: &mut ShapeTable,
    shape: &str,
    roots: &BTreeSet<String>,
) -> Vec<String> {
    let mut orphaned = Vec::new();
    let mut stack = vec![shape.to_string()];
    let mut visited = BTreeSet::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let targets = match shapes.get(&current) {
            Some(s) => s.targets(),
            None => continue,
        };
        for target in targets {
            let Some(t) = shapes.get_mut(&target) else {
                continue;
            };
            if t.referenced_by.remove(&current)
                && t.referenced_by.is_empty()
                && !roots.contains(&target)
            {
                orphaned.push(target.clone());
                stack.push(target);
            }
        }
    }

    orphaned
}
