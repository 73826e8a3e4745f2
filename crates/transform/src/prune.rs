//! Reachability pruning
//!
//! Mark-and-sweep over the reverse-edge graph. Shapes excluded by policy
//! take down every shape and operation that depends on them; whatever those
//! held exclusively is dereferenced and swept. Shapes still reachable from a
//! surviving operation or from the service error list are kept.

use crate::graph::{dereference, ShapeTable};
use apigen_common::{Operation, ServiceModel};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

/// What a pruning run removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed_operations: BTreeSet<String>,
    pub removed_shapes: BTreeSet<String>,
}

/// Remove `excluded` shapes and everything that only they kept alive
pub fn prune(model: &mut ServiceModel, excluded: &BTreeSet<String>) -> PruneReport {
    let mut report = PruneReport::default();
    let roots = model.service_error_shapes();

    let (dependent_shapes, dependent_ops) =
        mark_dependents(&mut model.shapes, &model.operations, excluded);

    for name in &dependent_shapes {
        dereference(&mut model.shapes, name, &roots);
        if model.shapes.remove(name).is_some() {
            report.removed_shapes.insert(name.clone());
        }
    }

    for op_name in &dependent_ops {
        let Some(op) = model.operations.remove(op_name) else {
            continue;
        };
        debug!(operation = %op_name, "removing operation that depends on an excluded shape");

        let held = op
            .request
            .iter()
            .chain(op.result.iter())
            .map(|r| r.shape.clone())
            .chain(op.errors.iter().cloned());
        for shape_name in held.collect::<Vec<_>>() {
            let Some(shape) = model.shapes.get_mut(&shape_name) else {
                continue;
            };
            if shape.referenced_by.remove(op_name)
                && shape.referenced_by.is_empty()
                && !roots.contains(&shape_name)
            {
                dereference(&mut model.shapes, &shape_name, &roots);
            }
        }
        report.removed_operations.insert(op_name.clone());
    }

    report
        .removed_shapes
        .extend(sweep_unreferenced(&mut model.shapes, &roots));
    report.removed_shapes.extend(sweep_unreachable(model));
    model
        .service_errors
        .retain(|e| model.shapes.contains_key(&e.shape));
    rebuild_back_references(model);

    info!(
        removed_operations = report.removed_operations.len(),
        removed_shapes = report.removed_shapes.len(),
        remaining_shapes = model.shapes.len(),
        "pruned model"
    );
    report
}

/// Walk back-references up from the excluded shapes
///
/// Returns every shape that (transitively) holds an excluded shape, the
/// excluded shapes included, and every operation reached along the way.
fn mark_dependents(
    shapes: &mut ShapeTable,
    operations: &BTreeMap<String, Operation>,
    excluded: &BTreeSet<String>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut removed_shapes = BTreeSet::new();
    let mut removed_ops = BTreeSet::new();
    let mut stack: Vec<String> = excluded.iter().cloned().collect();

    while let Some(name) = stack.pop() {
        if !removed_shapes.insert(name.clone()) {
            continue;
        }
        let Some(shape) = shapes.get_mut(&name) else {
            continue;
        };

        for referrer in std::mem::take(&mut shape.referenced_by) {
            if operations.contains_key(&referrer) {
                removed_ops.insert(referrer);
            } else if referrer != name {
                stack.push(referrer);
            }
        }
    }

    (removed_shapes, removed_ops)
}

/// Delete every non-root shape whose back-reference set is empty
fn sweep_unreferenced(shapes: &mut ShapeTable, roots: &BTreeSet<String>) -> BTreeSet<String> {
    let empty: Vec<String> = shapes
        .values()
        .filter(|s| s.referenced_by.is_empty() && !roots.contains(&s.name))
        .map(|s| s.name.clone())
        .collect();

    let mut swept: BTreeSet<String> = BTreeSet::new();
    for name in empty {
        swept.extend(dereference(shapes, &name, roots));
        swept.insert(name);
    }

    for name in &swept {
        debug!(shape = %name, "sweeping unreferenced shape");
        shapes.remove(name);
    }
    swept
}

/// Delete shapes no root reaches, e.g. self-referencing leftovers
///
/// Roots are the request, result and error shapes of every operation plus
/// the service error shapes.
fn sweep_unreachable(model: &mut ServiceModel) -> BTreeSet<String> {
    let mut queue: VecDeque<String> = model
        .operations
        .values()
        .flat_map(|op| {
            op.request
                .iter()
                .chain(op.result.iter())
                .map(|r| r.shape.clone())
                .chain(op.errors.iter().cloned())
        })
        .chain(model.service_errors.iter().map(|e| e.shape.clone()))
        .collect();

    let mut reachable = BTreeSet::new();
    while let Some(name) = queue.pop_front() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        if let Some(shape) = model.shapes.get(&name) {
            queue.extend(shape.targets());
        }
    }

    let unreachable: BTreeSet<String> = model
        .shapes
        .keys()
        .filter(|name| !reachable.contains(*name))
        .cloned()
        .collect();
    for name in &unreachable {
        debug!(shape = %name, "sweeping unreachable shape");
        model.shapes.remove(name);
    }
    unreachable
}

/// Recompute every `referenced_by` set from the surviving edges
///
/// After this pass a name is in `S.referenced_by` exactly when that shape or
/// operation holds an edge to `S`. Service error shapes count as referenced
/// even without a referrer.
pub fn rebuild_back_references(model: &mut ServiceModel) {
    let roots = model.service_error_shapes();
    let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for op in model.operations.values() {
        let held = op
            .request
            .iter()
            .chain(op.result.iter())
            .map(|r| &r.shape)
            .chain(op.errors.iter());
        for shape in held {
            index
                .entry(shape.clone())
                .or_default()
                .insert(op.name.clone());
        }
    }

    for shape in model.shapes.values() {
        for target in shape.targets() {
            index.entry(target).or_default().insert(shape.name.clone());
        }
    }

    for shape in model.shapes.values_mut() {
        shape.referenced_by = index.remove(&shape.name).unwrap_or_default();
        shape.is_referenced = !shape.referenced_by.is_empty() || roots.contains(&shape.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apigen_common::{HttpBinding, RequestUri, Shape, ShapeKind, ShapeMember, ShapeRef};
    use tracing_test::traced_test;

    fn structure(name: &str, members: &[(&str, &str)]) -> Shape {
        let mut shape = Shape::new(name, ShapeKind::Structure);
        for (member, target) in members {
            shape
                .members
                .insert(member.to_string(), ShapeMember::new(*target));
        }
        shape
    }

    fn operation(name: &str, request: Option<&str>, result: Option<&str>) -> Operation {
        Operation {
            name: name.to_string(),
            documentation: None,
            http: HttpBinding {
                method: "POST".to_string(),
                request_uri: RequestUri::parse("/").unwrap(),
                response_code: None,
            },
            request: request.map(ShapeRef::new),
            result: result.map(ShapeRef::new),
            errors: Vec::new(),
            auth_type: Default::default(),
            authorizer_name: None,
            http_checksum_required: false,
            virtual_addressing: false,
        }
    }

    fn model(shapes: Vec<Shape>, operations: Vec<Operation>) -> ServiceModel {
        let mut model = ServiceModel {
            shapes: shapes.into_iter().map(|s| (s.name.clone(), s)).collect(),
            operations: operations
                .into_iter()
                .map(|o| (o.name.clone(), o))
                .collect(),
            ..Default::default()
        };
        rebuild_back_references(&mut model);
        model
    }

    #[test]
    fn test_partially_shared_shape_is_retained() {
        let mut model = model(
            vec![
                structure("StreamRequest", &[("Id", "Id")]),
                structure("StreamResult", &[("Events", "EventStream")]),
                structure("GetRequest", &[("Id", "Id")]),
                structure("EventStream", &[]),
                Shape::new("Id", ShapeKind::String),
            ],
            vec![
                operation("Stream", Some("StreamRequest"), Some("StreamResult")),
                operation("Get", Some("GetRequest"), None),
            ],
        );

        let excluded = BTreeSet::from(["EventStream".to_string()]);
        let report = prune(&mut model, &excluded);

        assert_eq!(
            report.removed_operations,
            BTreeSet::from(["Stream".to_string()])
        );
        assert!(!model.shapes.contains_key("StreamRequest"));
        assert!(!model.shapes.contains_key("StreamResult"));
        assert!(!model.shapes.contains_key("EventStream"));
        assert_eq!(
            model.shapes["Id"].referenced_by,
            BTreeSet::from(["GetRequest".to_string()])
        );
        assert!(model.operations.contains_key("Get"));
    }

    #[test]
    fn test_intermediate_holders_are_removed() {
        let mut model = model(
            vec![
                structure("WatchResult", &[("Wrapper", "Wrapper")]),
                structure("Wrapper", &[("Events", "Events"), ("Note", "Note")]),
                structure("Events", &[]),
                Shape::new("Note", ShapeKind::String),
            ],
            vec![operation("Watch", None, Some("WatchResult"))],
        );

        let report = prune(&mut model, &BTreeSet::from(["Events".to_string()]));

        assert!(model.operations.is_empty());
        assert!(model.shapes.is_empty());
        assert!(report.removed_shapes.contains("Wrapper"));
        assert!(report.removed_shapes.contains("Note"));
    }

    #[test]
    fn test_unreferenced_and_cyclic_shapes_are_swept() {
        let mut model = model(
            vec![
                structure("PingRequest", &[]),
                structure("Orphan", &[("Leaf", "Leaf")]),
                Shape::new("Leaf", ShapeKind::String),
                structure("Loop", &[("Next", "Loop")]),
            ],
            vec![operation("Ping", Some("PingRequest"), None)],
        );

        let report = prune(&mut model, &BTreeSet::new());

        assert!(report.removed_operations.is_empty());
        assert_eq!(
            model.shapes.keys().collect::<Vec<_>>(),
            vec!["PingRequest"]
        );
        assert!(model.shapes["PingRequest"].is_referenced);
    }

    #[test]
    fn test_recursive_shapes_reachable_from_operations_survive() {
        let mut model = model(
            vec![
                structure("TreeResult", &[("Root", "Node")]),
                structure("Node", &[("Children", "NodeList")]),
                Shape::new("NodeList", ShapeKind::List),
            ],
            vec![operation("Tree", None, Some("TreeResult"))],
        );
        model.shapes.get_mut("NodeList").unwrap().list_member = Some(ShapeMember::new("Node"));
        rebuild_back_references(&mut model);

        prune(&mut model, &BTreeSet::new());

        assert_eq!(model.shapes.len(), 3);
        assert_eq!(
            model.shapes["Node"].referenced_by,
            BTreeSet::from(["NodeList".to_string(), "TreeResult".to_string()])
        );
    }

    #[test]
    fn test_service_errors_outlive_their_operations() {
        let mut model = model(
            vec![
                structure("TailResult", &[("Events", "Events")]),
                structure("Events", &[]),
                structure("Throttled", &[("Message", "Message")]),
                Shape::new("Message", ShapeKind::String),
            ],
            vec![Operation {
                errors: vec!["Throttled".to_string()],
                ..operation("Tail", None, Some("TailResult"))
            }],
        );
        model.service_errors.push(apigen_common::ServiceError {
            name: "Throttled".to_string(),
            shape: "Throttled".to_string(),
            http_status_code: Some(429),
            is_retryable: true,
            is_fault: false,
            is_client_exception: true,
        });

        let report = prune(&mut model, &BTreeSet::from(["Events".to_string()]));

        assert_eq!(report.removed_operations, BTreeSet::from(["Tail".to_string()]));
        assert_eq!(
            model.shapes.keys().collect::<Vec<_>>(),
            vec!["Message", "Throttled"]
        );
        let throttled = &model.shapes["Throttled"];
        assert!(throttled.referenced_by.is_empty());
        assert!(throttled.is_referenced);
        assert_eq!(
            model.shapes["Message"].referenced_by,
            BTreeSet::from(["Throttled".to_string()])
        );
        assert_eq!(model.service_errors.len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_removed_operations_are_logged() {
        let mut model = model(
            vec![
                structure("TailResult", &[("Events", "Events")]),
                structure("Events", &[]),
            ],
            vec![operation("Tail", None, Some("TailResult"))],
        );

        prune(&mut model, &BTreeSet::from(["Events".to_string()]));

        assert!(logs_contain("removing operation that depends on an excluded shape"));
        assert!(logs_contain("pruned model"));
    }
}
