//! Operation binding
//!
//! Converts raw operations into [`Operation`]s and gives every request and
//! result shape its canonical `<Operation>Request` / `<Operation>Result`
//! identity. A shape is renamed in place when nothing else refers to it and
//! cloned otherwise; a name already taken by a different shape must be
//! listed in the collision table.

use crate::collision::{CollisionResolution, CollisionTable};
use crate::customization::Customizations;
use crate::graph::{clone_shape, dereference, rename_shape, ShapeTable};
use crate::naming::capitalize;
use apigen_common::{
    AuthType, HttpBinding, Operation, RequestUri, Result, ShapeRef, Signer, TransformError,
};
use apigen_parser::{RawModel, RawOperation, RawShapeRef};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Which side of an operation a shape is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Request,
    Result,
}

impl Role {
    fn suffix(self) -> &'static str {
        match self {
            Role::Request => "Request",
            Role::Result => "Result",
        }
    }
}

/// Binds raw operations onto a shape table
pub struct OperationBinder<'a> {
    raw: &'a RawModel,
    customizations: &'a Customizations,
    collisions: CollisionTable,
    /// Raw shape name → name it was moved to by an in-place rename
    renamed: HashMap<String, String>,
    operations: BTreeMap<String, Operation>,
}

impl<'a> OperationBinder<'a> {
    pub fn new(
        raw: &'a RawModel,
        customizations: &'a Customizations,
        collisions: CollisionTable,
    ) -> Self {
        Self {
            raw,
            customizations,
            collisions,
            renamed: HashMap::new(),
            operations: BTreeMap::new(),
        }
    }

    /// Bind every live operation, returning the operation table
    pub fn bind(mut self, shapes: &mut ShapeTable) -> Result<BTreeMap<String, Operation>> {
        let raw = self.raw;
        let mut skipped = 0;

        for (key, raw_op) in &raw.operations {
            let name = raw_op.name.clone().unwrap_or_else(|| key.clone());

            if raw_op.deprecated || self.customizations.is_excluded(&name) {
                debug!(operation = %name, "dropping operation before binding");
                skipped += 1;
                continue;
            }

            let operation = self.bind_operation(shapes, &name, raw_op)?;
            self.operations.insert(name, operation);
        }

        strip_streaming_content_type(shapes, &self.operations);

        info!(
            operations = self.operations.len(),
            skipped, "bound operations"
        );
        Ok(self.operations)
    }

    fn bind_operation(
        &mut self,
        shapes: &mut ShapeTable,
        name: &str,
        raw_op: &RawOperation,
    ) -> Result<Operation> {
        let request_uri = RequestUri::parse(raw_op.http.request_uri.as_deref().unwrap_or("/"))?;
        let (auth_type, signer) = auth_for(name, raw_op)?;

        let request = match &raw_op.input {
            Some(input) => {
                let shape_ref = self.bind_shape(shapes, name, input, Role::Request)?;
                if let Some(shape) = shapes.get_mut(&shape_ref.shape) {
                    shape.is_request = true;
                    shape.signer = Some(signer.clone());
                    // A named input element is serialized as the whole body.
                    let named = input.location_name.as_deref().is_some_and(|n| !n.is_empty());
                    if named && shape.payload.as_deref().map_or(true, str::is_empty) {
                        shape.payload = Some(shape_ref.shape.clone());
                    }
                }
                Some(shape_ref)
            }
            None => None,
        };

        let result = match &raw_op.output {
            Some(output) => {
                let shape_ref = self.bind_shape(shapes, name, output, Role::Result)?;
                if let Some(shape) = shapes.get_mut(&shape_ref.shape) {
                    shape.is_result = true;
                }
                Some(shape_ref)
            }
            None => None,
        };

        let mut errors = Vec::with_capacity(raw_op.errors.len());
        for error_ref in &raw_op.errors {
            let current = self.current_name(&capitalize(&error_ref.shape));
            let shape = shapes.get_mut(&current).ok_or_else(|| {
                TransformError::UnresolvedShapeReference {
                    shape: name.to_string(),
                    target: error_ref.shape.clone(),
                }
            })?;
            shape.referenced_by.insert(name.to_string());
            if !errors.contains(&current) {
                errors.push(current);
            }
        }

        Ok(Operation {
            name: name.to_string(),
            documentation: raw_op.documentation.clone(),
            http: HttpBinding {
                method: raw_op
                    .http
                    .method
                    .clone()
                    .unwrap_or_else(|| "POST".to_string()),
                request_uri,
                response_code: raw_op.http.response_code,
            },
            request,
            result,
            errors,
            auth_type,
            authorizer_name: raw_op.authorizer.clone(),
            http_checksum_required: raw_op.http_checksum_required,
            virtual_addressing: false,
        })
    }

    /// Give the shape behind `raw_ref` its canonical name for `operation`
    fn bind_shape(
        &mut self,
        shapes: &mut ShapeTable,
        operation: &str,
        raw_ref: &RawShapeRef,
        role: Role,
    ) -> Result<ShapeRef> {
        let wanted = format!("{}{}", operation, role.suffix());
        let source = self.current_name(&capitalize(&raw_ref.shape));

        if !shapes.contains_key(&source) {
            return Err(TransformError::UnresolvedShapeReference {
                shape: operation.to_string(),
                target: raw_ref.shape.clone(),
            });
        }

        if source != wanted {
            let carried = if shapes.contains_key(&wanted) {
                self.resolve_collision(shapes, &wanted, operation)?
            } else {
                BTreeSet::new()
            };

            let shared = shapes
                .get(&source)
                .is_some_and(|s| !s.referenced_by.is_empty());

            if shared {
                debug!(operation, from = %source, to = %wanted, "cloning shared shape");
                clone_shape(shapes, &source, &wanted);
                self.restore_declared_attributes(shapes, &wanted, raw_ref);
            } else {
                debug!(operation, from = %source, to = %wanted, "renaming shape");
                rename_shape(shapes, &mut self.operations, &source, &wanted);
                self.record_rename(&source, &wanted);
            }

            if let Some(shape) = shapes.get_mut(&wanted) {
                shape.referenced_by.extend(carried);
            }
        }

        let shape = shapes
            .get_mut(&wanted)
            .ok_or_else(|| TransformError::UnresolvedShapeReference {
                shape: operation.to_string(),
                target: wanted.clone(),
            })?;
        shape.referenced_by.insert(operation.to_string());

        Ok(ShapeRef {
            shape: wanted,
            location_name: raw_ref.location_name.clone(),
            xml_namespace: raw_ref.xml_namespace.as_ref().and_then(|ns| ns.uri.clone()),
            result_wrapper: raw_ref.result_wrapper.clone(),
            documentation: raw_ref.documentation.clone(),
        })
    }

    /// Reset a clone's payload and namespace to what its raw shape declares
    ///
    /// The clone source may already be another operation's request or
    /// result, carrying attributes that binding added to it.
    fn restore_declared_attributes(
        &self,
        shapes: &mut ShapeTable,
        name: &str,
        raw_ref: &RawShapeRef,
    ) {
        let Some(declared) = self.raw.shapes.get(&raw_ref.shape) else {
            return;
        };
        let Some(shape) = shapes.get_mut(name) else {
            return;
        };
        shape.payload = declared.payload.clone();
        shape.xml_namespace = declared.xml_namespace.as_ref().and_then(|ns| ns.uri.clone());
    }

    /// Free up `wanted` according to the collision table
    ///
    /// Returns back-references the operation's shape inherits from a dropped
    /// shape.
    fn resolve_collision(
        &mut self,
        shapes: &mut ShapeTable,
        wanted: &str,
        operation: &str,
    ) -> Result<BTreeSet<String>> {
        let conflict = || TransformError::UnhandledNameConflict {
            name: wanted.to_string(),
            operation: operation.to_string(),
        };

        match self.collisions.resolve(wanted, operation).cloned() {
            Some(CollisionResolution::RenameExisting { new_name }) => {
                if shapes.contains_key(&new_name) {
                    return Err(TransformError::UnhandledNameConflict {
                        name: new_name,
                        operation: operation.to_string(),
                    });
                }
                info!(operation, shape = %wanted, to = %new_name, "renaming colliding shape");
                rename_shape(shapes, &mut self.operations, wanted, &new_name);
                self.record_rename(wanted, &new_name);
                Ok(BTreeSet::new())
            }
            Some(CollisionResolution::DropExisting) => {
                warn!(operation, shape = %wanted, "dropping colliding shape");
                dereference(shapes, wanted, &BTreeSet::new());
                let dropped = shapes.remove(wanted).ok_or_else(conflict)?;
                Ok(dropped.referenced_by)
            }
            None => Err(conflict()),
        }
    }

    /// Current name of a shape that may have been renamed earlier
    fn current_name(&self, raw_name: &str) -> String {
        self.renamed
            .get(raw_name)
            .cloned()
            .unwrap_or_else(|| raw_name.to_string())
    }

    fn record_rename(&mut self, from: &str, to: &str) {
        for current in self.renamed.values_mut() {
            if current == from {
                *current = to.to_string();
            }
        }
        self.renamed.insert(from.to_string(), to.to_string());
    }
}

/// Drop `ContentType` members from requests that stream their body
///
/// Streaming requests carry the content type as part of the body stream.
fn strip_streaming_content_type(
    shapes: &mut ShapeTable,
    operations: &BTreeMap<String, Operation>,
) {
    let requests: BTreeSet<String> = operations
        .values()
        .filter_map(|op| op.request.as_ref().map(|r| r.shape.clone()))
        .collect();

    for name in requests {
        let Some(shape) = shapes.get_mut(&name) else {
            continue;
        };
        if !shape.members.values().any(|m| m.streaming) {
            continue;
        }

        let mut dropped = Vec::new();
        for member_name in ["ContentType", "contentType"] {
            if let Some(member) = shape.members.shift_remove(member_name) {
                debug!(shape = %name, member = member_name, "removing content type from streaming request");
                dropped.push(member.target);
            }
        }
        let remaining = shape.targets();
        for target in dropped.into_iter().filter(|t| !remaining.contains(t)) {
            if let Some(t) = shapes.get_mut(&target) {
                t.referenced_by.remove(&name);
            }
        }
    }
}

/// Auth type and request signer of an operation
fn auth_for(operation: &str, raw_op: &RawOperation) -> Result<(AuthType, Signer)> {
    match raw_op.auth_type.as_deref() {
        None | Some("v4") => Ok((AuthType::V4, Signer::Default)),
        Some("v4-unsigned-body") => Ok((AuthType::V4UnsignedBody, Signer::UnsignedBody)),
        Some("none") => Ok((AuthType::None, Signer::Anonymous)),
        Some("custom") => {
            let authorizer = raw_op.authorizer.clone().ok_or_else(|| {
                TransformError::Parse(format!(
                    "Operation '{}' uses custom auth without an authorizer",
                    operation
                ))
            })?;
            Ok((AuthType::Custom, Signer::Custom(authorizer)))
        }
        Some(other) => {
            warn!(operation, authtype = other, "unknown auth type, using default signer");
            Ok((AuthType::V4, Signer::Default))
        }
    }
}
