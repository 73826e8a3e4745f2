//! Service error synthesis
//!
//! Collects the errors declared by bound operations into the model-wide,
//! name-deduplicated error list. Transport-level errors every client
//! handles generically are left out.

use crate::customization::Customizations;
use crate::graph::ShapeTable;
use crate::naming::error_name;
use apigen_common::{Operation, ServiceError};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Errors handled by every client regardless of service
static TRANSPORT_ERRORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "IncompleteSignature",
        "InternalFailure",
        "InvalidAction",
        "InvalidClientTokenId",
        "InvalidParameterCombination",
        "InvalidParameterValue",
        "InvalidQueryParameter",
        "MalformedQueryString",
        "MissingAction",
        "MissingAuthenticationToken",
        "MissingParameter",
        "OptInRequired",
        "RequestExpired",
        "ServiceUnavailable",
        "Throttling",
        "Validation",
        "AccessDenied",
        "ResourceNotFound",
        "UnrecognizedClient",
        "SlowDown",
        "RequestTimeTooSkewed",
        "InvalidSignature",
        "SignatureDoesNotMatch",
        "InvalidAccessKeyId",
        "RequestTimeout",
        "NetworkConnection",
    ]
    .into_iter()
    .collect()
});

/// Whether an error name is handled at the transport level
pub fn is_transport_error(name: &str) -> bool {
    TRANSPORT_ERRORS.contains(name)
}

/// Build the service error list from the operations' error references
///
/// The listed shapes become roots of the shape graph; see
/// [`ServiceModel::service_error_shapes`](apigen_common::ServiceModel::service_error_shapes).
pub fn collect_service_errors(
    shapes: &mut ShapeTable,
    operations: &BTreeMap<String, Operation>,
    customizations: &Customizations,
) -> Vec<ServiceError> {
    let mut errors: Vec<ServiceError> = Vec::new();

    for op in operations.values() {
        for shape_name in &op.errors {
            let Some(shape) = shapes.get_mut(shape_name) else {
                continue;
            };

            let name = error_name(shape_name).to_string();
            if is_transport_error(&name) {
                debug!(error = %name, "filtering transport-level error");
                continue;
            }
            if errors.iter().any(|e| e.name == name) {
                continue;
            }

            let traits = shape.error.clone().unwrap_or_default();
            let status = traits.http_status_code.unwrap_or_default();
            let is_fault = traits.fault || status >= 500;
            // Coded errors not blamed on the caller are retryable.
            let server_side = traits.code.is_some() && (status >= 500 || !traits.sender_fault);
            let is_retryable = traits.retryable
                || server_side
                || customizations.retryable_errors.contains(&name)
                || customizations.retryable_errors.contains(shape_name);
            if let Some(declared) = shape.error.as_mut() {
                declared.retryable = is_retryable;
            }

            errors.push(ServiceError {
                name,
                shape: shape_name.clone(),
                http_status_code: traits.http_status_code,
                is_retryable,
                is_fault,
                is_client_exception: !is_fault,
            });
        }
    }

    info!(errors = errors.len(), "collected service errors");
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::OperationBinder;
    use crate::collision::CollisionTable;
    use crate::graph::GraphBuilder;
    use apigen_parser::ModelLoader;

    const ERRORS: &str = r#"{
        "operations": {
            "PutItem": {
                "name": "PutItem",
                "errors": [
                    { "shape": "ConditionalCheckFailedException" },
                    { "shape": "ProvisionedThroughputExceededException" },
                    { "shape": "ThrottlingException" },
                    { "shape": "InternalServerError" }
                ]
            },
            "GetItem": {
                "name": "GetItem",
                "errors": [ { "shape": "ProvisionedThroughputExceededException" } ]
            }
        },
        "shapes": {
            "ConditionalCheckFailedException": {
                "type": "structure",
                "members": { "message": { "shape": "ErrorMessage" } },
                "exception": true,
                "error": { "httpStatusCode": 400, "senderFault": true }
            },
            "ProvisionedThroughputExceededException": {
                "type": "structure",
                "members": {},
                "exception": true,
                "retryable": { "throttling": true }
            },
            "ThrottlingException": { "type": "structure", "members": {}, "exception": true },
            "InternalServerError": {
                "type": "structure",
                "members": {},
                "exception": true,
                "fault": true,
                "error": { "httpStatusCode": 500 }
            },
            "ErrorMessage": { "type": "string" }
        }
    }"#;

    #[test]
    fn test_collect_deduplicates_and_filters() {
        let raw = ModelLoader::from_json(ERRORS).unwrap().into_model();
        let custom = Customizations::default();
        let mut graph = GraphBuilder::new(&raw, &custom).build().unwrap();
        let ops = OperationBinder::new(&raw, &custom, CollisionTable::empty())
            .bind(&mut graph.shapes)
            .unwrap();

        let errors = collect_service_errors(&mut graph.shapes, &ops, &custom);
        let names: Vec<&str> = errors.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ProvisionedThroughputExceeded",
                "ConditionalCheckFailed",
                "InternalServerError"
            ]
        );

        let throughput = &errors[0];
        assert!(throughput.is_retryable);
        assert_eq!(throughput.shape, "ProvisionedThroughputExceededException");

        let conditional = &errors[1];
        assert_eq!(conditional.http_status_code, Some(400));
        assert!(conditional.is_client_exception);
        assert!(!conditional.is_retryable);

        assert!(errors[2].is_fault);

        assert!(!errors.iter().any(|e| e.shape == "ThrottlingException"));
        assert_eq!(
            graph.shapes["ProvisionedThroughputExceededException"]
                .referenced_by
                .iter()
                .collect::<Vec<_>>(),
            vec!["GetItem", "PutItem"]
        );
    }

    #[test]
    fn test_customized_retryable_errors() {
        let raw = ModelLoader::from_json(ERRORS).unwrap().into_model();
        let custom = Customizations::from_yaml("retryable_errors: [ConditionalCheckFailed]").unwrap();
        let mut graph = GraphBuilder::new(&raw, &custom).build().unwrap();
        let ops = OperationBinder::new(&raw, &custom, CollisionTable::empty())
            .bind(&mut graph.shapes)
            .unwrap();

        let errors = collect_service_errors(&mut graph.shapes, &ops, &custom);
        let conditional = errors
            .iter()
            .find(|e| e.name == "ConditionalCheckFailed")
            .unwrap();
        assert!(conditional.is_retryable);
    }

    #[test]
    fn test_coded_server_errors_are_retryable() {
        let raw = ModelLoader::from_json(
            r#"{
            "operations": {
                "SendMessage": {
                    "name": "SendMessage",
                    "errors": [
                        { "shape": "QueueBusy" },
                        { "shape": "ServiceOverloaded" },
                        { "shape": "InvalidMessageContents" },
                        { "shape": "KmsUnavailable" }
                    ]
                }
            },
            "shapes": {
                "QueueBusy": {
                    "type": "structure", "members": {}, "exception": true,
                    "error": { "code": "AWS.SimpleQueueService.QueueBusy", "httpStatusCode": 400 }
                },
                "ServiceOverloaded": {
                    "type": "structure", "members": {}, "exception": true,
                    "error": { "code": "Overloaded", "httpStatusCode": 503, "senderFault": true }
                },
                "InvalidMessageContents": {
                    "type": "structure", "members": {}, "exception": true,
                    "error": { "code": "InvalidMessageContents", "httpStatusCode": 400, "senderFault": true }
                },
                "KmsUnavailable": {
                    "type": "structure", "members": {}, "exception": true,
                    "error": { "httpStatusCode": 400 }
                }
            }
        }"#,
        )
        .unwrap()
        .into_model();
        let custom = Customizations::default();
        let mut graph = GraphBuilder::new(&raw, &custom).build().unwrap();
        let ops = OperationBinder::new(&raw, &custom, CollisionTable::empty())
            .bind(&mut graph.shapes)
            .unwrap();

        let errors = collect_service_errors(&mut graph.shapes, &ops, &custom);
        let retryable = |name: &str| errors.iter().find(|e| e.name == name).unwrap().is_retryable;

        assert!(retryable("QueueBusy"));
        assert!(retryable("ServiceOverloaded"));
        assert!(!retryable("InvalidMessageContents"));
        assert!(!retryable("KmsUnavailable"));
        assert!(graph.shapes["QueueBusy"].error.as_ref().unwrap().retryable);
    }

    #[test]
    fn test_transport_errors() {
        assert!(is_transport_error("Throttling"));
        assert!(is_transport_error("SignatureDoesNotMatch"));
        assert!(!is_transport_error("NoSuchBucket"));
    }
}
