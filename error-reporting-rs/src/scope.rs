//! # Report Scope
//!
//! Turns a [`FailureEvent`] into the user/tag/extra bundle attached to a
//! report. Missing request fields never fail the build: the user id is
//! omitted and routing fields render as [`ABSENT`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::event::{FailureError, FailureEvent, RequestDescriptor};
use crate::path;

/// Tag combining the request's controller and action
pub const CONTROLLER_ACTION_TAG: &str = "controller:action";

/// Rendering of a routing field the request does not carry
pub const ABSENT: &str = "undefined";

pub const EXTRA_REQUEST_ID: &str = "requestId";
pub const EXTRA_INPUT: &str = "input";
pub const EXTRA_CONTEXT: &str = "context";
pub const EXTRA_ERROR: &str = "error";
pub const EXTRA_REQUEST: &str = "request";

const USER_ID_PATH: &str = "user._id";

/// The reportable view of a failure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportScope {
    pub user_id: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub extras: Map<String, Value>,
}

/// A scope together with the exception the sink should record
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedFailure {
    pub scope: ReportScope,
    pub exception: FailureError,
}

/// Builds the scope for `failure`.
pub fn build(failure: &FailureEvent) -> ScopedFailure {
    let payload = failure.payload.as_ref();
    let embedded = payload.and_then(|p| p.request.as_ref());

    // An embedded request owns the identity and routing of the report
    let attributed = embedded.unwrap_or(&failure.request);

    let mut scope = ReportScope {
        user_id: path::get_string(&attributed.context, USER_ID_PATH),
        tags: BTreeMap::new(),
        extras: base_extras(failure),
    };
    scope
        .tags
        .insert(CONTROLLER_ACTION_TAG.to_string(), controller_action(attributed));

    if let Some(payload) = payload {
        if let Some(request) = embedded {
            scope
                .extras
                .insert(EXTRA_REQUEST.to_string(), to_value(request));
        }

        for (key, value) in &payload.tags {
            scope.tags.insert(key.clone(), value.clone());
        }

        for (key, raw) in &payload.extras {
            scope.extras.insert(key.clone(), parse_extra(raw));
        }
    }

    let exception = payload
        .and_then(|p| p.error.clone())
        .unwrap_or_else(|| failure.error.clone());

    ScopedFailure { scope, exception }
}

fn base_extras(failure: &FailureEvent) -> Map<String, Value> {
    let request = &failure.request;
    let mut extras = Map::new();

    if let Some(id) = &request.id {
        extras.insert(EXTRA_REQUEST_ID.to_string(), Value::String(id.clone()));
    }
    extras.insert(EXTRA_INPUT.to_string(), request.input.clone());
    extras.insert(EXTRA_CONTEXT.to_string(), request.context.clone());
    extras.insert(EXTRA_ERROR.to_string(), to_value(&failure.error));
    extras
}

fn controller_action(request: &RequestDescriptor) -> String {
    let render = |field: &str| {
        path::get_string(&request.input, field).unwrap_or_else(|| ABSENT.to_string())
    };
    format!("{}:{}", render("controller"), render("action"))
}

/// Parses a caller-supplied extra as JSON, keeping the raw text when it is
/// not valid JSON.
pub fn parse_extra(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Unable to serialize report field");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StructuredPayload;
    use serde_json::json;

    fn failure() -> FailureEvent {
        FailureEvent::new(
            FailureError::new("PluginImplementationError").message("boom"),
            RequestDescriptor::new(
                json!({"controller": "auth", "action": "login"}),
                json!({"user": {"_id": "u1"}}),
            )
            .with_id("req-1"),
        )
    }

    #[test]
    fn test_base_scope() {
        let built = build(&failure());
        let scope = built.scope;

        assert_eq!(scope.user_id.as_deref(), Some("u1"));
        assert_eq!(scope.tags[CONTROLLER_ACTION_TAG], "auth:login");
        assert_eq!(scope.extras[EXTRA_REQUEST_ID], json!("req-1"));
        assert_eq!(scope.extras[EXTRA_INPUT], json!({"controller": "auth", "action": "login"}));
        assert_eq!(scope.extras[EXTRA_CONTEXT], json!({"user": {"_id": "u1"}}));
        assert_eq!(
            scope.extras[EXTRA_ERROR],
            json!({"name": "PluginImplementationError", "message": "boom"})
        );
        assert_eq!(built.exception.name, "PluginImplementationError");
    }

    #[test]
    fn test_missing_fields_are_tolerated() {
        let event = FailureEvent::new(FailureError::new("InternalError"), RequestDescriptor::default());
        let scope = build(&event).scope;

        assert_eq!(scope.user_id, None);
        assert_eq!(scope.tags[CONTROLLER_ACTION_TAG], "undefined:undefined");
        assert!(!scope.extras.contains_key(EXTRA_REQUEST_ID));
        assert_eq!(scope.extras[EXTRA_INPUT], Value::Null);
    }

    #[test]
    fn test_caller_tags_win() {
        let payload = StructuredPayload {
            tags: BTreeMap::from([
                (CONTROLLER_ACTION_TAG.to_string(), "baz".to_string()),
                ("tenant".to_string(), "acme".to_string()),
            ]),
            ..Default::default()
        };
        let scope = build(&failure().with_payload(payload)).scope;

        assert_eq!(scope.tags[CONTROLLER_ACTION_TAG], "baz");
        assert_eq!(scope.tags["tenant"], "acme");
    }

    #[test]
    fn test_extra_parse_fallback() {
        let payload = StructuredPayload {
            extras: BTreeMap::from([
                ("plain".to_string(), "not json".to_string()),
                ("list".to_string(), "[1,2,3]".to_string()),
                ("doc".to_string(), r#"{"a": {"b": 1}}"#.to_string()),
            ]),
            ..Default::default()
        };
        let scope = build(&failure().with_payload(payload)).scope;

        assert_eq!(scope.extras["plain"], json!("not json"));
        assert_eq!(scope.extras["list"], json!([1, 2, 3]));
        assert_eq!(scope.extras["doc"], json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_embedded_request_takes_priority() {
        let embedded = RequestDescriptor::new(
            json!({"controller": "document", "action": "create"}),
            json!({"user": {"_id": "u2"}}),
        )
        .with_id("req-2");
        let payload = StructuredPayload {
            request: Some(embedded.clone()),
            ..Default::default()
        };
        let scope = build(&failure().with_payload(payload)).scope;

        assert_eq!(scope.user_id.as_deref(), Some("u2"));
        assert_eq!(scope.tags[CONTROLLER_ACTION_TAG], "document:create");
        assert_eq!(scope.extras[EXTRA_REQUEST], serde_json::to_value(&embedded).unwrap());
        // outer request stays the source of the base extras
        assert_eq!(scope.extras[EXTRA_REQUEST_ID], json!("req-1"));
    }

    #[test]
    fn test_payload_error_overrides_exception() {
        let payload = StructuredPayload {
            error: Some(FailureError::new("ExternalServiceError").status(502)),
            ..Default::default()
        };
        let built = build(&failure().with_payload(payload));

        assert_eq!(built.exception.name, "ExternalServiceError");
        assert_eq!(built.scope.extras[EXTRA_ERROR]["name"], json!("PluginImplementationError"));
    }
}
