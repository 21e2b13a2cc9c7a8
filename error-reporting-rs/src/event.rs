//! # Failure Events
//!
//! The inbound unit of work: a failed host operation, the request it belongs
//! to, and an optional caller-supplied payload. Events are built by the host
//! on every failure, consumed once by the reporter and then dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The error carried by a failed operation.
///
/// Only `name`, `status` and `id` drive decisions; everything else is kept
/// verbatim so the report carries the host's full error descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureError {
    /// Classification name, e.g. `PluginImplementationError`
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// HTTP-like status code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Stable error identifier, e.g. `security.token.invalid`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Any further fields the host attached
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl FailureError {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The request a failure happened in.
///
/// `input` holds routing metadata (`controller`, `action`, arguments, body)
/// and `context` holds the caller identity (`user._id`, `token`, ...). Both
/// are free-form trees; fields are read through [`crate::path`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub context: Value,
}

impl RequestDescriptor {
    pub fn new(input: Value, context: Value) -> Self {
        Self {
            id: None,
            input,
            context,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Free-form data a caller attaches to a failure.
///
/// Extras are string valued; each one is parsed as JSON when building the
/// scope and kept as raw text when it does not parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredPayload {
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
    /// A secondary request the failure should be attributed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestDescriptor>,
    /// Overrides the exception handed to the sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureError>,
}

/// A failed operation as delivered by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    pub error: FailureError,
    #[serde(default)]
    pub request: RequestDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StructuredPayload>,
}

impl FailureEvent {
    pub fn new(error: FailureError, request: RequestDescriptor) -> Self {
        Self {
            error,
            request,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: StructuredPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_event_from_host_json() {
        let event: FailureEvent = serde_json::from_value(json!({
            "error": {
                "name": "PluginImplementationError",
                "message": "boom",
                "status": 500,
                "code": 42
            },
            "request": {
                "id": "req-1",
                "input": {"controller": "auth", "action": "login"},
                "context": {"user": {"_id": "u1"}}
            }
        }))
        .unwrap();

        assert_eq!(event.error.name, "PluginImplementationError");
        assert_eq!(event.error.status, Some(500));
        assert_eq!(event.error.details.get("code"), Some(&json!(42)));
        assert_eq!(event.request.id.as_deref(), Some("req-1"));
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_error_descriptor_serializes_flat() {
        let error = FailureError::new("BadRequestError").status(400).id("api.assert.missing_argument");
        let value = serde_json::to_value(&error).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "BadRequestError",
                "status": 400,
                "id": "api.assert.missing_argument"
            })
        );
    }
}
