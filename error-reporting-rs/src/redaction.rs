//! # Report Redaction
//!
//! Masks sensitive values in a report's extras before it leaves the process.
//! Rules are dotted paths rooted at the extras map (`context.token.jwt`
//! addresses `extras["context"]["token"]["jwt"]`). A rule that resolves to
//! nothing is skipped, so the same rule set can be applied to reports of
//! any shape.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::path;
use crate::sink::{BeforeSend, OutboundEvent};

/// Replacement written over every masked value
pub const FILTERED: &str = "[Filtered]";

// Rules applied to every report, whatever the configuration says
static BUILTIN_RULES: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "context.token._id",
        "context.token.jwt",
        "input.jwt",
        "input.body.password",
        "request.context.token._id",
        "request.context.token.jwt",
        "request.input.jwt",
        "request.input.body.password",
    ]
    .iter()
    .map(|rule| rule.to_string())
    .collect()
});

/// Built-in rule paths.
pub fn builtin_rules() -> &'static [String] {
    &BUILTIN_RULES
}

/// Applies a fixed set of redaction rules.
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<String>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl Redactor {
    /// Builds a redactor from the built-in rules extended with `extra_rules`.
    ///
    /// Configured rules never replace built-in ones; duplicates and blank
    /// entries are dropped.
    pub fn new<I, S>(extra_rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let rules = BUILTIN_RULES
            .iter()
            .cloned()
            .chain(extra_rules.into_iter().map(Into::into))
            .map(|rule| rule.trim().to_string())
            .filter(|rule| !rule.is_empty())
            .filter(|rule| seen.insert(rule.clone()))
            .collect();

        Self { rules }
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Masks every rule path present in `extras`. Returns how many values
    /// were replaced.
    pub fn redact(&self, extras: &mut Map<String, Value>) -> usize {
        redact(extras, &self.rules)
    }

    /// Same as [`Redactor::redact`] for a value that may or may not be an
    /// object; non-objects are left untouched.
    pub fn redact_value(&self, report: &mut Value) -> usize {
        match report {
            Value::Object(map) => self.redact(map),
            _ => 0,
        }
    }
}

impl BeforeSend for Redactor {
    fn before_send(&self, mut event: OutboundEvent) -> Option<OutboundEvent> {
        let masked = self.redact(&mut event.extra);
        if masked > 0 {
            tracing::debug!(event_id = %event.event_id, masked, "Redacted outbound event");
        }
        Some(event)
    }
}

/// Masks the value at each of `rules` in `extras`.
pub fn redact<S: AsRef<str>>(extras: &mut Map<String, Value>, rules: &[S]) -> usize {
    let mut masked = 0;
    for rule in rules {
        let rule = rule.as_ref();
        let present = path::get_in(extras, rule).map_or(false, is_maskable);
        if present && path::set_existing(extras, rule, Value::String(FILTERED.to_string())) {
            masked += 1;
        }
    }
    masked
}

// Only truthy values are masked: null, false, zero and "" stay as they are
fn is_maskable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extras(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_builtin_rules_mask_tokens() {
        let mut report = extras(json!({
            "context": {"token": {"_id": "tok-1", "jwt": "eyJ.abc.def"}, "user": {"_id": "u1"}},
            "input": {"jwt": "eyJ.ghi.jkl", "controller": "auth"}
        }));

        let masked = Redactor::default().redact(&mut report);

        assert_eq!(masked, 3);
        assert_eq!(report["context"]["token"]["_id"], json!(FILTERED));
        assert_eq!(report["context"]["token"]["jwt"], json!(FILTERED));
        assert_eq!(report["input"]["jwt"], json!(FILTERED));
        assert_eq!(report["context"]["user"]["_id"], json!("u1"));
        assert_eq!(report["input"]["controller"], json!("auth"));
    }

    #[test]
    fn test_configured_rules_extend_builtins() {
        let redactor = Redactor::new(["input.body.creditCard", "context.token.jwt"]);

        assert!(redactor.rules().iter().any(|r| r == "context.token._id"));
        assert!(redactor.rules().iter().any(|r| r == "input.body.creditCard"));
        assert_eq!(
            redactor.rules().iter().filter(|r| *r == "context.token.jwt").count(),
            1
        );

        let mut report = extras(json!({"input": {"body": {"creditCard": "4111", "amount": 3}}}));
        redactor.redact(&mut report);

        assert_eq!(report["input"]["body"]["creditCard"], json!(FILTERED));
        assert_eq!(report["input"]["body"]["amount"], json!(3));
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let redactor = Redactor::new(["input.body.secret"]);
        let mut once = extras(json!({
            "context": {"token": {"jwt": "eyJ"}},
            "input": {"body": {"secret": {"nested": true}}}
        }));
        redactor.redact(&mut once);

        let mut twice = once.clone();
        redactor.redact(&mut twice);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_matching_paths_leaves_report_unchanged() {
        let original = extras(json!({
            "requestId": "req-1",
            "input": {"controller": "document", "action": "create"},
            "context": {"user": {"_id": "u1"}, "token": null}
        }));
        let mut report = original.clone();

        let masked = Redactor::default().redact(&mut report);

        assert_eq!(masked, 0);
        assert_eq!(report, original);
    }

    #[test]
    fn test_empty_values_are_not_masked() {
        let mut report = extras(json!({"input": {"jwt": ""}, "context": {"token": {"jwt": null}}}));
        let masked = Redactor::default().redact(&mut report);

        assert_eq!(masked, 0);
        assert_eq!(report["input"]["jwt"], json!(""));
        assert_eq!(report["context"]["token"]["jwt"], Value::Null);
    }

    #[test]
    fn test_falsy_values_are_not_masked() {
        let mut report = extras(json!({
            "input": {"jwt": false, "body": {"password": 0}},
            "context": {"token": {"_id": 0.0, "jwt": {}}}
        }));
        let masked = Redactor::default().redact(&mut report);

        assert_eq!(masked, 1);
        assert_eq!(report["input"]["jwt"], json!(false));
        assert_eq!(report["input"]["body"]["password"], json!(0));
        assert_eq!(report["context"]["token"]["_id"], json!(0.0));
        assert_eq!(report["context"]["token"]["jwt"], json!(FILTERED));
    }

    #[test]
    fn test_embedded_request_is_masked() {
        let mut report = extras(json!({
            "input": {"jwt": "outer"},
            "request": {
                "input": {"jwt": "eyJ.a.b", "body": {"password": "hunter2"}},
                "context": {"token": {"_id": "t1", "jwt": "eyJ.c.d"}, "user": {"_id": "u1"}}
            }
        }));
        let masked = Redactor::default().redact(&mut report);

        assert_eq!(masked, 5);
        assert_eq!(report["request"]["input"]["jwt"], json!(FILTERED));
        assert_eq!(report["request"]["input"]["body"]["password"], json!(FILTERED));
        assert_eq!(report["request"]["context"]["token"]["_id"], json!(FILTERED));
        assert_eq!(report["request"]["context"]["token"]["jwt"], json!(FILTERED));
        assert_eq!(report["request"]["context"]["user"]["_id"], json!("u1"));
    }

    #[test]
    fn test_redact_value_ignores_non_objects() {
        let mut report = json!(["context", "token"]);
        assert_eq!(Redactor::default().redact_value(&mut report), 0);
        assert_eq!(report, json!(["context", "token"]));
    }
}
