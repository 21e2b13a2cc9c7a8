//! # Report Sinks
//!
//! The boundary to the error-tracking backend. A sink is configured once
//! with [`SinkOptions`] and then receives one [`OutboundEvent`] per admitted
//! failure. Sinks must run the registered [`BeforeSend`] hook on every
//! outbound event, including events they capture on their own.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::event::FailureError;
use crate::types::SinkError;

/// A finished report as it leaves the process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub extra: Map<String, Value>,
    pub exception: FailureError,
}

/// Transform applied by the sink to every outbound event.
///
/// Returning `None` drops the event.
pub trait BeforeSend: Send + Sync {
    fn before_send(&self, event: OutboundEvent) -> Option<OutboundEvent>;
}

/// Options handed to a sink at startup
#[derive(Clone)]
pub struct SinkOptions {
    pub dsn: String,
    pub environment: Option<String>,
    /// Names of the backend's default integrations to leave disabled
    pub excluded_integrations: Vec<String>,
    pub before_send: Arc<dyn BeforeSend>,
}

impl fmt::Debug for SinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkOptions")
            .field("dsn", &"<redacted>")
            .field("environment", &self.environment)
            .field("excluded_integrations", &self.excluded_integrations)
            .finish_non_exhaustive()
    }
}

impl SinkOptions {
    /// Runs the registered pre-send hook.
    pub fn prepare(&self, event: OutboundEvent) -> Option<OutboundEvent> {
        self.before_send.before_send(event)
    }
}

/// The external error-tracking backend
pub trait ReportSink: Send + Sync {
    /// Configures the sink. Called once, before any capture.
    fn init(&self, options: SinkOptions) -> Result<(), SinkError>;

    /// Accepts one report. All of the event's fields belong to the same
    /// report; implementations must not split it.
    fn capture(&self, event: OutboundEvent) -> Result<(), SinkError>;
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn init(&self, options: SinkOptions) -> Result<(), SinkError> {
        (**self).init(options)
    }

    fn capture(&self, event: OutboundEvent) -> Result<(), SinkError> {
        (**self).capture(event)
    }
}

fn validate_dsn(dsn: &str) -> Result<(), SinkError> {
    if dsn.trim().is_empty() {
        return Err(SinkError::InvalidDsn("dsn is empty".to_string()));
    }
    Ok(())
}

/// Keeps every delivered event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    options: Mutex<Option<SinkOptions>>,
    events: Mutex<Vec<OutboundEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered so far, after the pre-send hook
    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Options the sink was initialized with
    pub fn options(&self) -> Option<SinkOptions> {
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn init(&self, options: SinkOptions) -> Result<(), SinkError> {
        validate_dsn(&options.dsn)?;
        *self.options.lock().unwrap_or_else(PoisonError::into_inner) = Some(options);
        Ok(())
    }

    fn capture(&self, event: OutboundEvent) -> Result<(), SinkError> {
        let options = self.options().ok_or(SinkError::Closed)?;
        if let Some(event) = options.prepare(event) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
        Ok(())
    }
}

/// Emits every event as a structured log record.
#[derive(Debug, Default)]
pub struct TracingSink {
    options: OnceCell<SinkOptions>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for TracingSink {
    fn init(&self, options: SinkOptions) -> Result<(), SinkError> {
        validate_dsn(&options.dsn)?;
        self.options
            .set(options)
            .map_err(|_| SinkError::Rejected("sink already initialized".to_string()))
    }

    fn capture(&self, event: OutboundEvent) -> Result<(), SinkError> {
        let options = self.options.get().ok_or(SinkError::Closed)?;
        let Some(event) = options.prepare(event) else {
            return Ok(());
        };

        let extra = serde_json::to_string(&event.extra)
            .map_err(|e| SinkError::Rejected(format!("unserializable extra: {}", e)))?;

        tracing::error!(
            target: "error_reporting::sink",
            event_id = %event.event_id,
            environment = event.environment.as_deref().unwrap_or("unknown"),
            user_id = event.user_id.as_deref().unwrap_or("anonymous"),
            exception = %event.exception.name,
            tags = ?event.tags,
            extra = %extra,
            "Error report captured"
        );
        Ok(())
    }
}
