//! # Error Reporting
//!
//! Forwards failed host operations to an external error-tracking backend
//! after deciding whether they are worth reporting and stripping sensitive
//! data from what gets sent.
//!
//! ## Pipeline
//!
//! - Admission: reporting must be configured and switched on, then the
//!   failure is classified by status, identifier or kind
//! - Scope building: user id, `controller:action` tag and request extras,
//!   merged with caller-supplied tags and extras
//! - Redaction: built-in and configured dotted paths are masked, both before
//!   the hand-off and again in the sink's pre-send hook
//! - Dispatch: one sink call per report, optionally through a background
//!   channel so the caller never waits
//!

pub mod types;
pub mod path;
pub mod event;
pub mod redaction;
pub mod scope;
pub mod admission;
pub mod sink;
pub mod dispatch;
pub mod config;
pub mod reporting;
pub mod plugin;
pub mod logging;
pub mod monitoring;

use std::sync::Arc;

// Re-export commonly used types
pub use types::{Error, ErrorKind, Result, SecretsError, SinkError};
pub use event::{FailureError, FailureEvent, RequestDescriptor, StructuredPayload};
pub use redaction::{Redactor, FILTERED};
pub use scope::ReportScope;
pub use admission::{AdmissionFilter, AdmissionMode, PluginState};
pub use sink::{BeforeSend, MemorySink, OutboundEvent, ReportSink, SinkOptions, TracingSink};
pub use dispatch::ChannelSink;
pub use crate::config::{NoSecrets, ReporterConfig, SecretsLookup};
pub use reporting::{init_reporter, report_failure, Reporter};
pub use plugin::SwitchState;
pub use logging::{init_logging, LoggingConfig};

/// Initializes logging and the process-wide reporter with default settings
pub fn init(sink: Arc<dyn ReportSink>, secrets: &dyn SecretsLookup) -> Result<Arc<Reporter>> {
    dotenv::dotenv().ok();
    init_logging(None)?;
    Ok(init_reporter(ReporterConfig::default(), sink, secrets))
}

/// Initializes logging and the process-wide reporter from a configuration
///
/// Inside a tokio runtime the sink is put behind a [`ChannelSink`] sized by
/// `dispatchCapacity`. Once a process-wide reporter exists it is returned
/// as-is and `sink` is left untouched.
pub fn init_with_config(
    config: ::config::Config,
    sink: Arc<dyn ReportSink>,
    secrets: &dyn SecretsLookup,
) -> Result<Arc<Reporter>> {
    if let Some(existing) = reporting::reporter() {
        return Ok(existing);
    }

    dotenv::dotenv().ok();

    let log_config = LoggingConfig::try_from(config.clone()).ok();
    let reporter_config = ReporterConfig::try_from(config)?;

    init_logging(log_config)?;

    let sink = if tokio::runtime::Handle::try_current().is_ok() {
        let (channel, _worker) = ChannelSink::spawn(sink, reporter_config.dispatch_capacity);
        Arc::new(channel) as Arc<dyn ReportSink>
    } else {
        sink
    };

    Ok(init_reporter(reporter_config, sink, secrets))
}
