//! # Error Reporting
//!
//! The reporter ties the pipeline together: admission, scope building,
//! redaction and a single hand-off to the sink per admitted failure.
//! Nothing here fails towards the host; problems in the pipeline itself are
//! logged and swallowed.

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::OnceCell;
use serde_json::Value;
use uuid::Uuid;

use crate::admission::{AdmissionFilter, PluginState};
use crate::config::{ReporterConfig, ResolvedSettings, SecretsLookup};
use crate::event::FailureEvent;
use crate::monitoring;
use crate::plugin::{self, SwitchState};
use crate::redaction::Redactor;
use crate::scope;
use crate::sink::{BeforeSend, OutboundEvent, ReportSink, SinkOptions};

// Global error reporter instance
static REPORTER: OnceCell<Arc<Reporter>> = OnceCell::new();

/// Reports host failures to the error-tracking backend
pub struct Reporter {
    config: ReporterConfig,
    state: PluginState,
    filter: AdmissionFilter,
    redactor: Arc<Redactor>,
    sink: Arc<dyn ReportSink>,
    environment: OnceCell<Option<String>>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("state", &self.state)
            .field("filter", &self.filter)
            .field("redactor", &self.redactor)
            .finish_non_exhaustive()
    }
}

impl Reporter {
    /// Creates a reporter. It reports nothing until [`Reporter::initialize`]
    /// has configured the sink.
    pub fn new(config: ReporterConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            state: PluginState::new(config.enabled),
            filter: config.admission_filter(),
            redactor: Arc::new(config.redactor()),
            sink,
            environment: OnceCell::new(),
            config,
        }
    }

    pub fn state(&self) -> &PluginState {
        &self.state
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Resolves the connection settings from the process environment,
    /// `secrets` and the configuration, then configures the sink.
    ///
    /// Returns whether the reporter is ready. Without a connection string
    /// the reporter stays not-ready for the life of the process.
    pub fn initialize(&self, secrets: &dyn SecretsLookup) -> bool {
        self.initialize_resolved(ResolvedSettings::resolve(&self.config, secrets))
    }

    /// Same as [`Reporter::initialize`] with already-resolved settings.
    pub fn initialize_resolved(&self, settings: ResolvedSettings) -> bool {
        if self.state.is_ready() {
            return true;
        }

        let Some(dsn) = settings.dsn else {
            tracing::warn!(
                "Unable to initialize error reporting. The dsn is missing from env (SENTRY_DSN), secrets (sentry.dsn) and configuration"
            );
            return false;
        };

        if settings.environment.is_none() {
            tracing::warn!("No environment label configured, reports will be sent unlabeled");
        }

        if self.config.ignore.mode.is_none() {
            tracing::info!(
                mode = ?self.filter.mode(),
                "Admission mode inferred from ignore lists"
            );
        }

        let options = SinkOptions {
            dsn,
            environment: settings.environment.clone(),
            excluded_integrations: self.config.exclude_integrations.clone(),
            before_send: Arc::clone(&self.redactor) as Arc<dyn BeforeSend>,
        };

        if let Err(e) = self.sink.init(options) {
            tracing::error!(error = %e, "Failed to initialize error reporting sink");
            return false;
        }

        // First initialization wins; ready is never cleared
        let _ = self.environment.set(settings.environment);
        self.state.mark_ready();

        tracing::info!(
            hook = plugin::ERROR_HOOK,
            environment = self.environment().unwrap_or("none"),
            enabled = self.state.is_enabled(),
            rules = self.redactor.rules().len(),
            "Error reporting initialized"
        );
        true
    }

    fn environment(&self) -> Option<&str> {
        self.environment.get().and_then(|env| env.as_deref())
    }

    /// Reports one failure. Rejected failures have no effect at all.
    pub fn report(&self, failure: &FailureEvent) {
        if !self.filter.should_report(&self.state, &failure.error) {
            return;
        }

        let scope::ScopedFailure {
            scope: mut report_scope,
            exception,
        } = scope::build(failure);
        let redacted = self.redactor.redact(&mut report_scope.extras);

        let event = OutboundEvent {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            environment: self.environment().map(str::to_string),
            user_id: report_scope.user_id,
            tags: report_scope.tags,
            extra: report_scope.extras,
            exception,
        };

        let event_id = event.event_id;
        let exception = event.exception.name.clone();
        match self.sink.capture(event) {
            Ok(()) => monitoring::record_report(&exception, redacted),
            Err(e) => {
                monitoring::record_dropped();
                tracing::warn!(%event_id, error = %e, "Error report was not accepted by the sink");
            }
        }
    }

    /// Administrative switch: `"off"` disables reporting, any other value
    /// enables it.
    pub fn set_enabled(&self, state: &str) -> SwitchState {
        self.apply_switch(plugin::parse_state(Some(state)))
    }

    /// Handles the switch route with the route's argument map.
    pub fn handle_switch(&self, args: &Value) -> SwitchState {
        self.apply_switch(plugin::parse_state(plugin::state_argument(args)))
    }

    fn apply_switch(&self, enabled: bool) -> SwitchState {
        self.state.set_enabled(enabled);
        monitoring::record_toggle(enabled);

        tracing::info!(
            "Sentry plugin is now {}",
            if enabled { "enabled" } else { "disabled" }
        );

        SwitchState { enabled }
    }
}

/// Creates and initializes the process-wide reporter.
///
/// Only the first call builds a reporter; later calls return it unchanged.
pub fn init_reporter(
    config: ReporterConfig,
    sink: Arc<dyn ReportSink>,
    secrets: &dyn SecretsLookup,
) -> Arc<Reporter> {
    Arc::clone(REPORTER.get_or_init(|| {
        let reporter = Reporter::new(config, sink);
        reporter.initialize(secrets);
        Arc::new(reporter)
    }))
}

/// The process-wide reporter, if one was initialized
pub fn reporter() -> Option<Arc<Reporter>> {
    REPORTER.get().cloned()
}

/// Reports a failure through the process-wide reporter. No-op before
/// [`init_reporter`].
pub fn report_failure(failure: &FailureEvent) {
    if let Some(reporter) = REPORTER.get() {
        reporter.report(failure);
    }
}

/// Flips the process-wide reporter's switch.
pub fn set_enabled(state: &str) -> Option<SwitchState> {
    REPORTER.get().map(|reporter| reporter.set_enabled(state))
}
