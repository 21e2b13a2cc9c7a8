//! # Reporter Configuration
//!
//! Static options for the reporter plus the startup resolution of the
//! connection string and environment label, which may come from the
//! process environment, the secret store or the configuration itself.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::admission::{AdmissionFilter, AdmissionMode};
use crate::path;
use crate::redaction::Redactor;
use crate::types::{Result, SecretsError};

/// Environment variable overriding the connection string
pub const DSN_ENV: &str = "SENTRY_DSN";
/// Environment variable overriding the environment label
pub const ENVIRONMENT_ENV: &str = "SENTRY_ENVIRONMENT";
/// Secret store key holding the connection string
pub const DSN_SECRET: &str = "sentry.dsn";
/// Secret store key holding the environment label
pub const ENVIRONMENT_SECRET: &str = "sentry.environment";

/// Prefix of the environment variables layered over a configuration file
pub const FILE_ENV_PREFIX: &str = "ERROR_REPORTING";

/// Failures that are never reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Error identifiers to drop
    pub ids: Vec<String>,
    /// Status codes to drop (typically 401 and 403)
    pub statuses: Vec<u16>,
    /// Explicit admission mode; inferred from the lists when absent
    pub mode: Option<AdmissionMode>,
}

/// Configuration for the error reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReporterConfig {
    /// Connection string of the error-tracking backend
    pub dsn: Option<String>,
    /// Deployment label attached to every report
    pub environment: Option<String>,
    /// Whether reporting starts switched on
    pub enabled: bool,
    pub ignore: IgnoreConfig,
    /// Backend integrations to leave disabled
    pub exclude_integrations: Vec<String>,
    /// Dotted paths masked in addition to the built-in ones
    pub sensitive_values: Vec<String>,
    /// Capacity of the background dispatch channel
    pub dispatch_capacity: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            enabled: false,
            ignore: IgnoreConfig::default(),
            exclude_integrations: Vec::new(),
            sensitive_values: Vec::new(),
            dispatch_capacity: 100,
        }
    }
}

impl ReporterConfig {
    /// Loads the `sentry` section of a configuration file, with
    /// `ERROR_REPORTING__SENTRY__*` environment variables layered on top
    /// (e.g. `ERROR_REPORTING__SENTRY__ENVIRONMENT=staging`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(FILE_ENV_PREFIX).separator("__"))
            .build()?;
        Ok(Self::try_from(cfg)?)
    }

    pub fn admission_filter(&self) -> AdmissionFilter {
        AdmissionFilter::new(
            self.ignore.mode,
            self.ignore.ids.iter().cloned().collect::<HashSet<_>>(),
            self.ignore.statuses.iter().copied().collect::<HashSet<_>>(),
        )
    }

    pub fn redactor(&self) -> Redactor {
        Redactor::new(self.sensitive_values.iter().cloned())
    }
}

// Reads `key`, trying the camelCase spelling first and the snake_case one second
fn get_either<T: serde::de::DeserializeOwned>(
    cfg: &config::Config,
    camel: &str,
    snake: &str,
) -> Option<T> {
    cfg.get::<T>(camel).or_else(|_| cfg.get::<T>(snake)).ok()
}

impl TryFrom<config::Config> for ReporterConfig {
    type Error = config::ConfigError;

    fn try_from(cfg: config::Config) -> std::result::Result<Self, Self::Error> {
        // Start with defaults and override from config where present.
        let mut base = ReporterConfig::default();

        if let Ok(dsn) = cfg.get::<String>("sentry.dsn") {
            base.dsn = Some(dsn);
        }
        if let Ok(environment) = cfg.get::<String>("sentry.environment") {
            base.environment = Some(environment);
        }
        if let Ok(enabled) = cfg.get::<bool>("sentry.enabled") {
            base.enabled = enabled;
        }
        if let Ok(ids) = cfg.get::<Vec<String>>("sentry.ignore.ids") {
            base.ignore.ids = ids;
        }
        if let Ok(statuses) = cfg.get::<Vec<u16>>("sentry.ignore.statuses") {
            base.ignore.statuses = statuses;
        }
        if let Ok(mode) = cfg.get::<AdmissionMode>("sentry.ignore.mode") {
            base.ignore.mode = Some(mode);
        }
        if let Some(excluded) = get_either::<Vec<String>>(
            &cfg,
            "sentry.excludeIntegrations",
            "sentry.exclude_integrations",
        ) {
            base.exclude_integrations = excluded;
        }
        if let Some(sensitive) =
            get_either::<Vec<String>>(&cfg, "sentry.sensitiveValues", "sentry.sensitive_values")
        {
            base.sensitive_values = sensitive;
        }
        if let Some(capacity) =
            get_either::<usize>(&cfg, "sentry.dispatchCapacity", "sentry.dispatch_capacity")
        {
            if capacity == 0 {
                return Err(config::ConfigError::Message(
                    "sentry.dispatchCapacity must be positive".to_string(),
                ));
            }
            base.dispatch_capacity = capacity;
        }

        Ok(base)
    }
}

/// Read access to the host's secret store
pub trait SecretsLookup: Send + Sync {
    fn lookup(&self, key: &str) -> std::result::Result<Option<String>, SecretsError>;
}

/// A secret store with nothing in it
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecrets;

impl SecretsLookup for NoSecrets {
    fn lookup(&self, _key: &str) -> std::result::Result<Option<String>, SecretsError> {
        Ok(None)
    }
}

/// Flat `key -> value` secrets
impl SecretsLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> std::result::Result<Option<String>, SecretsError> {
        Ok(self.get(key).cloned())
    }
}

/// A nested secrets document, e.g. `{"sentry": {"dsn": "..."}}`
impl SecretsLookup for Value {
    fn lookup(&self, key: &str) -> std::result::Result<Option<String>, SecretsError> {
        match path::get(self, key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(SecretsError::Malformed(format!("{} is not a string", key))),
        }
    }
}

/// Startup values resolved from environment, secrets and configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub dsn: Option<String>,
    pub environment: Option<String>,
}

impl ResolvedSettings {
    /// Resolves against the process environment.
    pub fn resolve(config: &ReporterConfig, secrets: &dyn SecretsLookup) -> Self {
        Self::resolve_with(config, secrets, |name| std::env::var(name).ok())
    }

    /// Resolves with an explicit environment reader. Environment wins over
    /// the secret store, which wins over the configured value. Empty values
    /// count as absent.
    pub fn resolve_with<F>(config: &ReporterConfig, secrets: &dyn SecretsLookup, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |env_name: &str, secret_key: &str, configured: &Option<String>| {
            non_empty(env(env_name))
                .or_else(|| non_empty(lookup_secret(secrets, secret_key)))
                .or_else(|| non_empty(configured.clone()))
        };

        Self {
            dsn: pick(DSN_ENV, DSN_SECRET, &config.dsn),
            environment: pick(ENVIRONMENT_ENV, ENVIRONMENT_SECRET, &config.environment),
        }
    }
}

fn lookup_secret(secrets: &dyn SecretsLookup, key: &str) -> Option<String> {
    match secrets.lookup(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Secret lookup failed");
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
