//! # Admission
//!
//! Decides whether a failure is reported at all. Nothing is reported until
//! the sink has been configured (`ready`) and while reporting is switched
//! off (`enabled`). Past those gates an [`AdmissionMode`] classifies the
//! failure.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::event::FailureError;

/// Classification name of genuine implementation faults
pub const INTERNAL_ERROR_KIND: &str = "PluginImplementationError";

/// Process-wide reporting switches.
///
/// `ready` is set once when the sink is configured and never cleared.
/// `enabled` flips with the administrative switch. Races between a toggle
/// and an in-flight admission are acceptable.
#[derive(Debug, Default)]
pub struct PluginState {
    ready: AtomicBool,
    enabled: AtomicBool,
}

impl PluginState {
    pub fn new(enabled: bool) -> Self {
        Self {
            ready: AtomicBool::new(false),
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

/// How admitted failures are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdmissionMode {
    /// Report every failure
    Unconditional,
    /// Drop failures whose status or id is on an ignore list
    StatusIdFiltered,
    /// Report only failures classified as [`INTERNAL_ERROR_KIND`]
    KindFiltered,
}

impl AdmissionMode {
    /// Mode used when none is configured: ignore lists select status/id
    /// filtering, otherwise only internal faults are reported.
    pub fn infer(ignore_ids: &HashSet<String>, ignore_statuses: &HashSet<u16>) -> Self {
        if ignore_ids.is_empty() && ignore_statuses.is_empty() {
            AdmissionMode::KindFiltered
        } else {
            AdmissionMode::StatusIdFiltered
        }
    }
}

/// Classification policy applied past the state gates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionFilter {
    mode: AdmissionMode,
    ignore_ids: HashSet<String>,
    ignore_statuses: HashSet<u16>,
}

impl AdmissionFilter {
    /// Builds a filter; `mode` falls back to [`AdmissionMode::infer`].
    pub fn new(
        mode: Option<AdmissionMode>,
        ignore_ids: HashSet<String>,
        ignore_statuses: HashSet<u16>,
    ) -> Self {
        let mode = mode.unwrap_or_else(|| AdmissionMode::infer(&ignore_ids, &ignore_statuses));
        Self {
            mode,
            ignore_ids,
            ignore_statuses,
        }
    }

    pub fn unconditional() -> Self {
        Self::new(Some(AdmissionMode::Unconditional), HashSet::new(), HashSet::new())
    }

    pub fn mode(&self) -> AdmissionMode {
        self.mode
    }

    pub fn should_report(&self, state: &PluginState, failure: &FailureError) -> bool {
        if !state.is_ready() || !state.is_enabled() {
            return false;
        }
        self.classify(failure)
    }

    fn classify(&self, failure: &FailureError) -> bool {
        match self.mode {
            AdmissionMode::Unconditional => true,
            AdmissionMode::StatusIdFiltered => {
                let ignored_status = failure
                    .status
                    .map_or(false, |status| self.ignore_statuses.contains(&status));
                let ignored_id = failure
                    .id
                    .as_ref()
                    .map_or(false, |id| self.ignore_ids.contains(id));
                !(ignored_status || ignored_id)
            }
            AdmissionMode::KindFiltered => failure.name == INTERNAL_ERROR_KIND,
        }
    }
}

impl Default for AdmissionFilter {
    fn default() -> Self {
        Self::new(None, HashSet::new(), HashSet::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_state() -> PluginState {
        let state = PluginState::new(true);
        state.mark_ready();
        state
    }

    fn status_filter() -> AdmissionFilter {
        AdmissionFilter::new(None, HashSet::new(), HashSet::from([401, 403]))
    }

    #[test]
    fn test_not_ready_rejects_everything() {
        let state = PluginState::new(true);
        let failure = FailureError::new(INTERNAL_ERROR_KIND);

        assert!(!AdmissionFilter::unconditional().should_report(&state, &failure));
        assert!(!AdmissionFilter::default().should_report(&state, &failure));
    }

    #[test]
    fn test_disabled_rejects_everything() {
        let state = live_state();
        state.set_enabled(false);

        let failure = FailureError::new(INTERNAL_ERROR_KIND).status(500);
        assert!(!AdmissionFilter::unconditional().should_report(&state, &failure));
        assert!(!status_filter().should_report(&state, &failure));
    }

    #[test]
    fn test_status_filtering() {
        let state = live_state();
        let filter = status_filter();

        assert_eq!(filter.mode(), AdmissionMode::StatusIdFiltered);
        assert!(!filter.should_report(&state, &FailureError::new("ForbiddenError").status(403)));
        assert!(filter.should_report(&state, &FailureError::new("InternalError").status(500)));
    }

    #[test]
    fn test_id_filtering() {
        let state = live_state();
        let filter = AdmissionFilter::new(
            None,
            HashSet::from(["security.token.expired".to_string()]),
            HashSet::new(),
        );

        let expired = FailureError::new("UnauthorizedError").id("security.token.expired");
        let other = FailureError::new("BadRequestError").id("api.assert.invalid_type");

        assert!(!filter.should_report(&state, &expired));
        assert!(filter.should_report(&state, &other));
    }

    #[test]
    fn test_kind_fallback() {
        let state = live_state();
        let filter = AdmissionFilter::default();

        assert_eq!(filter.mode(), AdmissionMode::KindFiltered);
        assert!(!filter.should_report(&state, &FailureError::new("BadRequestError").status(400)));
        assert!(filter.should_report(&state, &FailureError::new(INTERNAL_ERROR_KIND)));
    }

    #[test]
    fn test_explicit_mode_wins_over_inference() {
        let state = live_state();
        let filter = AdmissionFilter::new(
            Some(AdmissionMode::Unconditional),
            HashSet::new(),
            HashSet::new(),
        );

        assert!(filter.should_report(&state, &FailureError::new("BadRequestError")));
    }

    #[test]
    fn test_mode_deserializes_kebab_case() {
        let mode: AdmissionMode = serde_json::from_str("\"status-id-filtered\"").unwrap();
        assert_eq!(mode, AdmissionMode::StatusIdFiltered);
    }
}
