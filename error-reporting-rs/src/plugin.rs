//! Host registration table.
//!
//! Describes what the host must wire to the reporter: the hook delivering
//! failed requests and the administrative route flipping reporting on and
//! off.

use serde::Serialize;
use serde_json::Value;

use crate::path;

/// Hook the host fires on every failed request
pub const ERROR_HOOK: &str = "request:onError";

/// Value of the `state` argument that switches reporting off
pub const STATE_OFF: &str = "off";

/// An HTTP route exposed through the host's router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteSpec {
    pub verb: &'static str,
    pub url: &'static str,
    pub controller: &'static str,
    pub action: &'static str,
}

/// The administrative switch
pub const SWITCH_ROUTE: RouteSpec = RouteSpec {
    verb: "get",
    url: "/switch/:state",
    controller: "admin",
    action: "switch",
};

pub const ROUTES: &[RouteSpec] = &[SWITCH_ROUTE];

/// Response of the administrative switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchState {
    pub enabled: bool,
}

/// Maps the switch vocabulary to a flag: `"off"` disables, anything else
/// (including a missing value) enables.
pub fn parse_state(state: Option<&str>) -> bool {
    state != Some(STATE_OFF)
}

/// Reads the `state` argument from a route's argument map.
pub fn state_argument(args: &Value) -> Option<&str> {
    path::get(args, "state").and_then(Value::as_str)
}
