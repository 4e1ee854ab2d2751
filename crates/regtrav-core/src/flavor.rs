//! Regex dialect policy.
//!
//! Flavors differ only in a handful of matching-semantics switches. They are
//! read-only per compilation, so they are plain data rather than a trait.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Flavor {
    /// An empty-iteration check passes if a capture group changed in the iteration.
    pub empty_checks_monitor_capture_groups: bool,
    /// Empty checks also apply to the first `min` (mandatory) iterations.
    pub empty_checks_on_mandatory_loop_iterations: bool,
    /// A failing empty check leaves the loop instead of backtracking.
    pub failing_empty_checks_dont_backtrack: bool,
    /// `\n` fails when group `n` has not matched (instead of matching empty).
    pub backreferences_to_unmatched_groups_fail: bool,
    /// The last closed capture group is observable (Python `lastindex`).
    pub uses_last_group_result_field: bool,
    /// Captures inside a loop body survive into the next iteration.
    pub nested_capture_groups_kept_on_loop_reentry: bool,
    /// Every transition is observable, so all capture bits take part in dedup.
    pub matches_transitions_step_by_step: bool,
    /// A back-reference inside its own group sees the previous iteration.
    pub supports_recursive_backreferences: bool,
}

impl Flavor {
    pub const ECMASCRIPT: Flavor = Flavor {
        empty_checks_monitor_capture_groups: false,
        empty_checks_on_mandatory_loop_iterations: false,
        failing_empty_checks_dont_backtrack: false,
        backreferences_to_unmatched_groups_fail: false,
        uses_last_group_result_field: false,
        nested_capture_groups_kept_on_loop_reentry: false,
        matches_transitions_step_by_step: false,
        supports_recursive_backreferences: false,
    };

    pub const PYTHON: Flavor = Flavor {
        empty_checks_monitor_capture_groups: false,
        empty_checks_on_mandatory_loop_iterations: true,
        failing_empty_checks_dont_backtrack: true,
        backreferences_to_unmatched_groups_fail: true,
        uses_last_group_result_field: true,
        nested_capture_groups_kept_on_loop_reentry: true,
        matches_transitions_step_by_step: false,
        supports_recursive_backreferences: false,
    };

    pub const RUBY: Flavor = Flavor {
        empty_checks_monitor_capture_groups: true,
        empty_checks_on_mandatory_loop_iterations: true,
        failing_empty_checks_dont_backtrack: true,
        backreferences_to_unmatched_groups_fail: true,
        uses_last_group_result_field: false,
        nested_capture_groups_kept_on_loop_reentry: true,
        matches_transitions_step_by_step: true,
        supports_recursive_backreferences: true,
    };

    pub const ORACLE_DB: Flavor = Flavor {
        empty_checks_monitor_capture_groups: false,
        empty_checks_on_mandatory_loop_iterations: true,
        failing_empty_checks_dont_backtrack: true,
        backreferences_to_unmatched_groups_fail: true,
        uses_last_group_result_field: false,
        nested_capture_groups_kept_on_loop_reentry: true,
        matches_transitions_step_by_step: false,
        supports_recursive_backreferences: false,
    };

    /// Named presets, in declaration order.
    pub fn presets() -> IndexMap<&'static str, Flavor> {
        IndexMap::from([
            ("ecmascript", Self::ECMASCRIPT),
            ("python", Self::PYTHON),
            ("ruby", Self::RUBY),
            ("oracledb", Self::ORACLE_DB),
        ])
    }

    /// Resolve a preset by name. Case-insensitive; `js` and `oracle` are accepted aliases.
    pub fn by_name(name: &str) -> Result<Flavor> {
        let key = name.to_ascii_lowercase();
        let key = match key.as_str() {
            "js" | "javascript" => "ecmascript",
            "oracle" | "oracle_db" => "oracledb",
            other => other,
        };
        Self::presets()
            .get(key)
            .copied()
            .ok_or_else(|| Error::UnknownFlavor(name.to_string()))
    }

    /// Load a policy from JSON. Missing fields take the ECMAScript value.
    pub fn from_json(json: &str) -> Result<Flavor> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for Flavor {
    fn default() -> Self {
        Self::ECMASCRIPT
    }
}
