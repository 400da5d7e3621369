use serde::{Deserialize, Serialize};

/// Sentinel project meaning "nobody selected". It never accumulates time and
/// blocks countdown start as well as manual time changes.
pub const NEUTRAL: &str = "Neutral";

/// Persisted key names. The store is a flat namespace shared by every page
/// instance, so these strings are the actual contract between processes.
pub mod keys {
    pub const REMAINING_TIME: &str = "remaining_time";
    pub const TOTAL_TIME: &str = "total_time";
    pub const SELECTED_CONFIG_NAME: &str = "selected_config_name";
    pub const IS_RUNNING: &str = "isRunning";

    pub fn elapsed(project: &str) -> String {
        format!("elapsed_{project}")
    }

    pub fn accumulated(project: &str) -> String {
        format!("total_{project}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub remaining_tenths: i64,
    pub total_tenths: i64,
    pub is_running: bool,
    pub selected_project: String,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            remaining_tenths: 0,
            total_tenths: 0,
            is_running: false,
            selected_project: NEUTRAL.to_string(),
        }
    }
}

impl TimerState {
    pub fn is_neutral(&self) -> bool {
        self.selected_project == NEUTRAL
    }

    /// Invariant guard: remaining never exceeds total. Applied after loads so
    /// a partially-written pair from another process cannot surface.
    pub fn clamp_remaining(&mut self) {
        if self.remaining_tenths > self.total_tenths {
            self.remaining_tenths = self.total_tenths;
        }
    }

    /// Fraction of the countdown already consumed. 0.0 for an unset timer.
    pub fn progress(&self) -> f64 {
        if self.total_tenths > 0 {
            (self.total_tenths - self.remaining_tenths) as f64 / self.total_tenths as f64
        } else {
            0.0
        }
    }
}

/// Per-project time bookkeeping. `elapsed_tenths` covers the current open
/// session; `accumulated_total` is persisted as decimal seconds with one
/// decimal place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAccumulator {
    pub elapsed_tenths: i64,
    pub accumulated_total: f64,
}

impl Default for ProjectAccumulator {
    fn default() -> Self {
        Self {
            elapsed_tenths: 0,
            accumulated_total: 0.0,
        }
    }
}

/// Which subsystems a page instance activates, decided once at startup from
/// a marker the host sets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PageRole {
    Admin,
    Display,
    Neither,
}

impl PageRole {
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            "admin" => PageRole::Admin,
            "display" | "countdown" | "countdown-display" => PageRole::Display,
            _ => PageRole::Neither,
        }
    }
}
