//! Conversions between the canonical tenths-of-a-second unit and the
//! `MM:SS[.T]` strings shown on screen and used as config labels.

use log::warn;

pub const TENTHS_PER_SECOND: i64 = 10;
pub const TENTHS_PER_MINUTE: i64 = 600;

/// Format as "MM:SS.T". Minutes are zero-padded to two digits but grow past
/// 99 unclipped.
pub fn to_clock(tenths: i64) -> String {
    let minutes = tenths / TENTHS_PER_MINUTE;
    let seconds = (tenths % TENTHS_PER_MINUTE) / TENTHS_PER_SECOND;
    let rest = tenths % TENTHS_PER_SECOND;
    format!("{minutes:02}:{seconds:02}.{rest}")
}

/// Format as "MM:SS", dropping the tenths digit.
pub fn to_clock_coarse(tenths: i64) -> String {
    let minutes = tenths / TENTHS_PER_MINUTE;
    let seconds = (tenths % TENTHS_PER_MINUTE) / TENTHS_PER_SECOND;
    format!("{minutes:02}:{seconds:02}")
}

/// Parse a "MM:SS" or "-MM:SS" label into tenths. Change-time labels carry
/// the leading minus. Anything unparseable logs a warning and counts as 0;
/// a bad label must never take a page down.
pub fn parse_label(label: &str) -> i64 {
    let (sign, body) = match label.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, label),
    };

    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() == 2 {
        if let (Ok(minutes), Ok(seconds)) = (parts[0].parse::<i64>(), parts[1].parse::<i64>()) {
            return sign * (minutes * 60 + seconds) * TENTHS_PER_SECOND;
        }
    }

    warn!("invalid time label '{label}', treating it as 0");
    0
}

/// Combine separate minutes/seconds fields into tenths. Missing fields count
/// as 0. No clamping here; callers that need bounds apply them afterwards.
pub fn from_fields(minutes: Option<i64>, seconds: Option<i64>) -> i64 {
    minutes.unwrap_or(0) * TENTHS_PER_MINUTE + seconds.unwrap_or(0) * TENTHS_PER_SECOND
}

/// A staged minutes/seconds pair for the stepped arrow controls. Steps adjust
/// the pair locally; the result is committed to the engine via `set_total`
/// once the caller is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeFields {
    pub fn from_tenths(tenths: i64) -> Self {
        Self {
            minutes: tenths / TENTHS_PER_MINUTE,
            seconds: (tenths % TENTHS_PER_MINUTE) / TENTHS_PER_SECOND,
        }
    }

    pub fn to_tenths(&self) -> i64 {
        from_fields(Some(self.minutes), Some(self.seconds))
    }

    pub fn add_minutes(&mut self, step: i64) {
        self.minutes += step;
        self.normalize();
    }

    /// Subtracting floors the minutes field at 0 before normalization.
    pub fn sub_minutes(&mut self, step: i64) {
        self.minutes = (self.minutes - step).max(0);
        self.normalize();
    }

    pub fn add_seconds(&mut self, step: i64) {
        self.seconds += step;
        self.normalize();
    }

    pub fn sub_seconds(&mut self, step: i64) {
        self.seconds = (self.seconds - step).max(0);
        self.normalize();
    }

    /// Seconds >= 60 carry into minutes; negative seconds borrow from
    /// minutes with the total floored at 0.
    fn normalize(&mut self) {
        if self.seconds >= 60 {
            self.minutes += self.seconds / 60;
            self.seconds %= 60;
        } else if self.seconds < 0 {
            let borrow = (-self.seconds + 59) / 60;
            self.minutes = (self.minutes - borrow).max(0);
            self.seconds = 60 - (-self.seconds) % 60;
            if self.seconds == 60 {
                self.seconds = 0;
            }
        }
    }
}
