//! Event access window.
//!
//! Scanning for an event is open while
//! `now - open_after <= scheduled_at <= now + open_before`. The names look
//! swapped: `open_before` is how long *before* the start the gates open and
//! therefore bounds `scheduled_at` from above; `open_after` is how long
//! *after* the start they stay open and bounds it from below.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::WindowConfig;
use crate::types::Event;

/// Evaluates whether events are currently open for scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindow {
    open_before: TimeDelta,
    open_after: TimeDelta,
}

impl AccessWindow {
    /// Build a window from explicit offsets.
    #[must_use]
    pub const fn new(open_before: TimeDelta, open_after: TimeDelta) -> Self {
        Self {
            open_before,
            open_after,
        }
    }

    /// Build a window from configuration.
    #[must_use]
    pub fn from_config(config: &WindowConfig) -> Self {
        Self::new(
            TimeDelta::seconds(config.open_before_secs),
            TimeDelta::seconds(config.open_after_secs),
        )
    }

    /// Inclusive range of scheduled times that are open at `now`.
    #[must_use]
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.open_after, now + self.open_before)
    }

    /// Returns `true` if `event` accepts scans at `now`.
    #[must_use]
    pub fn is_open(&self, event: &Event, now: DateTime<Utc>) -> bool {
        let (earliest, latest) = self.bounds(now);
        earliest <= event.scheduled_at && event.scheduled_at <= latest
    }

    /// The same window extended by `delta` on both sides.
    #[must_use]
    pub fn widened(&self, delta: TimeDelta) -> Self {
        Self::new(self.open_before + delta, self.open_after + delta)
    }
}

impl Default for AccessWindow {
    fn default() -> Self {
        Self::from_config(&WindowConfig::default())
    }
}
