use std::collections::HashMap;

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock access. The publish-time manager computes deadlines from the
/// current time, so tests inject a fixed implementation.
pub trait Clock: Send + Sync {
    /// The current wall-clock time, UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A publish boundary: the wall-clock instant and the rollup number the
/// boundary is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeout {
    /// Boundary instant, an integer multiple of the relevant interval.
    pub time: DateTime<Utc>,
    /// Interval-aligned rollup number (`floor(now / interval)` for the last
    /// boundary, one more for the next).
    pub rollup_number: u64,
}

/// The set of publish boundaries in force for one coordinator tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupTimeouts {
    /// Boundary of the base publish interval. Absent when the interval is
    /// shorter than one second (deadline tracking disabled).
    pub base_timeout: Option<Timeout>,
    /// Per-bridge boundaries, keyed by encoded bridge call data. Bridges with
    /// a rollup frequency below 1 are not tracked.
    pub bridge_timeouts: HashMap<U256, Timeout>,
}
