//! Budget accounting: dual time tracking plus iteration counts.
//!
//! "Runtime" is accumulated active CLI time (gaps clamped by the session
//! store); "wall clock" is `now - started_at`. Minima and maxima are
//! evaluated against runtime and the iteration count; wall clock is
//! reported for the audit trail only.

use chrono::{DateTime, Utc};
use ralph_config::LoopLimits;
use ralph_session::SessionRecord;

/// Which maximum tripped. Time dominates when both do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxExceeded {
    Time,
    Iterations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetReport {
    pub min_time_met: bool,
    pub min_iter_met: bool,
    pub max_exceeded: Option<MaxExceeded>,
    /// Larger of the time and iteration fractions of their maxima.
    pub fraction_of_max: f64,
    pub runtime_hours: f64,
    pub wall_clock_seconds: i64,
}

impl BudgetReport {
    /// Completion (and adapter stops) are only permitted once both minima
    /// are met.
    pub fn minima_met(&self) -> bool {
        self.min_time_met && self.min_iter_met
    }
}

/// Pure assessment of the session against its limits.
///
/// Maxima are strict: a session sitting exactly at `max_iterations` still
/// continues; the tick after that stops.
pub fn assess(limits: &LoopLimits, session: &SessionRecord, now: DateTime<Utc>) -> BudgetReport {
    let runtime_hours = session.runtime_hours();
    let iterations = session.iteration_count;

    let time_fraction = if limits.max_hours > 0.0 {
        runtime_hours / limits.max_hours
    } else {
        0.0
    };
    let iter_fraction = if limits.max_iterations > 0 {
        iterations as f64 / limits.max_iterations as f64
    } else {
        0.0
    };

    let max_exceeded = if runtime_hours > limits.max_hours {
        Some(MaxExceeded::Time)
    } else if iterations > limits.max_iterations {
        Some(MaxExceeded::Iterations)
    } else {
        None
    };

    BudgetReport {
        min_time_met: runtime_hours >= limits.min_hours,
        min_iter_met: iterations >= limits.min_iterations,
        max_exceeded,
        fraction_of_max: time_fraction.max(iter_fraction),
        runtime_hours,
        wall_clock_seconds: (now - session.started_at).num_seconds(),
    }
}
