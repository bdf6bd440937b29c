//! Canonical per-user event record and derived elapsed time.

use chrono::NaiveDateTime;
use cm_config::TimeUnit;
use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: f64 = 3_600.0;
const NANOS_PER_HOUR: f64 = 3_600_000_000_000.0;

/// One user: registration time plus the optional target event
/// (first payment or last login).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Index of the source row, for tracing data problems back.
    pub source_row: usize,
    pub registration_time: NaiveDateTime,
    /// `None` means the event never occurred or was unrecorded/unparseable.
    pub target_event_time: Option<NaiveDateTime>,
}

impl EventRecord {
    pub fn new(registration_time: NaiveDateTime, target_event_time: Option<NaiveDateTime>) -> Self {
        EventRecord {
            source_row: 0,
            registration_time,
            target_event_time,
        }
    }

    pub fn with_source_row(mut self, row: usize) -> Self {
        self.source_row = row;
        self
    }

    /// Raw `target - registration`, negative values included.
    pub fn elapsed(&self) -> Option<ElapsedDuration> {
        self.target_event_time
            .map(|target| ElapsedDuration(target - self.registration_time))
    }

    /// Elapsed time if the target event exists and is not before registration.
    pub fn valid_elapsed(&self) -> Option<ElapsedDuration> {
        self.elapsed().filter(|e| !e.is_negative())
    }

    /// Whether the record has a target event that precedes registration.
    pub fn has_invalid_elapsed(&self) -> bool {
        self.elapsed().is_some_and(|e| e.is_negative())
    }
}

/// `target_event_time - registration_time`, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ElapsedDuration(chrono::Duration);

impl ElapsedDuration {
    pub fn new(duration: chrono::Duration) -> Self {
        ElapsedDuration(duration)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < chrono::Duration::zero()
    }

    /// Fractional hours at nanosecond precision.
    ///
    /// Whole seconds and the sub-second remainder are scaled separately.
    pub fn hours(&self) -> f64 {
        let secs = self.0.num_seconds();
        let nanos = (self.0 - chrono::Duration::seconds(secs))
            .num_nanoseconds()
            .unwrap_or(0);
        secs as f64 / SECONDS_PER_HOUR + nanos as f64 / NANOS_PER_HOUR
    }

    /// Whole elapsed days (floor). `None` for negative durations.
    pub fn whole_days(&self) -> Option<u32> {
        if self.is_negative() {
            return None;
        }
        u32::try_from(self.0.num_days()).ok()
    }

    /// Value in `unit` under the precision policy: fractional hours, whole days.
    ///
    /// Negative durations map to a negative value in both units so that
    /// callers comparing against a lower bound of 0 exclude them.
    pub fn in_unit(&self, unit: TimeUnit) -> f64 {
        match unit {
            TimeUnit::Hour => self.hours(),
            TimeUnit::Day => match self.whole_days() {
                Some(days) => f64::from(days),
                None => self.hours() / 24.0,
            },
        }
    }
}
