//! Confirmed calendar events and the provider trait they are read through.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// A confirmed event, in local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl CalendarEvent {
    /// Create a new event with a fresh id.
    pub fn new(title: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            start,
            end,
        }
    }

    /// The day the event is counted on.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Length in hours, counted in whole minutes. Inverted events count as 0.
    pub fn duration_hours(&self) -> f64 {
        let minutes = (self.end - self.start).num_minutes().max(0);
        minutes as f64 / 60.0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end < self.start {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Every calendar backend implements this trait.
///
/// Calls are synchronous; a remote backend handles its own retries.
pub trait CalendarSource {
    /// Unique identifier (e.g. "local").
    fn name(&self) -> &str;

    /// All events starting on `date`.
    fn events_on(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_duration_hours() {
        let ev = CalendarEvent::new("Standup", at("2025-03-10T09:00:00"), at("2025-03-10T09:45:00"));
        assert_eq!(ev.duration_hours(), 0.75);
        assert_eq!(ev.date().to_string(), "2025-03-10");
    }

    #[test]
    fn test_partial_minutes_are_truncated() {
        let ev = CalendarEvent::new("Call", at("2025-03-10T09:00:00"), at("2025-03-10T09:30:59"));
        assert_eq!(ev.duration_hours(), 0.5);
    }

    #[test]
    fn test_inverted_event_counts_zero() {
        let ev = CalendarEvent::new("Broken", at("2025-03-10T10:00:00"), at("2025-03-10T09:00:00"));
        assert_eq!(ev.duration_hours(), 0.0);
        assert!(ev.validate().is_err());
    }
}
