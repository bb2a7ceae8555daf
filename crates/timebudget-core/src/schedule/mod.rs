//! Schedule records: routines, tasks, efficiency records and draft events.
//!
//! These are plain typed rows. Ids are assigned by storage; a value built
//! with `new` carries id 0 until it is inserted.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// A recurring life activity (sleep, meals, commute...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: i64,
    pub title: String,
    /// Effort per occurrence, in hours.
    pub hours: f64,
    /// Recurrence interval in days. Must be positive.
    pub period_days: i64,
}

impl Routine {
    pub fn new(title: impl Into<String>, hours: f64, period_days: i64) -> Self {
        Self {
            id: 0,
            title: title.into(),
            hours,
            period_days,
        }
    }

    /// Average hours per day this routine consumes.
    pub fn daily_hours(&self) -> f64 {
        self.hours / self.period_days as f64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::invalid("title", "must not be empty"));
        }
        if self.period_days <= 0 {
            return Err(ValidationError::invalid(
                "period_days",
                format!("must be positive, got {}", self.period_days),
            ));
        }
        if !self.hours.is_finite() || self.hours < 0.0 {
            return Err(ValidationError::invalid(
                "hours",
                format!("must be a non-negative number, got {}", self.hours),
            ));
        }
        Ok(())
    }
}

/// A unit of work with a deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub due_date: NaiveDate,
    pub due_time: NaiveTime,
    pub required_hours: f64,
    pub info_url: Option<String>,
    /// Fraction complete. Values above 1.0 are read as percentages.
    pub progress: f64,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        due_date: NaiveDate,
        due_time: NaiveTime,
        required_hours: f64,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            due_date,
            due_time,
            required_hours,
            info_url: None,
            progress: 0.0,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn due(&self) -> NaiveDateTime {
        self.due_date.and_time(self.due_time)
    }

    /// `required_hours * (1 - progress)`, never negative.
    pub fn remaining_hours(&self) -> f64 {
        let required = if self.required_hours.is_finite() {
            self.required_hours
        } else {
            0.0
        };
        (required * (1.0 - normalize_progress(self.progress))).max(0.0)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::invalid("title", "must not be empty"));
        }
        if !self.required_hours.is_finite() || self.required_hours < 0.0 {
            return Err(ValidationError::invalid(
                "required_hours",
                format!("must be a non-negative number, got {}", self.required_hours),
            ));
        }
        Ok(())
    }
}

/// Normalize a stored progress value to a fraction in `[0, 1]`.
///
/// Anything above 1.0 is treated as a percentage.
pub fn normalize_progress(progress: f64) -> f64 {
    if !progress.is_finite() {
        return 0.0;
    }
    let p = if progress > 1.0 { progress / 100.0 } else { progress };
    p.clamp(0.0, 1.0)
}

/// Evidence that a task was completed. Only the path is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProof {
    pub id: i64,
    pub task_id: i64,
    pub proof_path: String,
    pub completed_at: String,
}

/// A task together with its latest completion timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    #[serde(flatten)]
    pub task: Task,
    pub completed_at: String,
}

/// A productivity multiplier applied to task hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyRecord {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub efficiency: f64,
    pub repeat: bool,
    pub interval_days: Option<i64>,
}

impl EfficiencyRecord {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, efficiency: f64) -> Self {
        Self {
            id: 0,
            start_date,
            end_date,
            efficiency,
            repeat: false,
            interval_days: None,
        }
    }

    pub fn repeating(mut self, interval_days: i64) -> Self {
        self.repeat = true;
        self.interval_days = Some(interval_days);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end_date < self.start_date {
            return Err(ValidationError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if !self.efficiency.is_normal() || self.efficiency <= 0.0 {
            return Err(ValidationError::invalid(
                "efficiency",
                format!("must be a positive number, got {}", self.efficiency),
            ));
        }
        if self.repeat && self.interval_days.map_or(true, |d| d <= 0) {
            return Err(ValidationError::invalid(
                "interval_days",
                "repeating records need a positive interval",
            ));
        }
        Ok(())
    }
}

/// A draft event that has not been committed to the calendar yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub date: NaiveDate,
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub info_url: Option<String>,
}

impl Candidate {
    pub fn new(
        date: NaiveDate,
        title: impl Into<String>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: 0,
            date,
            title: title.into(),
            start_time,
            end_time,
            info_url: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::invalid("title", "must not be empty"));
        }
        if self.end_time < self.start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: self.date.and_time(self.start_time),
                end: self.date.and_time(self.end_time),
            });
        }
        Ok(())
    }
}

/// A candidate sitting in the recently-deleted bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub deleted_at: String,
}

/// Extra information attached to a calendar event on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    pub id: i64,
    pub event_id: String,
    pub event_date: NaiveDate,
    pub info_url: Option<String>,
    pub proof_path: Option<String>,
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        ValidationError::invalid(field, format!("expected YYYY-MM-DD, got '{value}': {e}"))
    })
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ValidationError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, TIME_FORMAT))
        .map_err(|e| {
            ValidationError::invalid(field, format!("expected HH:MM, got '{value}': {e}"))
        })
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}
