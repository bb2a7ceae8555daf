//! # timebudget Core Library
//!
//! This library provides the core logic for timebudget, a personal
//! schedule manager that answers one question: where do the hours of a day
//! (or a week) go? All operations are available through the `timebudget`
//! CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Allocation**: a pure allocator that splits a date range into Schedule,
//!   Routine, Sleep, Tasks and Free Time, plus a service that gathers its inputs
//! - **Calendar**: confirmed events and the provider trait they are read through
//! - **Schedule**: typed records for routines, tasks, efficiency and draft events
//! - **Storage**: SQLite record storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`allocate`]: the allocation routine
//! - [`BudgetService`]: storage + calendar → [`AllocationReport`]
//! - [`ScheduleDb`]: record persistence, also the local [`CalendarSource`]
//! - [`Config`]: application configuration management

pub mod allocation;
pub mod calendar;
pub mod error;
pub mod schedule;
pub mod storage;

pub use allocation::{
    allocate, AllocationReport, BudgetCategory, BudgetService, DateRange, TimeAllocation,
};
pub use calendar::{CalendarEvent, CalendarSource};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use schedule::{Candidate, EfficiencyRecord, EventMeta, Routine, Task, TaskProof};
pub use storage::{Config, ScheduleDb};
