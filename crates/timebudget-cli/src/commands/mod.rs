//! Subcommand implementations. Each command loads the config, opens the
//! database once and passes it down.

pub mod allocate;
pub mod candidate;
pub mod config;
pub mod efficiency;
pub mod event;
pub mod routine;
pub mod task;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use timebudget_core::schedule::{parse_date, parse_time};
use timebudget_core::{Config, ScheduleDb};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn open_db(config: &Config) -> Result<ScheduleDb, Box<dyn std::error::Error>> {
    let path = config.database_path()?;
    Ok(ScheduleDb::open_at(path)?)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date("date", s).map_err(|e| e.to_string())
}

pub fn time_arg(s: &str) -> Result<NaiveTime, String> {
    parse_time("time", s).map_err(|e| e.to_string())
}

/// `YYYY-MM-DDTHH:MM[:SS]`, a space also works as separator.
pub fn datetime_arg(s: &str) -> Result<NaiveDateTime, String> {
    let (d, t) = s
        .split_once(|c: char| c == 'T' || c == ' ')
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM, got '{s}'"))?;
    Ok(date_arg(d)?.and_time(time_arg(t)?))
}
