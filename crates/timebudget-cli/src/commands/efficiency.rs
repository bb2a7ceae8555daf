//! Efficiency record commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use timebudget_core::{Config, DatabaseError, EfficiencyRecord};

use super::{date_arg, open_db, print_json, CmdResult};

#[derive(Subcommand)]
pub enum EfficiencyAction {
    /// Add an efficiency record
    Add {
        #[arg(long, value_parser = date_arg)]
        start: NaiveDate,
        #[arg(long, value_parser = date_arg)]
        end: NaiveDate,
        /// Multiplier, e.g. 0.8 for a slow week
        #[arg(long)]
        efficiency: f64,
        /// Repeat every N days
        #[arg(long)]
        repeat_every: Option<i64>,
    },
    /// List efficiency records
    List,
    /// Update an efficiency record
    Update {
        id: i64,
        #[arg(long, value_parser = date_arg)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = date_arg)]
        end: Option<NaiveDate>,
        #[arg(long)]
        efficiency: Option<f64>,
        /// Repeat every N days; 0 turns repetition off
        #[arg(long)]
        repeat_every: Option<i64>,
    },
    /// Delete an efficiency record
    Delete { id: i64 },
}

pub fn run(action: EfficiencyAction) -> CmdResult {
    let config = Config::load()?;
    let db = open_db(&config)?;

    match action {
        EfficiencyAction::Add {
            start,
            end,
            efficiency,
            repeat_every,
        } => {
            let mut record = EfficiencyRecord::new(start, end, efficiency);
            if let Some(days) = repeat_every {
                record = record.repeating(days);
            }
            let id = db.insert_efficiency(&record)?;
            println!("Efficiency record created: {id}");
        }
        EfficiencyAction::List => {
            print_json(&db.list_efficiency()?)?;
        }
        EfficiencyAction::Update {
            id,
            start,
            end,
            efficiency,
            repeat_every,
        } => {
            let mut record = db.get_efficiency(id)?.ok_or(DatabaseError::NotFound {
                entity: "efficiency record",
                id: id.to_string(),
            })?;
            if let Some(start) = start {
                record.start_date = start;
            }
            if let Some(end) = end {
                record.end_date = end;
            }
            if let Some(efficiency) = efficiency {
                record.efficiency = efficiency;
            }
            match repeat_every {
                Some(0) => {
                    record.repeat = false;
                    record.interval_days = None;
                }
                Some(days) => record = record.repeating(days),
                None => {}
            }
            db.update_efficiency(&record)?;
            print_json(&record)?;
        }
        EfficiencyAction::Delete { id } => {
            db.delete_efficiency(id)?;
            println!("Efficiency record deleted: {id}");
        }
    }
    Ok(())
}
