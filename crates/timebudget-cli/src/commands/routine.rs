//! Routine management commands for CLI.

use clap::Subcommand;
use timebudget_core::{Config, DatabaseError, Routine};

use super::{open_db, print_json, CmdResult};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Add a routine
    Add {
        /// Routine title ("Sleep" is counted separately)
        title: String,
        /// Hours per occurrence
        #[arg(long)]
        hours: f64,
        /// Occurs every N days (default: 1)
        #[arg(long, default_value = "1")]
        period_days: i64,
    },
    /// List routines
    List,
    /// Update a routine
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        period_days: Option<i64>,
    },
    /// Delete a routine
    Delete { id: i64 },
}

pub fn run(action: RoutineAction) -> CmdResult {
    let config = Config::load()?;
    let db = open_db(&config)?;

    match action {
        RoutineAction::Add {
            title,
            hours,
            period_days,
        } => {
            let id = db.insert_routine(&Routine::new(title, hours, period_days))?;
            println!("Routine created: {id}");
        }
        RoutineAction::List => {
            print_json(&db.list_routines()?)?;
        }
        RoutineAction::Update {
            id,
            title,
            hours,
            period_days,
        } => {
            let mut routine = db.get_routine(id)?.ok_or(DatabaseError::NotFound {
                entity: "routine",
                id: id.to_string(),
            })?;
            if let Some(title) = title {
                routine.title = title;
            }
            if let Some(hours) = hours {
                routine.hours = hours;
            }
            if let Some(period_days) = period_days {
                routine.period_days = period_days;
            }
            db.update_routine(&routine)?;
            print_json(&routine)?;
        }
        RoutineAction::Delete { id } => {
            db.delete_routine(id)?;
            println!("Routine deleted: {id}");
        }
    }
    Ok(())
}
