//! Draft event commands for CLI.

use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;
use timebudget_core::{Candidate, Config, DatabaseError};

use super::{date_arg, open_db, print_json, time_arg, today, CmdResult};

#[derive(Subcommand)]
pub enum CandidateAction {
    /// Add a draft event
    Add {
        title: String,
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,
        /// Start time (HH:MM)
        #[arg(long, value_parser = time_arg)]
        start: NaiveTime,
        /// End time (HH:MM)
        #[arg(long, value_parser = time_arg)]
        end: NaiveTime,
        #[arg(long)]
        url: Option<String>,
    },
    /// List drafts for a day (default: today)
    List {
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Show one draft
    Show { id: i64 },
    /// Update a draft
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = time_arg)]
        start: Option<NaiveTime>,
        #[arg(long, value_parser = time_arg)]
        end: Option<NaiveTime>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Move a draft to the recently-deleted bin
    Delete { id: i64 },
    /// List recently deleted drafts
    Trash {
        #[arg(long, default_value = "50")]
        limit: usize,
        /// Only drafts deleted within this many days
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Permanently remove a draft from the bin
    Purge { id: i64 },
    /// Restore a draft from the bin
    Restore { id: i64 },
    /// Turn a draft into a confirmed calendar event
    Promote { id: i64 },
}

fn not_found(id: i64) -> DatabaseError {
    DatabaseError::NotFound {
        entity: "candidate",
        id: id.to_string(),
    }
}

pub fn run(action: CandidateAction) -> CmdResult {
    let config = Config::load()?;
    let db = open_db(&config)?;

    match action {
        CandidateAction::Add {
            title,
            date,
            start,
            end,
            url,
        } => {
            let mut candidate = Candidate::new(date, title, start, end);
            candidate.info_url = url;
            let id = db.insert_candidate(&candidate)?;
            println!("Candidate created: {id}");
        }
        CandidateAction::List { date } => {
            print_json(&db.list_candidates_on(date.unwrap_or_else(today))?)?;
        }
        CandidateAction::Show { id } => {
            let candidate = db.get_candidate(id)?.ok_or_else(|| not_found(id))?;
            print_json(&candidate)?;
        }
        CandidateAction::Update {
            id,
            title,
            date,
            start,
            end,
            url,
        } => {
            let mut candidate = db.get_candidate(id)?.ok_or_else(|| not_found(id))?;
            if let Some(title) = title {
                candidate.title = title;
            }
            if let Some(date) = date {
                candidate.date = date;
            }
            if let Some(start) = start {
                candidate.start_time = start;
            }
            if let Some(end) = end {
                candidate.end_time = end;
            }
            if url.is_some() {
                candidate.info_url = url;
            }
            db.update_candidate(&candidate)?;
            print_json(&candidate)?;
        }
        CandidateAction::Delete { id } => {
            db.delete_candidate(id)?;
            println!("Candidate moved to trash: {id}");
        }
        CandidateAction::Trash { limit, days } => {
            print_json(&db.list_trash(limit, Some(days))?)?;
        }
        CandidateAction::Purge { id } => {
            db.purge_trash(id)?;
            println!("Candidate purged: {id}");
        }
        CandidateAction::Restore { id } => {
            db.restore_candidate(id)?;
            println!("Candidate restored: {id}");
        }
        CandidateAction::Promote { id } => {
            let event = db.promote_candidate(id)?;
            println!("Event created: {}", event.id);
        }
    }
    Ok(())
}
