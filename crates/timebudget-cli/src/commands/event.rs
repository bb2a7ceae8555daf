//! Calendar event commands for CLI.

use chrono::{NaiveDate, NaiveDateTime};
use clap::Subcommand;
use timebudget_core::{CalendarEvent, Config, DateRange};

use super::{date_arg, datetime_arg, open_db, print_json, today, CmdResult};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a confirmed event
    Add {
        title: String,
        /// Start (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = datetime_arg)]
        start: NaiveDateTime,
        /// End (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = datetime_arg)]
        end: NaiveDateTime,
    },
    /// List events for a day (default: today) or a range
    List {
        #[arg(long, value_parser = date_arg, conflicts_with_all = ["from", "to"])]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = date_arg, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = date_arg, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Delete an event
    Delete { id: String },
    /// Attach an info link or proof path to an event on a day
    Meta {
        event_id: String,
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        proof: Option<String>,
    },
    /// Show event metadata recorded for a day
    MetaList {
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: EventAction) -> CmdResult {
    let config = Config::load()?;
    let db = open_db(&config)?;

    match action {
        EventAction::Add { title, start, end } => {
            let event = CalendarEvent::new(title, start, end);
            db.insert_event(&event)?;
            println!("Event created: {}", event.id);
        }
        EventAction::List { date, from, to } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => DateRange::new(from, to),
                _ => DateRange::single(date.unwrap_or_else(today)),
            };
            print_json(&db.list_events(&range)?)?;
        }
        EventAction::Delete { id } => {
            db.delete_event(&id)?;
            println!("Event deleted: {id}");
        }
        EventAction::Meta {
            event_id,
            date,
            url,
            proof,
        } => {
            db.upsert_event_meta(&event_id, date, url.as_deref(), proof.as_deref())?;
            println!("Event meta saved: {event_id} on {date}");
        }
        EventAction::MetaList { date } => {
            print_json(&db.event_meta_on(date.unwrap_or_else(today))?)?;
        }
    }
    Ok(())
}
