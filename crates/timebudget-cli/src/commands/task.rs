//! Task management commands for CLI.

use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;
use timebudget_core::{Config, DatabaseError, Task};

use super::{date_arg, open_db, print_json, time_arg, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Deadline date (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        due_date: NaiveDate,
        /// Deadline time (HH:MM)
        #[arg(long, value_parser = time_arg, default_value = "23:59")]
        due_time: NaiveTime,
        /// Total effort in hours
        #[arg(long)]
        hours: f64,
        /// Reference link
        #[arg(long)]
        url: Option<String>,
    },
    /// List active tasks, or completed ones with --completed
    List {
        #[arg(long)]
        completed: bool,
    },
    /// Update a task
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = date_arg)]
        due_date: Option<NaiveDate>,
        #[arg(long, value_parser = time_arg)]
        due_time: Option<NaiveTime>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Set progress (0.0-1.0, or a percentage above 1)
    Progress { id: i64, progress: f64 },
    /// Mark a task done by recording a proof path
    Complete {
        id: i64,
        /// Path to the evidence file
        #[arg(long)]
        proof: String,
    },
    /// List proofs recorded for a task
    Proofs { id: i64 },
    /// Delete a task and its proofs
    Delete { id: i64 },
}

pub fn run(action: TaskAction) -> CmdResult {
    let config = Config::load()?;
    let db = open_db(&config)?;

    match action {
        TaskAction::Add {
            title,
            due_date,
            due_time,
            hours,
            url,
        } => {
            let mut task = Task::new(title, due_date, due_time, hours);
            task.info_url = url;
            task.id = db.insert_task(&task)?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List { completed } => {
            if completed {
                print_json(&db.list_completed_tasks()?)?;
            } else {
                print_json(&db.list_active_tasks()?)?;
            }
        }
        TaskAction::Update {
            id,
            title,
            due_date,
            due_time,
            hours,
            url,
        } => {
            let mut task = db.get_task(id)?.ok_or(DatabaseError::NotFound {
                entity: "task",
                id: id.to_string(),
            })?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(due_date) = due_date {
                task.due_date = due_date;
            }
            if let Some(due_time) = due_time {
                task.due_time = due_time;
            }
            if let Some(hours) = hours {
                task.required_hours = hours;
            }
            if url.is_some() {
                task.info_url = url;
            }
            db.update_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::Progress { id, progress } => {
            db.set_task_progress(id, progress)?;
            println!("Task {id} progress updated");
        }
        TaskAction::Complete { id, proof } => {
            db.complete_task(id, &proof)?;
            println!("Task completed: {id}");
        }
        TaskAction::Proofs { id } => {
            print_json(&db.list_task_proofs(id)?)?;
        }
        TaskAction::Delete { id } => {
            db.delete_task(id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
