//! Task management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use dayboard_core::{parse_date, Clock, DueTime, Priority, TaskDraft};

use crate::context::{self, print_json, CliDashboard};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task name
        name: String,
        /// Due time, HH:MM
        #[arg(long)]
        due: Option<DueTime>,
        /// high, medium or low (default: medium)
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Date, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// List tasks
    List {
        /// Only tasks on this date, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date, conflicts_with = "all")]
        date: Option<NaiveDate>,
        /// Every task on every date
        #[arg(long)]
        all: bool,
    },
    /// Edit a task's name, due time or priority
    Edit {
        /// Task ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New due time, HH:MM
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<DueTime>,
        /// Remove the due time
        #[arg(long)]
        clear_due: bool,
        /// New priority
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Complete a pending task, or reopen a completed one
    Toggle {
        /// Task ID
        id: String,
    },
    /// Mark a pending task as missed
    Miss {
        /// Task ID
        id: String,
    },
    /// Complete every unfinished task of a day
    CompleteAll {
        /// Date, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut dash = context::open()?;
    let today = dash.clock().today();

    match action {
        TaskAction::Add {
            name,
            due,
            priority,
            date,
        } => {
            let mut draft = TaskDraft::new(name, date.unwrap_or(today)).with_priority(priority);
            if let Some(due) = due {
                draft = draft.due_at(due);
            }
            let task = dash.add_task(draft)?;
            context::save(&mut dash)?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List { date, all } => {
            if all {
                print_json(&dash.tasks())?;
            } else {
                print_json(&dash.tasks_on(date.unwrap_or(today)))?;
            }
        }
        TaskAction::Edit {
            id,
            name,
            due,
            clear_due,
            priority,
        } => {
            let mut task = existing(&dash, &id)?.clone();
            if let Some(name) = name {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(dayboard_core::ValidationError::EmptyName.into());
                }
                task.name = name;
            }
            if clear_due {
                task.due_time = None;
            } else if due.is_some() {
                task.due_time = due;
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            dash.update_task(task);
            context::save(&mut dash)?;
            print_json(&existing(&dash, &id)?)?;
        }
        TaskAction::Delete { id } => {
            existing(&dash, &id)?;
            dash.delete_task(&id);
            context::save(&mut dash)?;
            println!("Task deleted: {id}");
        }
        TaskAction::Toggle { id } => {
            existing(&dash, &id)?;
            dash.toggle_completion(&id);
            context::save(&mut dash)?;
            print_json(&existing(&dash, &id)?)?;
        }
        TaskAction::Miss { id } => {
            if !existing(&dash, &id)?.is_pending() {
                return Err(format!("task {id} is not pending").into());
            }
            dash.mark_missed(&id);
            context::save(&mut dash)?;
            print_json(&existing(&dash, &id)?)?;
        }
        TaskAction::CompleteAll { date } => {
            let date = date.unwrap_or(today);
            if dash.mark_all_complete(date) {
                context::save(&mut dash)?;
                let last = dash.score().history.last().map(|e| e.reason.clone());
                println!("{}", last.unwrap_or_default());
            } else {
                println!("No unfinished tasks on {date}");
            }
        }
    }
    Ok(())
}

fn existing<'a>(
    dash: &'a CliDashboard,
    id: &str,
) -> Result<&'a dayboard_core::Task, Box<dyn std::error::Error>> {
    dash.task(id)
        .ok_or_else(|| format!("task not found: {id}").into())
}
