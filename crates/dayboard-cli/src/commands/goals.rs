//! Weekly planning commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use dayboard_core::{parse_date, week_start, Clock, ValidationError, WeeklyPlan};

use crate::context::{self, print_json};

#[derive(Subcommand)]
pub enum GoalsAction {
    /// Save goals for a week and create a task for each
    Plan {
        /// Any date in the week to plan (default: next week when run on a
        /// weekend, otherwise this week)
        #[arg(long, value_parser = parse_date)]
        week_of: Option<NaiveDate>,
        /// A goal as YYYY-MM-DD=text; repeat for more goals
        #[arg(long = "goal", value_parser = parse_goal, required = true)]
        goals: Vec<(NaiveDate, String)>,
    },
    /// List saved weekly goals
    List,
}

fn parse_goal(raw: &str) -> Result<(NaiveDate, String), ValidationError> {
    let (date, text) = raw.split_once('=').ok_or_else(|| ValidationError::InvalidValue {
        field: "goal".into(),
        message: format!("'{raw}' is not YYYY-MM-DD=text"),
    })?;
    Ok((parse_date(date)?, text.trim().to_string()))
}

pub fn run(action: GoalsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut dash = context::open()?;
    match action {
        GoalsAction::Plan { week_of, goals } => {
            let week_of = week_of.unwrap_or_else(|| default_week(dash.clock().today()));
            let mut plan = dash
                .weekly_goals()
                .iter()
                .find(|g| g.week_start == week_start(week_of))
                .map(WeeklyPlan::from)
                .unwrap_or_else(|| WeeklyPlan::for_week_of(week_of));
            for (date, goal) in &goals {
                plan.add_goal(*date, goal)?;
            }
            let saved = dash.save_weekly_plan(plan)?;
            context::save(&mut dash)?;
            println!(
                "Planned {} new task(s) for the week of {}",
                saved.tasks.len(),
                saved.goals.week_start
            );
            print_json(&saved)?;
        }
        GoalsAction::List => print_json(&dash.weekly_goals())?,
    }
    Ok(())
}

/// Planning happens on weekends for the coming week.
fn default_week(today: NaiveDate) -> NaiveDate {
    if dayboard_core::weekend::is_weekend(today) {
        week_start(today) + chrono::Duration::days(7)
    } else {
        today
    }
}
