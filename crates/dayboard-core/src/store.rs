//! Authoritative task collection and its state transitions.
//!
//! Every mutation is a [`Command`]. [`reduce`] is a pure function from the
//! current [`PlannerState`] and a command to the next state; score side
//! effects are delegated to [`crate::scoring::apply_score_change`].
//! [`TaskStore`] wraps the state and supplies identity and time.
//!
//! Commands that target an unknown id are no-ops, never errors.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::scoring::{
    apply_score_change, bulk_completion_bonus, ProductivityScore, COMPLETION_POINTS,
    MISSED_PENALTY,
};
use crate::task::{Task, TaskDraft, WeeklyGoals};

/// Everything the task lifecycle owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub weekly_goals: Vec<WeeklyGoals>,
    pub score: ProductivityScore,
}

impl PlannerState {
    pub fn new(score: ProductivityScore) -> Self {
        Self {
            tasks: Vec::new(),
            weekly_goals: Vec::new(),
            score,
        }
    }
}

/// A state transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AddTask { task: Task },
    UpdateTask { task: Task },
    DeleteTask { id: String },
    ToggleCompletion { id: String },
    MarkMissed { id: String },
    MarkAllComplete { date: NaiveDate },
    AddWeeklyGoals { goals: WeeklyGoals },
    UpdateWeeklyGoals { goals: WeeklyGoals },
    AdjustScore {
        change: i32,
        reason: String,
        task_id: Option<String>,
    },
}

/// Apply `command` at `now`. Returns the unchanged state for no-ops.
pub fn reduce(state: &PlannerState, command: &Command, now: NaiveDateTime) -> PlannerState {
    try_reduce(state, command, now).unwrap_or_else(|| state.clone())
}

/// Apply `command` at `now`, or `None` if it has no effect.
pub fn try_reduce(
    state: &PlannerState,
    command: &Command,
    now: NaiveDateTime,
) -> Option<PlannerState> {
    let today = now.date();
    match command {
        Command::AddTask { task } => {
            if state.tasks.iter().any(|t| t.id == task.id) {
                return None;
            }
            let mut next = state.clone();
            next.tasks.push(task.clone());
            Some(next)
        }

        Command::UpdateTask { task } => {
            let idx = position(state, &task.id)?;
            let existing = &state.tasks[idx];
            let mut replacement = task.clone();
            // Identity, creation time and date are fixed at creation.
            replacement.created_at = existing.created_at;
            replacement.date = existing.date;
            if replacement.completed && replacement.missed {
                replacement.missed = false;
                replacement.missed_at = None;
            }
            let mut next = state.clone();
            next.tasks[idx] = replacement;
            Some(next)
        }

        Command::DeleteTask { id } => {
            let idx = position(state, id)?;
            let mut next = state.clone();
            next.tasks.remove(idx);
            Some(next)
        }

        Command::ToggleCompletion { id } => {
            let idx = position(state, id)?;
            let mut next = state.clone();
            let task = &mut next.tasks[idx];
            let (change, reason) = if task.completed {
                task.completed = false;
                task.completed_at = None;
                (-COMPLETION_POINTS, "Task uncompleted")
            } else {
                task.completed = true;
                task.completed_at = Some(now);
                task.missed = false;
                task.missed_at = None;
                (COMPLETION_POINTS, "Task completed")
            };
            next.score = apply_score_change(&state.score, change, reason, Some(id.as_str()), today, now);
            Some(next)
        }

        Command::MarkMissed { id } => {
            let idx = position(state, id)?;
            if !state.tasks[idx].is_pending() {
                return None;
            }
            let mut next = state.clone();
            let task = &mut next.tasks[idx];
            task.missed = true;
            task.missed_at = Some(now);
            next.score =
                apply_score_change(&state.score, MISSED_PENALTY, "Task missed", Some(id.as_str()), today, now);
            Some(next)
        }

        Command::MarkAllComplete { date } => {
            let mut next = state.clone();
            let mut completed = 0usize;
            for task in next
                .tasks
                .iter_mut()
                .filter(|t| t.date == *date && !t.completed)
            {
                task.completed = true;
                task.completed_at = Some(now);
                task.missed = false;
                task.missed_at = None;
                completed += 1;
            }
            if completed == 0 {
                return None;
            }
            next.score = apply_score_change(
                &state.score,
                bulk_completion_bonus(completed),
                format!("Completed all {completed} tasks for the day"),
                None,
                today,
                now,
            );
            Some(next)
        }

        Command::AddWeeklyGoals { goals } => {
            if state.weekly_goals.iter().any(|g| g.id == goals.id) {
                return None;
            }
            let mut next = state.clone();
            next.weekly_goals.push(goals.clone());
            Some(next)
        }

        Command::UpdateWeeklyGoals { goals } => {
            let idx = state.weekly_goals.iter().position(|g| g.id == goals.id)?;
            let mut next = state.clone();
            next.weekly_goals[idx] = goals.clone();
            Some(next)
        }

        Command::AdjustScore {
            change,
            reason,
            task_id,
        } => {
            let mut next = state.clone();
            next.score = apply_score_change(
                &state.score,
                *change,
                reason.as_str(),
                task_id.as_deref(),
                today,
                now,
            );
            Some(next)
        }
    }
}

fn position(state: &PlannerState, id: &str) -> Option<usize> {
    state.tasks.iter().position(|t| t.id == id)
}

/// Owner of the planner state.
#[derive(Debug, Clone)]
pub struct TaskStore {
    state: PlannerState,
}

impl TaskStore {
    pub fn new(state: PlannerState) -> Self {
        Self { state }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn into_state(self) -> PlannerState {
        self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks_on(&self, date: NaiveDate) -> impl Iterator<Item = &Task> {
        self.state.tasks.iter().filter(move |t| t.date == date)
    }

    pub fn score(&self) -> &ProductivityScore {
        &self.state.score
    }

    pub fn weekly_goals(&self) -> &[WeeklyGoals] {
        &self.state.weekly_goals
    }

    pub fn weekly_goals_for(&self, week_start: NaiveDate) -> Option<&WeeklyGoals> {
        self.state
            .weekly_goals
            .iter()
            .find(|g| g.week_start == week_start)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply a command. Returns whether the state changed.
    pub fn apply(&mut self, command: Command, now: NaiveDateTime) -> bool {
        match try_reduce(&self.state, &command, now) {
            Some(next) => {
                debug!(?command, "store transition applied");
                self.state = next;
                true
            }
            None => {
                debug!(?command, "store command had no effect");
                false
            }
        }
    }

    /// Create a task with a fresh id.
    pub fn add_task(&mut self, draft: TaskDraft, now: NaiveDateTime) -> Result<Task, ValidationError> {
        draft.validate()?;
        let task = draft.into_task(Uuid::new_v4().to_string(), now);
        self.apply(Command::AddTask { task: task.clone() }, now);
        Ok(task)
    }

    pub fn update_task(&mut self, task: Task, now: NaiveDateTime) -> bool {
        self.apply(Command::UpdateTask { task }, now)
    }

    pub fn delete_task(&mut self, id: &str, now: NaiveDateTime) -> bool {
        self.apply(Command::DeleteTask { id: id.to_string() }, now)
    }

    pub fn toggle_completion(&mut self, id: &str, now: NaiveDateTime) -> bool {
        self.apply(Command::ToggleCompletion { id: id.to_string() }, now)
    }

    pub fn mark_missed(&mut self, id: &str, now: NaiveDateTime) -> bool {
        self.apply(Command::MarkMissed { id: id.to_string() }, now)
    }

    pub fn mark_all_complete(&mut self, date: NaiveDate, now: NaiveDateTime) -> bool {
        self.apply(Command::MarkAllComplete { date }, now)
    }

    pub fn add_weekly_goals(&mut self, goals: WeeklyGoals, now: NaiveDateTime) -> bool {
        self.apply(Command::AddWeeklyGoals { goals }, now)
    }

    pub fn update_weekly_goals(&mut self, goals: WeeklyGoals, now: NaiveDateTime) -> bool {
        self.apply(Command::UpdateWeeklyGoals { goals }, now)
    }

    pub fn adjust_score(
        &mut self,
        change: i32,
        reason: impl Into<String>,
        task_id: Option<String>,
        now: NaiveDateTime,
    ) -> bool {
        self.apply(
            Command::AdjustScore {
                change,
                reason: reason.into(),
                task_id,
            },
            now,
        )
    }
}
