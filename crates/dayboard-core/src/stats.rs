//! Derived productivity statistics over the task collection.
//!
//! Everything here is a pure function of the tasks and "today".

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::goals::week_start;
use crate::task::Task;

/// Upper bound on the backward walk of [`current_streak`].
pub const MAX_STREAK_DAYS: u32 = 365;

fn completed_days(tasks: &[Task]) -> HashSet<NaiveDate> {
    tasks.iter().filter(|t| t.completed).map(|t| t.date).collect()
}

/// Count consecutive days, walking backward, that have at least one
/// completed task.
///
/// Today is not yet a failed day: if it has no completed task the walk
/// starts from yesterday instead.
pub fn current_streak(tasks: &[Task], today: NaiveDate) -> u32 {
    let days = completed_days(tasks);
    let start = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };
    match start {
        Some(start) => walk_back(&days, start, None, MAX_STREAK_DAYS),
        None => 0,
    }
}

/// Streak ending exactly on `day`, not walking past `floor`, at most `cap`
/// days long.
pub fn streak_ending(tasks: &[Task], day: NaiveDate, floor: Option<NaiveDate>, cap: u32) -> u32 {
    walk_back(&completed_days(tasks), day, floor, cap)
}

fn walk_back(days: &HashSet<NaiveDate>, start: NaiveDate, floor: Option<NaiveDate>, cap: u32) -> u32 {
    let mut streak = 0;
    let mut cursor = start;
    while streak < cap {
        if floor.is_some_and(|f| cursor < f) || !days.contains(&cursor) {
            break;
        }
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

/// How today is going, as a coarse tier for encouragement messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivationTier {
    Perfect,
    Excellent,
    Good,
    Progress,
    Started,
    Ready,
}

impl MotivationTier {
    pub fn for_rate(rate: f64) -> Self {
        if rate >= 100.0 {
            MotivationTier::Perfect
        } else if rate >= 80.0 {
            MotivationTier::Excellent
        } else if rate >= 60.0 {
            MotivationTier::Good
        } else if rate >= 40.0 {
            MotivationTier::Progress
        } else if rate > 0.0 {
            MotivationTier::Started
        } else {
            MotivationTier::Ready
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            MotivationTier::Perfect => "Perfect day! All tasks completed!",
            MotivationTier::Excellent => "Excellent progress! Almost there!",
            MotivationTier::Good => "Good work! Keep it up!",
            MotivationTier::Progress => "Making progress! You've got this!",
            MotivationTier::Started => "Great start! Keep going!",
            MotivationTier::Ready => "Ready to tackle the day?",
        }
    }
}

/// Today/week counts and streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub completed_today: usize,
    pub total_today: usize,
    pub completed_this_week: usize,
    pub total_this_week: usize,
    pub streak: u32,
    /// Percentage of today's tasks completed, 0 when there are none.
    pub completion_rate: f64,
    pub motivation: MotivationTier,
}

impl DailyStats {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let monday = week_start(today);
        let sunday = monday + Duration::days(6);

        let today_tasks: Vec<&Task> = tasks.iter().filter(|t| t.date == today).collect();
        let week_tasks: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.date >= monday && t.date <= sunday)
            .collect();

        let completed_today = today_tasks.iter().filter(|t| t.completed).count();
        let total_today = today_tasks.len();
        let completion_rate = if total_today > 0 {
            completed_today as f64 / total_today as f64 * 100.0
        } else {
            0.0
        };

        Self {
            completed_today,
            total_today,
            completed_this_week: week_tasks.iter().filter(|t| t.completed).count(),
            total_this_week: week_tasks.len(),
            streak: current_streak(tasks, today),
            completion_rate,
            motivation: MotivationTier::for_rate(completion_rate),
        }
    }
}

/// Month-over-month comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub tasks_completed: usize,
    pub last_month_completed: usize,
    pub streak: u32,
    pub last_month_streak: u32,
    /// Percentage change in completions against last month.
    pub tasks_completed_trend: i64,
    /// Percentage change of the current streak against last month's closing streak.
    pub streak_trend: i64,
}

impl MonthlyTrend {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let month_start = today.with_day(1).unwrap_or(today);
        let last_month_end = month_start.pred_opt().unwrap_or(month_start);
        let last_month_start = last_month_end.with_day(1).unwrap_or(last_month_end);

        let in_range = |t: &&Task, from: NaiveDate, to: NaiveDate| t.date >= from && t.date <= to;
        let tasks_completed = tasks
            .iter()
            .filter(|t| t.completed && in_range(t, month_start, month_end(today)))
            .count();
        let last_month_completed = tasks
            .iter()
            .filter(|t| t.completed && in_range(t, last_month_start, last_month_end))
            .count();

        let streak = current_streak(tasks, today);
        let last_month_streak = streak_ending(tasks, last_month_end, Some(last_month_start), 31);

        Self {
            tasks_completed,
            last_month_completed,
            streak,
            last_month_streak,
            tasks_completed_trend: percent_change(tasks_completed as i64, last_month_completed as i64),
            streak_trend: percent_change(streak as i64, last_month_streak as i64),
        }
    }
}

fn month_end(day: NaiveDate) -> NaiveDate {
    let (y, m) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(day)
}

fn percent_change(current: i64, previous: i64) -> i64 {
    if previous > 0 {
        ((current - previous) as f64 / previous as f64 * 100.0).round() as i64
    } else if current > 0 {
        100
    } else {
        0
    }
}
