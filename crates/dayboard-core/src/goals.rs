//! Weekly planning: Monday-start weeks of free-text goals that spawn tasks.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::task::{Priority, TaskDraft, WeeklyGoals};

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The seven dates of the week starting at `monday`.
pub fn week_days(monday: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..7).map(move |i| monday + Duration::days(i))
}

/// Goals entered in the planning flow for one week, before they are saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    pub week_start: NaiveDate,
    pub goals: BTreeMap<NaiveDate, Vec<String>>,
}

impl WeeklyPlan {
    /// Empty plan for the week containing `date`, with an entry per day.
    pub fn for_week_of(date: NaiveDate) -> Self {
        let monday = week_start(date);
        Self {
            week_start: monday,
            goals: week_days(monday).map(|d| (d, Vec::new())).collect(),
        }
    }

    /// Add a goal on `date`. Blank goals are ignored; dates outside the week
    /// are rejected.
    pub fn add_goal(&mut self, date: NaiveDate, goal: &str) -> Result<(), ValidationError> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Ok(());
        }
        if date < self.week_start || date > self.week_start + Duration::days(6) {
            return Err(ValidationError::InvalidValue {
                field: "date".into(),
                message: format!("{date} is outside the week of {}", self.week_start),
            });
        }
        self.goals.entry(date).or_default().push(goal.to_string());
        Ok(())
    }

    pub fn remove_goal(&mut self, date: NaiveDate, index: usize) -> Option<String> {
        let day = self.goals.get_mut(&date)?;
        (index < day.len()).then(|| day.remove(index))
    }

    pub fn total_goals(&self) -> usize {
        self.goals.values().map(Vec::len).sum()
    }

    /// One Medium-priority draft per goal, on the goal's date.
    pub fn materialize(&self) -> Vec<TaskDraft> {
        self.goals
            .iter()
            .flat_map(|(date, goals)| {
                goals
                    .iter()
                    .map(move |g| TaskDraft::new(g.clone(), *date).with_priority(Priority::Medium))
            })
            .collect()
    }

    /// Goals in `self` that `previous` does not already have, per date.
    /// Repeated goals count separately.
    pub fn added_since(&self, previous: &WeeklyPlan) -> WeeklyPlan {
        let mut added = WeeklyPlan {
            week_start: self.week_start,
            goals: BTreeMap::new(),
        };
        for (date, goals) in &self.goals {
            let mut seen: Vec<&String> = previous
                .goals
                .get(date)
                .map(|g| g.iter().collect())
                .unwrap_or_default();
            for goal in goals {
                match seen.iter().position(|s| *s == goal) {
                    Some(pos) => {
                        seen.swap_remove(pos);
                    }
                    None => added.goals.entry(*date).or_default().push(goal.clone()),
                }
            }
        }
        added
    }

    /// The persisted record for this plan.
    pub fn into_goals(self, id: String, created_at: NaiveDateTime) -> Result<WeeklyGoals, ValidationError> {
        if week_start(self.week_start) != self.week_start {
            return Err(ValidationError::NotAMonday(self.week_start));
        }
        Ok(WeeklyGoals {
            id,
            week_start: self.week_start,
            goals: self.goals,
            created_at,
        })
    }
}

impl From<&WeeklyGoals> for WeeklyPlan {
    fn from(goals: &WeeklyGoals) -> Self {
        Self {
            week_start: goals.week_start,
            goals: goals.goals.clone(),
        }
    }
}
