//! Daily task data model.
//!
//! A task belongs to exactly one calendar date and never moves. Its lifecycle
//! is:
//!
//! ```text
//! Pending -> Completed -> Pending
//! Pending -> Missed -> Completed
//! ```
//!
//! A task is never both completed and missed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("'{s}' is not one of High, Medium, Low"),
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(s)
    }
}

/// Local time of day at minute precision, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DueTime(NaiveTime);

impl DueTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(DueTime)
    }

    /// The due time of an instant, truncated to the minute.
    pub fn of(at: NaiveDateTime) -> Self {
        // hour/minute of a valid instant always form a valid time
        DueTime(NaiveTime::from_hms_opt(at.hour(), at.minute(), 0).unwrap_or(NaiveTime::MIN))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for DueTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidDueTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        DueTime::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for DueTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DueTime> for String {
    fn from(value: DueTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DueTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

/// One unit of planned work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<DueTime>,
    pub priority: Priority,
    pub date: NaiveDate,
    pub completed: bool,
    pub missed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else if self.missed {
            TaskStatus::Missed
        } else {
            TaskStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == TaskStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Missed,
}

/// User-supplied fields of a new task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub name: String,
    #[serde(default)]
    pub due_time: Option<DueTime>,
    #[serde(default)]
    pub priority: Priority,
    pub date: NaiveDate,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            due_time: None,
            priority: Priority::default(),
            date,
        }
    }

    pub fn due_at(mut self, due_time: DueTime) -> Self {
        self.due_time = Some(due_time);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    /// Build the pending task. The caller supplies identity and creation time.
    pub fn into_task(self, id: String, created_at: NaiveDateTime) -> Task {
        Task {
            id,
            name: self.name.trim().to_string(),
            due_time: self.due_time,
            priority: self.priority,
            date: self.date,
            completed: false,
            missed: false,
            completed_at: None,
            missed_at: None,
            created_at,
        }
    }
}

/// A week's free-text goals keyed by date. Only used to spawn tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyGoals {
    pub id: String,
    /// Monday of the planned week.
    pub week_start: NaiveDate,
    pub goals: BTreeMap<NaiveDate, Vec<String>>,
    pub created_at: NaiveDateTime,
}

impl WeeklyGoals {
    pub fn total_goals(&self) -> usize {
        self.goals.values().map(Vec::len).sum()
    }
}
