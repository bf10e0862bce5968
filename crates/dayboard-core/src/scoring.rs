//! Productivity score: a bounded aggregate with an audit trail.
//!
//! [`apply_score_change`] is the only way the score moves. It is a pure
//! function: "today" and "now" are parameters, never read from a clock.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 1000;
/// Starting score of a fresh planner.
pub const DEFAULT_INITIAL_SCORE: i32 = 750;
/// History keeps only this many most recent entries.
pub const HISTORY_LIMIT: usize = 50;

pub const COMPLETION_POINTS: i32 = 10;
pub const MISSED_PENALTY: i32 = -5;
pub const ALL_COMPLETE_BONUS: i32 = 20;

/// One audited score movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub date: NaiveDate,
    pub change: i32,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductivityScore {
    pub total_score: i32,
    pub last_updated: NaiveDateTime,
    pub history: Vec<ScoreEntry>,
}

impl ProductivityScore {
    pub fn new(initial: i32, at: NaiveDateTime) -> Self {
        Self {
            total_score: initial.clamp(MIN_SCORE, MAX_SCORE),
            last_updated: at,
            history: Vec::new(),
        }
    }

    pub fn label(&self) -> ScoreLabel {
        ScoreLabel::for_score(self.total_score)
    }

    /// Net change over the last five history entries.
    pub fn recent_trend(&self) -> i32 {
        let skip = self.history.len().saturating_sub(5);
        self.history[skip..]
            .iter()
            .fold(0i32, |acc, e| acc.saturating_add(e.change))
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &ScoreEntry> {
        self.history.iter().rev().take(limit)
    }
}

/// Qualitative band of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLabel {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl ScoreLabel {
    pub fn for_score(score: i32) -> Self {
        match score {
            s if s >= 800 => ScoreLabel::Excellent,
            s if s >= 600 => ScoreLabel::Good,
            s if s >= 400 => ScoreLabel::Fair,
            _ => ScoreLabel::NeedsImprovement,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Excellent",
            ScoreLabel::Good => "Good",
            ScoreLabel::Fair => "Fair",
            ScoreLabel::NeedsImprovement => "Needs Improvement",
        }
    }
}

/// Apply `change` to `score`.
///
/// The total is clamped into `[MIN_SCORE, MAX_SCORE]` and the history is
/// appended then truncated to the last [`HISTORY_LIMIT`] entries.
pub fn apply_score_change(
    score: &ProductivityScore,
    change: i32,
    reason: impl Into<String>,
    task_id: Option<&str>,
    today: NaiveDate,
    now: NaiveDateTime,
) -> ProductivityScore {
    let total_score = score
        .total_score
        .saturating_add(change)
        .clamp(MIN_SCORE, MAX_SCORE);

    let skip = (score.history.len() + 1).saturating_sub(HISTORY_LIMIT);
    let mut history: Vec<ScoreEntry> = score.history.iter().skip(skip).cloned().collect();
    history.push(ScoreEntry {
        date: today,
        change,
        reason: reason.into(),
        task_id: task_id.map(str::to_string),
    });

    ProductivityScore {
        total_score,
        last_updated: now,
        history,
    }
}

/// Score change for completing `count` tasks at once via mark-all-complete.
pub fn bulk_completion_bonus(count: usize) -> i32 {
    let count = i32::try_from(count).unwrap_or(i32::MAX);
    count
        .saturating_mul(COMPLETION_POINTS)
        .saturating_add(ALL_COMPLETE_BONUS)
}
