use clap::Subcommand;
use serde::Serialize;

use crate::context::{self, print_json};

#[derive(Subcommand)]
pub enum ScoreAction {
    /// Current score, its label and the recent trend
    Show,
    /// Most recent score changes, newest first
    History {
        /// Number of entries (max 50 are kept)
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Serialize)]
struct ScoreSummary {
    total_score: i32,
    label: &'static str,
    recent_trend: i32,
    last_updated: chrono::NaiveDateTime,
}

pub fn run(action: ScoreAction) -> Result<(), Box<dyn std::error::Error>> {
    let dash = context::open()?;
    let score = dash.score();
    match action {
        ScoreAction::Show => print_json(&ScoreSummary {
            total_score: score.total_score,
            label: score.label().description(),
            recent_trend: score.recent_trend(),
            last_updated: score.last_updated,
        })?,
        ScoreAction::History { limit } => {
            let entries: Vec<_> = score.recent(limit).collect();
            print_json(&entries)?;
        }
    }
    Ok(())
}
