use serde::Serialize;

use dayboard_core::{DailyStats, MonthlyTrend};

use crate::context::{self, print_json};

#[derive(Serialize)]
struct StatsReport {
    today: DailyStats,
    month: MonthlyTrend,
    motivation: &'static str,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let dash = context::open()?;
    let today = dash.stats();
    let motivation = today.motivation.message();
    print_json(&StatsReport {
        today,
        month: dash.monthly_trend(),
        motivation,
    })
}
