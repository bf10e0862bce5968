//! Opening the persisted dashboard for a single CLI invocation.

use chrono::{Local, NaiveDateTime};
use dayboard_core::{Clock, Config, Dashboard, Database, Notifier};
use tracing::debug;

use crate::notifier::DesktopNotifier;

/// Pins "now" for the whole invocation, e.g. `2024-03-01T23:00:00`.
pub const NOW_ENV: &str = "DAYBOARD_NOW";

pub type CliDashboard = Dashboard<CliClock, Database, DesktopNotifier>;

/// Local system time, or a fixed instant taken from [`NOW_ENV`].
#[derive(Debug, Clone, Copy)]
pub enum CliClock {
    System,
    Fixed(NaiveDateTime),
}

impl CliClock {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        match std::env::var(NOW_ENV) {
            Ok(raw) => {
                let at = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S")
                    .map_err(|e| format!("invalid {NOW_ENV} '{raw}': {e}"))?;
                Ok(CliClock::Fixed(at))
            }
            Err(_) => Ok(CliClock::System),
        }
    }
}

impl Clock for CliClock {
    fn now(&self) -> NaiveDateTime {
        match self {
            CliClock::System => Local::now().naive_local(),
            CliClock::Fixed(at) => *at,
        }
    }
}

/// Load config and state from the data dir.
pub fn open() -> Result<CliDashboard, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let clock = CliClock::from_env()?;
    let notifier = DesktopNotifier::from_env();
    let dash = match db.load_state()? {
        Some(state) => Dashboard::new(clock, db, notifier, state, config),
        None => {
            debug!("no saved state, starting fresh");
            Dashboard::with_initial_score(clock, db, notifier, config.score.initial, config)
        }
    };
    Ok(dash)
}

/// Pick up state written by other invocations since this one loaded.
pub fn reload<C: Clock, N: Notifier>(
    dash: &mut Dashboard<C, Database, N>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(state) = dash.kv().load_state()? {
        dash.replace_state(state);
    }
    Ok(())
}

/// Persist the planner state if anything changed.
pub fn save<C: Clock, N: Notifier>(
    dash: &mut Dashboard<C, Database, N>,
) -> Result<(), Box<dyn std::error::Error>> {
    if dash.take_dirty() {
        let now = dash.clock().now();
        dash.kv().save_state(dash.state(), now)?;
    }
    Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
