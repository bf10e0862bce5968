//! Weekend planning prompt: once per Saturday or Sunday, inside the daytime
//! window, ask the host to open the weekly-planning flow.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use tracing::{debug, info};

use crate::error::Result;
use crate::kv::{KeyValueStore, LAST_WEEKEND_PLANNING_PROMPT};

pub const DEFAULT_START_HOUR: u32 = 9;
pub const DEFAULT_END_HOUR: u32 = 21;

#[derive(Debug, Clone)]
pub struct WeekendPlanningTrigger {
    start_hour: u32,
    /// Inclusive.
    end_hour: u32,
}

impl Default for WeekendPlanningTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_START_HOUR, DEFAULT_END_HOUR)
    }
}

impl WeekendPlanningTrigger {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        let start_hour = start_hour.min(23);
        Self {
            start_hour,
            end_hour: end_hour.clamp(start_hour, 23),
        }
    }

    pub fn window(&self) -> (u32, u32) {
        (self.start_hour, self.end_hour)
    }

    /// Returns true when the planning flow should open now. The marker is
    /// persisted before returning, so a true result happens once per day.
    pub fn tick<K: KeyValueStore + ?Sized>(&self, kv: &mut K, now: NaiveDateTime) -> Result<bool> {
        let today = now.date();
        if !is_weekend(today) {
            return Ok(false);
        }
        if last_prompt(kv)? == Some(today) {
            debug!(%today, "weekend planning already prompted");
            return Ok(false);
        }
        let hour = now.hour();
        if hour < self.start_hour || hour > self.end_hour {
            return Ok(false);
        }
        self.trigger(kv, now)?;
        Ok(true)
    }

    /// Record today's prompt unconditionally (manual "plan week").
    pub fn trigger<K: KeyValueStore + ?Sized>(&self, kv: &mut K, now: NaiveDateTime) -> Result<()> {
        let today = now.date();
        kv.set(LAST_WEEKEND_PLANNING_PROMPT, &today.format("%Y-%m-%d").to_string())?;
        info!(%today, "weekend planning prompt");
        Ok(())
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn last_prompt<K: KeyValueStore + ?Sized>(kv: &K) -> Result<Option<NaiveDate>> {
    Ok(kv
        .get(LAST_WEEKEND_PLANNING_PROMPT)?
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    // 2024-03-09 is a Saturday.
    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fires_once_per_weekend_day() {
        let trigger = WeekendPlanningTrigger::default();
        let mut kv = MemoryStore::new();
        assert!(trigger.tick(&mut kv, at(9, 10, 0)).unwrap());
        assert!(!trigger.tick(&mut kv, at(9, 11, 0)).unwrap());
        assert!(!trigger.tick(&mut kv, at(9, 20, 0)).unwrap());
        assert_eq!(
            kv.get(LAST_WEEKEND_PLANNING_PROMPT).unwrap().as_deref(),
            Some("2024-03-09")
        );
        // Sunday is a new day.
        assert!(trigger.tick(&mut kv, at(10, 9, 0)).unwrap());
    }

    #[test]
    fn never_on_weekdays() {
        let trigger = WeekendPlanningTrigger::default();
        let mut kv = MemoryStore::new();
        for day in 4..=8 {
            assert!(!trigger.tick(&mut kv, at(day, 12, 0)).unwrap());
        }
        assert!(kv.is_empty());
    }

    #[test]
    fn respects_hour_window() {
        let trigger = WeekendPlanningTrigger::default();
        let mut kv = MemoryStore::new();
        assert!(!trigger.tick(&mut kv, at(9, 8, 59)).unwrap());
        assert!(!trigger.tick(&mut kv, at(9, 22, 0)).unwrap());
        assert!(kv.is_empty());
        assert!(trigger.tick(&mut kv, at(9, 21, 59)).unwrap());
    }

    #[test]
    fn manual_trigger_sets_marker() {
        let trigger = WeekendPlanningTrigger::default();
        let mut kv = MemoryStore::new();
        trigger.trigger(&mut kv, at(9, 7, 0)).unwrap();
        assert!(!trigger.tick(&mut kv, at(9, 12, 0)).unwrap());
    }

    #[test]
    fn window_is_clamped() {
        assert_eq!(WeekendPlanningTrigger::new(30, 5).window(), (23, 23));
        assert_eq!(WeekendPlanningTrigger::new(10, 5).window(), (10, 10));
    }
}
