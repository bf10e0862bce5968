//! End-of-day sweep: after the threshold hour, today's unfinished tasks
//! become missed, once per calendar day.
//!
//! The sweep ticks many times a day; the persisted `last-end-of-day-check`
//! marker makes its effect happen at most once per day.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::kv::{KeyValueStore, LAST_END_OF_DAY_CHECK};
use crate::notify::{Notification, Notifier, Permission};
use crate::store::TaskStore;

pub const DEFAULT_THRESHOLD_HOUR: u32 = 22;

/// What a sweep tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Still before the threshold hour.
    TooEarly,
    /// Today's sweep already ran.
    AlreadySwept,
    /// Swept; ids of the tasks marked missed (possibly none).
    Swept { missed: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct EndOfDaySweeper {
    threshold_hour: u32,
    summary_notification: bool,
}

impl Default for EndOfDaySweeper {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_HOUR)
    }
}

impl EndOfDaySweeper {
    pub fn new(threshold_hour: u32) -> Self {
        Self {
            threshold_hour: threshold_hour.min(23),
            summary_notification: true,
        }
    }

    pub fn with_summary_notification(mut self, enabled: bool) -> Self {
        self.summary_notification = enabled;
        self
    }

    pub fn threshold_hour(&self) -> u32 {
        self.threshold_hour
    }

    pub fn tick<K, N>(
        &self,
        store: &mut TaskStore,
        kv: &mut K,
        notifier: &N,
        now: NaiveDateTime,
    ) -> Result<SweepOutcome>
    where
        K: KeyValueStore + ?Sized,
        N: Notifier + ?Sized,
    {
        if now.hour() < self.threshold_hour {
            return Ok(SweepOutcome::TooEarly);
        }
        let today = now.date();
        if last_check(kv)? == Some(today) {
            debug!(%today, "end-of-day sweep already ran");
            return Ok(SweepOutcome::AlreadySwept);
        }

        let pending: Vec<String> = store
            .tasks_on(today)
            .filter(|t| t.is_pending())
            .map(|t| t.id.clone())
            .collect();
        let missed: Vec<String> = pending
            .into_iter()
            .filter(|id| store.mark_missed(id, now))
            .collect();

        kv.set(LAST_END_OF_DAY_CHECK, &today.format("%Y-%m-%d").to_string())?;
        info!(%today, missed = missed.len(), "end-of-day sweep complete");

        if !missed.is_empty()
            && self.summary_notification
            && notifier.permission() == Permission::Granted
        {
            // The summary is best effort; the sweep itself already happened.
            if let Err(e) = notifier.show(&summary(missed.len())) {
                debug!(error = %e, "end-of-day summary not shown");
            }
        }

        Ok(SweepOutcome::Swept { missed })
    }

    /// Forget today's marker and check again. Still honours the threshold hour.
    pub fn force<K, N>(
        &self,
        store: &mut TaskStore,
        kv: &mut K,
        notifier: &N,
        now: NaiveDateTime,
    ) -> Result<SweepOutcome>
    where
        K: KeyValueStore + ?Sized,
        N: Notifier + ?Sized,
    {
        kv.remove(LAST_END_OF_DAY_CHECK)?;
        self.tick(store, kv, notifier, now)
    }
}

fn last_check<K: KeyValueStore + ?Sized>(kv: &K) -> Result<Option<NaiveDate>> {
    Ok(kv
        .get(LAST_END_OF_DAY_CHECK)?
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()))
}

fn summary(count: usize) -> Notification {
    let plural = if count == 1 { "" } else { "s" };
    Notification::new(
        "Daily Review",
        format!("{count} task{plural} marked as missed. Tomorrow is a new day!"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::notify::RecordingNotifier;
    use crate::scoring::ProductivityScore;
    use crate::store::PlannerState;
    use crate::task::TaskDraft;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn store_with(names: &[&str]) -> TaskStore {
        let mut store = TaskStore::new(PlannerState::new(ProductivityScore::new(100, at(0, 0))));
        for name in names {
            store.add_task(TaskDraft::new(*name, day()), at(8, 0)).unwrap();
        }
        store
    }

    #[test]
    fn does_nothing_before_threshold() {
        let mut store = store_with(&["a"]);
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let outcome = EndOfDaySweeper::default()
            .tick(&mut store, &mut kv, &notifier, at(21, 59))
            .unwrap();
        assert_eq!(outcome, SweepOutcome::TooEarly);
        assert!(kv.is_empty());
        assert!(store.tasks()[0].is_pending());
    }

    #[test]
    fn sweeps_once_per_day() {
        let mut store = store_with(&["a", "b"]);
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let sweeper = EndOfDaySweeper::default();

        let outcome = sweeper.tick(&mut store, &mut kv, &notifier, at(23, 0)).unwrap();
        match outcome {
            SweepOutcome::Swept { missed } => assert_eq!(missed.len(), 2),
            other => panic!("expected sweep, got {other:?}"),
        }
        assert!(store.tasks().iter().all(|t| t.missed));
        assert_eq!(store.score().total_score, 90);
        assert_eq!(kv.get(LAST_END_OF_DAY_CHECK).unwrap().as_deref(), Some("2024-03-01"));

        let shown = notifier.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].body, "2 tasks marked as missed. Tomorrow is a new day!");

        let again = sweeper.tick(&mut store, &mut kv, &notifier, at(23, 30)).unwrap();
        assert_eq!(again, SweepOutcome::AlreadySwept);
        assert_eq!(store.score().total_score, 90);
        assert_eq!(notifier.shown().len(), 1);
    }

    #[test]
    fn completed_tasks_are_left_alone() {
        let mut store = store_with(&["a", "b"]);
        let done = store.tasks()[0].id.clone();
        store.toggle_completion(&done, at(12, 0));
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        EndOfDaySweeper::default()
            .tick(&mut store, &mut kv, &notifier, at(22, 0))
            .unwrap();
        assert!(store.task(&done).unwrap().completed);
        assert!(!store.task(&done).unwrap().missed);
        assert_eq!(notifier.shown()[0].body, "1 task marked as missed. Tomorrow is a new day!");
    }

    #[test]
    fn empty_day_still_sets_marker_without_notification() {
        let mut store = store_with(&[]);
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let outcome = EndOfDaySweeper::default()
            .tick(&mut store, &mut kv, &notifier, at(22, 0))
            .unwrap();
        assert_eq!(outcome, SweepOutcome::Swept { missed: vec![] });
        assert!(kv.get(LAST_END_OF_DAY_CHECK).unwrap().is_some());
        assert!(notifier.deliveries().is_empty());
    }

    #[test]
    fn summary_needs_permission() {
        let mut store = store_with(&["a"]);
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::new(Permission::Denied);
        EndOfDaySweeper::default()
            .tick(&mut store, &mut kv, &notifier, at(22, 0))
            .unwrap();
        assert!(store.tasks()[0].missed);
        assert!(notifier.deliveries().is_empty());
    }

    #[test]
    fn force_reruns_after_marker() {
        let mut store = store_with(&["a"]);
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let sweeper = EndOfDaySweeper::default();
        sweeper.tick(&mut store, &mut kv, &notifier, at(22, 0)).unwrap();
        store.add_task(TaskDraft::new("late", day()), at(22, 10)).unwrap();

        let outcome = sweeper.force(&mut store, &mut kv, &notifier, at(22, 15)).unwrap();
        match outcome {
            SweepOutcome::Swept { missed } => assert_eq!(missed.len(), 1),
            other => panic!("expected sweep, got {other:?}"),
        }
    }

    #[test]
    fn previous_day_marker_does_not_block() {
        let mut store = store_with(&["a"]);
        let mut kv = MemoryStore::new();
        kv.set(LAST_END_OF_DAY_CHECK, "2024-02-29").unwrap();
        let notifier = RecordingNotifier::granted();
        let outcome = EndOfDaySweeper::default()
            .tick(&mut store, &mut kv, &notifier, at(22, 0))
            .unwrap();
        assert!(matches!(outcome, SweepOutcome::Swept { .. }));
    }
}
