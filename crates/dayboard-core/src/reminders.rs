//! Due-time reminders, at most once per task per calendar day.
//!
//! The only deduplication mechanism is the persisted set of task ids already
//! notified today, stored under `notified-tasks-<YYYY-MM-DD>`. Keying by date
//! resets the set every day; keys of other days are deleted when a new day's
//! set is loaded.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::kv::{KeyValueStore, NOTIFIED_TASKS_PREFIX};
use crate::notify::{deliver, Notification, Notifier};
use crate::task::{DueTime, Task};

pub const REMINDER_TITLE: &str = "⏰ Task Reminder";

pub fn notified_key(date: NaiveDate) -> String {
    format!("{NOTIFIED_TASKS_PREFIX}{}", date.format("%Y-%m-%d"))
}

pub fn reminder_for(task: &Task) -> Notification {
    Notification::new(REMINDER_TITLE, format!("It's time for: {}", task.name))
        .tagged(format!("task-{}", task.id))
}

#[derive(Debug, Clone, Default)]
pub struct ReminderScheduler {
    day: Option<NaiveDate>,
    notified: BTreeSet<String>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids already reminded on the loaded day.
    pub fn notified(&self) -> &BTreeSet<String> {
        &self.notified
    }

    /// Check for due tasks and remind each one not yet reminded today.
    ///
    /// Returns the ids reminded on this tick.
    pub fn tick<K, N>(
        &mut self,
        tasks: &[Task],
        kv: &mut K,
        notifier: &N,
        now: NaiveDateTime,
    ) -> Result<Vec<String>>
    where
        K: KeyValueStore + ?Sized,
        N: Notifier + ?Sized,
    {
        let today = now.date();
        self.ensure_day(kv, today)?;
        let current = DueTime::of(now);

        let due: Vec<&Task> = tasks
            .iter()
            .filter(|t| {
                t.date == today
                    && t.due_time == Some(current)
                    && !t.completed
                    && !self.notified.contains(&t.id)
            })
            .collect();

        if due.is_empty() {
            debug!(time = %current, "no reminders due");
            return Ok(Vec::new());
        }

        let mut fired = Vec::with_capacity(due.len());
        for task in due {
            let delivery = deliver(notifier, &reminder_for(task));
            info!(task_id = %task.id, ?delivery, "task reminder sent");
            self.notified.insert(task.id.clone());
            fired.push(task.id.clone());
        }
        self.persist(kv, today)?;
        Ok(fired)
    }

    /// Drop ids of tasks that no longer exist on `today`.
    ///
    /// Returns whether the set shrank (and was re-persisted).
    pub fn prune<K>(&mut self, tasks: &[Task], kv: &mut K, today: NaiveDate) -> Result<bool>
    where
        K: KeyValueStore + ?Sized,
    {
        self.ensure_day(kv, today)?;
        let live: BTreeSet<&str> = tasks
            .iter()
            .filter(|t| t.date == today)
            .map(|t| t.id.as_str())
            .collect();
        let before = self.notified.len();
        self.notified.retain(|id| live.contains(id.as_str()));
        if self.notified.len() == before {
            return Ok(false);
        }
        debug!(removed = before - self.notified.len(), "pruned notified set");
        self.persist(kv, today)?;
        Ok(true)
    }

    fn ensure_day<K>(&mut self, kv: &mut K, today: NaiveDate) -> Result<()>
    where
        K: KeyValueStore + ?Sized,
    {
        if self.day == Some(today) {
            return Ok(());
        }
        let key = notified_key(today);
        self.notified = match kv.get(&key)? {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    warn!(key = %key, error = %e, "corrupt notified-task marker, starting empty");
                    BTreeSet::new()
                }
            },
            None => BTreeSet::new(),
        };
        self.day = Some(today);

        // Only today's set is ever needed again.
        for stale in kv
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(NOTIFIED_TASKS_PREFIX) && *k != key)
        {
            if let Err(e) = kv.remove(&stale) {
                warn!(key = %stale, error = %e, "failed to remove stale notified-task marker");
            }
        }
        Ok(())
    }

    fn persist<K>(&self, kv: &mut K, today: NaiveDate) -> Result<()>
    where
        K: KeyValueStore + ?Sized,
    {
        let ids: Vec<&String> = self.notified.iter().collect();
        kv.set(&notified_key(today), &serde_json::to_string(&ids)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::notify::RecordingNotifier;
    use crate::task::TaskDraft;
    use chrono::Duration;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn due_task(id: &str, due: &str) -> Task {
        TaskDraft::new(format!("task {id}"), day())
            .due_at(due.parse().unwrap())
            .into_task(id.into(), at(8, 0))
    }

    #[test]
    fn fires_once_across_repeated_ticks() {
        let tasks = vec![due_task("a", "14:30")];
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let mut scheduler = ReminderScheduler::new();

        let t0 = at(14, 30);
        for offset in [0, 20, 40] {
            scheduler
                .tick(&tasks, &mut kv, &notifier, t0 + Duration::seconds(offset))
                .unwrap();
        }
        let shown = notifier.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].body, "It's time for: task a");
        assert_eq!(shown[0].tag.as_deref(), Some("task-a"));
        assert_eq!(
            kv.get(&notified_key(day())).unwrap().as_deref(),
            Some("[\"a\"]")
        );
    }

    #[test]
    fn skips_completed_other_days_and_other_minutes() {
        let mut done = due_task("done", "09:00");
        done.completed = true;
        let mut tomorrow = due_task("tomorrow", "09:00");
        tomorrow.date = day().succ_opt().unwrap();
        let later = due_task("later", "09:01");
        let untimed = TaskDraft::new("untimed", day()).into_task("untimed".into(), at(8, 0));
        let tasks = vec![done, tomorrow, later, untimed];

        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let fired = ReminderScheduler::new()
            .tick(&tasks, &mut kv, &notifier, at(9, 0))
            .unwrap();
        assert!(fired.is_empty());
        assert!(notifier.deliveries().is_empty());
        assert!(kv.get(&notified_key(day())).unwrap().is_none());
    }

    #[test]
    fn persisted_set_survives_restart() {
        let tasks = vec![due_task("a", "10:00")];
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        ReminderScheduler::new()
            .tick(&tasks, &mut kv, &notifier, at(10, 0))
            .unwrap();

        let mut restarted = ReminderScheduler::new();
        let fired = restarted.tick(&tasks, &mut kv, &notifier, at(10, 0)).unwrap();
        assert!(fired.is_empty());
        assert_eq!(notifier.shown().len(), 1);
    }

    #[test]
    fn corrupt_marker_is_treated_as_empty() {
        let tasks = vec![due_task("a", "10:00")];
        let mut kv = MemoryStore::new();
        kv.set(&notified_key(day()), "{not json").unwrap();
        let notifier = RecordingNotifier::granted();
        let fired = ReminderScheduler::new()
            .tick(&tasks, &mut kv, &notifier, at(10, 0))
            .unwrap();
        assert_eq!(fired, vec!["a".to_string()]);
    }

    #[test]
    fn loading_a_day_removes_other_days() {
        let mut kv = MemoryStore::new();
        kv.set("notified-tasks-2024-02-28", "[\"x\"]").unwrap();
        kv.set("last-end-of-day-check", "2024-02-28").unwrap();
        let notifier = RecordingNotifier::granted();
        ReminderScheduler::new()
            .tick(&[], &mut kv, &notifier, at(10, 0))
            .unwrap();
        assert_eq!(kv.keys().unwrap(), vec!["last-end-of-day-check".to_string()]);
    }

    #[test]
    fn prune_forgets_deleted_tasks() {
        let mut tasks = vec![due_task("a", "10:00"), due_task("b", "10:00")];
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let mut scheduler = ReminderScheduler::new();
        scheduler.tick(&tasks, &mut kv, &notifier, at(10, 0)).unwrap();
        assert_eq!(scheduler.notified().len(), 2);

        assert!(!scheduler.prune(&tasks, &mut kv, day()).unwrap());
        tasks.remove(0);
        assert!(scheduler.prune(&tasks, &mut kv, day()).unwrap());
        assert_eq!(
            kv.get(&notified_key(day())).unwrap().as_deref(),
            Some("[\"b\"]")
        );
    }

    #[test]
    fn new_day_starts_with_empty_set() {
        let mut task = due_task("a", "10:00");
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::granted();
        let mut scheduler = ReminderScheduler::new();
        scheduler.tick(&[task.clone()], &mut kv, &notifier, at(10, 0)).unwrap();

        // A task with the same id on the next day is a different reminder.
        let tomorrow = day().succ_opt().unwrap();
        task.date = tomorrow;
        scheduler
            .tick(&[task], &mut kv, &notifier, tomorrow.and_hms_opt(10, 0, 0).unwrap())
            .unwrap();
        assert_eq!(notifier.shown().len(), 2);
        assert!(kv.get(&notified_key(day())).unwrap().is_none());
    }

    #[test]
    fn denied_permission_still_reminds_via_alert() {
        let tasks = vec![due_task("a", "10:00")];
        let mut kv = MemoryStore::new();
        let notifier = RecordingNotifier::new(crate::notify::Permission::Denied);
        ReminderScheduler::new()
            .tick(&tasks, &mut kv, &notifier, at(10, 0))
            .unwrap();
        assert_eq!(notifier.alerts().len(), 1);
    }
}
