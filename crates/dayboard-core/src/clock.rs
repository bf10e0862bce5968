//! Wall-clock abstraction and interval timers.
//!
//! Nothing in the core reads the system time directly. Components receive a
//! [`Clock`] and interval work is registered with [`Timers`], which the owner
//! evaluates against that clock. Like the timer engine it is caller-driven:
//! there are no threads, the host calls [`Timers::due`] periodically.
//!
//! All times are local wall-clock times.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};

/// Source of "now" in local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Clones share the same instant, so a test can keep a handle while the
/// dashboard owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        self.now.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

/// Format a time as `HH:MM`, the precision reminders match on.
pub fn minute_of(at: NaiveDateTime) -> String {
    format!("{:02}:{:02}", at.hour(), at.minute())
}

/// Cancel handle returned by [`Timers::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct TimerEntry<J> {
    handle: TimerHandle,
    period: Duration,
    next_due: NaiveDateTime,
    job: J,
}

/// Set of recurring interval timers.
///
/// Each entry carries a job token `J`; [`Timers::due`] returns the tokens whose
/// period has elapsed. An entry that overslept several periods fires once and
/// is re-armed relative to the evaluation time, so a sleeping device does not
/// produce a burst of catch-up ticks.
#[derive(Debug, Clone)]
pub struct Timers<J> {
    next_id: u64,
    entries: Vec<TimerEntry<J>>,
}

impl<J> Default for Timers<J> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<J: Copy> Timers<J> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` to fire every `period`, first at `now + period`.
    pub fn schedule(&mut self, now: NaiveDateTime, period: Duration, job: J) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        // A zero or negative period would fire on every evaluation.
        let period = period.max(Duration::seconds(1));
        self.entries.push(TimerEntry {
            handle,
            period,
            next_due: now + period,
            job,
        });
        handle
    }

    /// Cancel a timer. Returns false if it was already cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect the jobs due at `now` (in registration order) and re-arm them.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<J> {
        let mut fired = Vec::new();
        for entry in &mut self.entries {
            if entry.next_due <= now {
                fired.push(entry.job);
                entry.next_due = now + entry.period;
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(at(9, 0));
        let other = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(other.now(), at(9, 5));
        assert_eq!(other.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn minute_of_pads_fields() {
        assert_eq!(minute_of(at(7, 5)), "07:05");
    }

    #[test]
    fn timer_fires_after_each_period() {
        let mut timers = Timers::new();
        timers.schedule(at(9, 0), Duration::minutes(1), 'r');
        assert!(timers.due(at(9, 0)).is_empty());
        assert_eq!(timers.due(at(9, 1)), vec!['r']);
        assert!(timers.due(at(9, 1)).is_empty());
        assert_eq!(timers.due(at(9, 2)), vec!['r']);
    }

    #[test]
    fn overslept_timer_fires_once() {
        let mut timers = Timers::new();
        timers.schedule(at(9, 0), Duration::minutes(1), 'r');
        assert_eq!(timers.due(at(10, 0)), vec!['r']);
        assert!(timers.due(at(10, 0)).is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timers = Timers::new();
        let handle = timers.schedule(at(9, 0), Duration::minutes(1), 'r');
        assert!(timers.is_armed(handle));
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert!(timers.due(at(12, 0)).is_empty());
        assert!(timers.is_empty());
    }
}
