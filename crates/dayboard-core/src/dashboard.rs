//! Composition root: one value owning the clock, storage, notifier, task
//! store and the three background processes.
//!
//! Commands and background jobs both run through `&mut self`, so a job never
//! observes a half-applied command. The host drives [`Dashboard::tick`]
//! periodically; jobs whose interval elapsed run inside that call and any
//! error they raise is logged and dropped there.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, TimerHandle, Timers};
use crate::end_of_day::{EndOfDaySweeper, SweepOutcome};
use crate::error::Result;
use crate::goals::WeeklyPlan;
use crate::kv::KeyValueStore;
use crate::notify::{Notifier, Permission};
use crate::reminders::ReminderScheduler;
use crate::scoring::ProductivityScore;
use crate::stats::{DailyStats, MonthlyTrend};
use crate::storage::Config;
use crate::store::{PlannerState, TaskStore};
use crate::task::{Task, TaskDraft, WeeklyGoals};
use crate::weekend::WeekendPlanningTrigger;

/// The recurring jobs a dashboard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundJob {
    Reminders,
    EndOfDay,
    WeekendPlanning,
}

impl BackgroundJob {
    pub const ALL: [BackgroundJob; 3] = [
        BackgroundJob::Reminders,
        BackgroundJob::EndOfDay,
        BackgroundJob::WeekendPlanning,
    ];
}

/// What the background jobs did during one [`Dashboard::tick`] (or
/// [`Dashboard::start`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub jobs_run: Vec<BackgroundJob>,
    pub reminded: Vec<String>,
    pub missed: Vec<String>,
    pub planning_prompt: Option<NaiveDate>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.reminded.is_empty() && self.missed.is_empty() && self.planning_prompt.is_none()
    }
}

/// A saved weekly plan and the tasks it spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub goals: WeeklyGoals,
    pub tasks: Vec<Task>,
}

type PlanningHandler = Box<dyn FnMut(NaiveDate)>;

pub struct Dashboard<C, K, N> {
    clock: C,
    kv: K,
    notifier: N,
    store: TaskStore,
    config: Config,
    timers: Timers<BackgroundJob>,
    handles: Vec<(BackgroundJob, TimerHandle)>,
    running: bool,
    dirty: bool,
    reminders: ReminderScheduler,
    sweeper: EndOfDaySweeper,
    weekend: WeekendPlanningTrigger,
    on_planning_prompt: Option<PlanningHandler>,
}

impl<C: Clock, K: KeyValueStore, N: Notifier> Dashboard<C, K, N> {
    pub fn new(clock: C, kv: K, notifier: N, state: PlannerState, config: Config) -> Self {
        let sweeper = EndOfDaySweeper::new(config.end_of_day.threshold_hour)
            .with_summary_notification(config.end_of_day.summary_notification);
        let weekend = WeekendPlanningTrigger::new(
            config.weekend_planning.start_hour,
            config.weekend_planning.end_hour,
        );
        Self {
            clock,
            kv,
            notifier,
            store: TaskStore::new(state),
            config,
            timers: Timers::new(),
            handles: Vec::new(),
            running: false,
            dirty: false,
            reminders: ReminderScheduler::new(),
            sweeper,
            weekend,
            on_planning_prompt: None,
        }
    }

    /// Empty planner with the given starting score.
    pub fn with_initial_score(clock: C, kv: K, notifier: N, initial: i32, config: Config) -> Self {
        let state = PlannerState::new(ProductivityScore::new(initial, clock.now()));
        Self::new(clock, kv, notifier, state, config)
    }

    /// Called with today's date whenever the weekly-planning flow should open.
    pub fn on_planning_prompt(&mut self, handler: impl FnMut(NaiveDate) + 'static) {
        self.on_planning_prompt = Some(Box::new(handler));
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Arm the enabled jobs and run each of them once immediately.
    pub fn start(&mut self) -> TickReport {
        self.stop();
        self.running = true;
        if self.wants_notifications() {
            self.notifier.request_permission();
        }
        let now = self.clock.now();
        let mut report = TickReport::default();
        for job in BackgroundJob::ALL {
            if self.job_enabled(job) {
                self.arm(job, now);
                self.run_job(job, now, &mut report);
            }
        }
        info!(armed = self.handles.len(), "dashboard started");
        report
    }

    /// Run every job whose interval has elapsed.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();
        for job in self.timers.due(now) {
            self.run_job(job, now, &mut report);
        }
        report
    }

    /// Cancel every timer. Nothing fires until the next [`Dashboard::start`].
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        self.handles.clear();
        if self.running {
            debug!("dashboard stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_armed(&self, job: BackgroundJob) -> bool {
        self.handle(job)
            .is_some_and(|handle| self.timers.is_armed(handle))
    }

    /// Turn a job on or off. While running, enabling arms and runs it at once
    /// and disabling cancels its timer.
    pub fn set_job_enabled(&mut self, job: BackgroundJob, enabled: bool) -> TickReport {
        match job {
            BackgroundJob::Reminders => self.config.reminders.enabled = enabled,
            BackgroundJob::EndOfDay => self.config.end_of_day.enabled = enabled,
            BackgroundJob::WeekendPlanning => self.config.weekend_planning.enabled = enabled,
        }
        let mut report = TickReport::default();
        if !self.running {
            return report;
        }
        if enabled {
            if self.wants_notifications() {
                self.notifier.request_permission();
            }
            if !self.is_armed(job) {
                let now = self.clock.now();
                self.arm(job, now);
                self.run_job(job, now, &mut report);
            }
        } else if let Some(pos) = self.handles.iter().position(|(j, _)| *j == job) {
            let (_, handle) = self.handles.remove(pos);
            self.timers.cancel(handle);
            debug!(?job, "background job disabled");
        }
        report
    }

    /// Enable or disable reminders; enabling asks for notification permission.
    pub fn set_reminders_enabled(&mut self, enabled: bool) -> Permission {
        if enabled && !self.running {
            self.notifier.request_permission();
        }
        self.set_job_enabled(BackgroundJob::Reminders, enabled);
        self.notifier.permission()
    }

    /// Reminders and the end-of-day summary both need notification permission.
    fn wants_notifications(&self) -> bool {
        self.config.reminders.enabled
            || (self.config.end_of_day.enabled && self.config.end_of_day.summary_notification)
    }

    fn job_enabled(&self, job: BackgroundJob) -> bool {
        match job {
            BackgroundJob::Reminders => self.config.reminders.enabled,
            BackgroundJob::EndOfDay => self.config.end_of_day.enabled,
            BackgroundJob::WeekendPlanning => self.config.weekend_planning.enabled,
        }
    }

    fn handle(&self, job: BackgroundJob) -> Option<TimerHandle> {
        self.handles
            .iter()
            .find(|(j, _)| *j == job)
            .map(|(_, handle)| *handle)
    }

    fn arm(&mut self, job: BackgroundJob, now: NaiveDateTime) {
        let period = match job {
            BackgroundJob::Reminders => self.config.reminders.interval(),
            BackgroundJob::EndOfDay => self.config.end_of_day.interval(),
            BackgroundJob::WeekendPlanning => self.config.weekend_planning.interval(),
        };
        let handle = self.timers.schedule(now, period, job);
        self.handles.push((job, handle));
    }

    fn run_job(&mut self, job: BackgroundJob, now: NaiveDateTime, report: &mut TickReport) {
        report.jobs_run.push(job);
        let result = match job {
            BackgroundJob::Reminders => self
                .reminders
                .tick(self.store.tasks(), &mut self.kv, &self.notifier, now)
                .map(|fired| report.reminded.extend(fired)),
            BackgroundJob::EndOfDay => self.run_end_of_day(now, report),
            BackgroundJob::WeekendPlanning => self.run_weekend_planning(now, report),
        };
        if let Err(e) = result {
            warn!(?job, error = %e, "background job failed");
        }
    }

    fn run_end_of_day(&mut self, now: NaiveDateTime, report: &mut TickReport) -> Result<()> {
        let outcome = self
            .sweeper
            .tick(&mut self.store, &mut self.kv, &self.notifier, now)?;
        if let SweepOutcome::Swept { missed } = outcome {
            if !missed.is_empty() {
                self.dirty = true;
                report.missed.extend(missed);
            }
        }
        Ok(())
    }

    fn run_weekend_planning(&mut self, now: NaiveDateTime, report: &mut TickReport) -> Result<()> {
        if self.weekend.tick(&mut self.kv, now)? {
            report.planning_prompt = Some(now.date());
            self.fire_planning_prompt(now.date());
        }
        Ok(())
    }

    fn fire_planning_prompt(&mut self, date: NaiveDate) {
        match self.on_planning_prompt.as_mut() {
            Some(handler) => handler(date),
            None => debug!(%date, "planning prompt with no handler"),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &PlannerState {
        self.store.state()
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.store.task(id)
    }

    pub fn tasks_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.store.tasks_on(date).collect()
    }

    pub fn score(&self) -> &ProductivityScore {
        self.store.score()
    }

    pub fn weekly_goals(&self) -> &[WeeklyGoals] {
        self.store.weekly_goals()
    }

    pub fn stats(&self) -> DailyStats {
        DailyStats::compute(self.store.tasks(), self.clock.today())
    }

    pub fn monthly_trend(&self) -> MonthlyTrend {
        MonthlyTrend::compute(self.store.tasks(), self.clock.today())
    }

    /// Adopt a state written elsewhere, e.g. by another process sharing the
    /// database. Not marked dirty; the notified set is pruned against it.
    pub fn replace_state(&mut self, state: PlannerState) {
        if self.store.state() == &state {
            return;
        }
        debug!(tasks = state.tasks.len(), "planner state replaced");
        self.store = TaskStore::new(state);
        let today = self.clock.today();
        if let Err(e) = self.reminders.prune(self.store.tasks(), &mut self.kv, today) {
            warn!(error = %e, "failed to prune notified tasks");
        }
    }

    /// Whether the planner state changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task> {
        let task = self.store.add_task(draft, self.clock.now())?;
        self.changed(true);
        Ok(task)
    }

    pub fn update_task(&mut self, task: Task) -> bool {
        let changed = self.store.update_task(task, self.clock.now());
        self.changed(changed)
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let changed = self.store.delete_task(id, self.clock.now());
        self.changed(changed)
    }

    pub fn toggle_completion(&mut self, id: &str) -> bool {
        let changed = self.store.toggle_completion(id, self.clock.now());
        self.changed(changed)
    }

    pub fn mark_missed(&mut self, id: &str) -> bool {
        let changed = self.store.mark_missed(id, self.clock.now());
        self.changed(changed)
    }

    pub fn mark_all_complete(&mut self, date: NaiveDate) -> bool {
        let changed = self.store.mark_all_complete(date, self.clock.now());
        self.changed(changed)
    }

    pub fn adjust_score(&mut self, change: i32, reason: &str, task_id: Option<String>) -> bool {
        let changed = self
            .store
            .adjust_score(change, reason, task_id, self.clock.now());
        self.changed(changed)
    }

    /// Store the plan's goals for its week (adding or replacing the week's
    /// record) and add one task per goal the week did not have before.
    pub fn save_weekly_plan(&mut self, plan: WeeklyPlan) -> Result<SavedPlan> {
        let now = self.clock.now();
        let previous = self
            .store
            .weekly_goals_for(plan.week_start)
            .map(|g| (WeeklyPlan::from(g), g.id.clone(), g.created_at));
        let drafts = match &previous {
            Some((before, _, _)) => plan.added_since(before).materialize(),
            None => plan.materialize(),
        };
        for draft in &drafts {
            draft.validate()?;
        }

        let goals = match previous {
            Some((_, id, created_at)) => {
                let goals = plan.into_goals(id, created_at)?;
                self.store.update_weekly_goals(goals.clone(), now);
                goals
            }
            None => {
                let goals = plan.into_goals(Uuid::new_v4().to_string(), now)?;
                self.store.add_weekly_goals(goals.clone(), now);
                goals
            }
        };

        let mut tasks = Vec::with_capacity(drafts.len());
        for draft in drafts {
            tasks.push(self.store.add_task(draft, now)?);
        }
        info!(week = %goals.week_start, tasks = tasks.len(), "weekly plan saved");
        self.changed(true);
        Ok(SavedPlan { goals, tasks })
    }

    /// Run the end-of-day check now, ignoring today's marker.
    pub fn force_end_of_day(&mut self) -> Result<SweepOutcome> {
        if self.config.end_of_day.summary_notification {
            self.notifier.request_permission();
        }
        let now = self.clock.now();
        let outcome = self
            .sweeper
            .force(&mut self.store, &mut self.kv, &self.notifier, now)?;
        let swept = matches!(&outcome, SweepOutcome::Swept { missed } if !missed.is_empty());
        self.changed(swept);
        Ok(outcome)
    }

    /// Open the weekly-planning flow now and record today's prompt.
    pub fn trigger_planning(&mut self) -> Result<NaiveDate> {
        let now = self.clock.now();
        self.weekend.trigger(&mut self.kv, now)?;
        self.fire_planning_prompt(now.date());
        Ok(now.date())
    }

    /// Mark dirty and prune the reminder set after a state change.
    fn changed(&mut self, changed: bool) -> bool {
        if changed {
            self.dirty = true;
            let today = self.clock.today();
            if let Err(e) = self.reminders.prune(self.store.tasks(), &mut self.kv, today) {
                warn!(error = %e, "failed to prune notified tasks");
            }
        }
        changed
    }
}
