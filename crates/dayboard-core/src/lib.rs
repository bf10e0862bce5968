//! # Dayboard Core Library
//!
//! Core logic for the Dayboard daily planner: the task lifecycle, a bounded
//! productivity score with an auditable history, streaks, and the background
//! processes that remind, sweep and prompt. The `dayboard` CLI is a thin
//! host over this crate.
//!
//! ## Architecture
//!
//! - **Task Store**: a pure reducer over tagged commands, wrapped by a store
//!   that supplies ids and time
//! - **Background processes**: reminders, the end-of-day sweep and the
//!   weekend planning prompt; each is idempotent per day through markers in a
//!   key-value store
//! - **Dashboard**: the composition root; caller-driven, the host invokes
//!   `tick()` periodically and nothing spawns threads
//! - **Storage**: SQLite-backed key-value and state storage, TOML configuration
//!
//! ## Key Components
//!
//! - [`Dashboard`]: owns everything and routes commands
//! - [`TaskStore`]: authoritative task collection
//! - [`apply_score_change`]: the score transition
//! - [`current_streak`]: consecutive days with a completed task
//! - [`Database`]: persistence
//! - [`Config`]: application configuration

pub mod clock;
pub mod dashboard;
pub mod end_of_day;
pub mod error;
pub mod goals;
pub mod kv;
pub mod notify;
pub mod reminders;
pub mod scoring;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;
pub mod weekend;

pub use clock::{Clock, ManualClock, SystemClock, TimerHandle, Timers};
pub use dashboard::{BackgroundJob, Dashboard, SavedPlan, TickReport};
pub use end_of_day::{EndOfDaySweeper, SweepOutcome};
pub use error::{ConfigError, CoreError, NotifyError, StorageError, ValidationError};
pub use goals::{week_start, WeeklyPlan};
pub use kv::{KeyValueStore, MemoryStore};
pub use notify::{deliver, Delivery, Notification, Notifier, Permission, RecordingNotifier};
pub use reminders::ReminderScheduler;
pub use scoring::{apply_score_change, ProductivityScore, ScoreEntry, ScoreLabel};
pub use stats::{current_streak, DailyStats, MonthlyTrend, MotivationTier};
pub use storage::{Config, Database};
pub use store::{reduce, try_reduce, Command, PlannerState, TaskStore};
pub use task::{parse_date, DueTime, Priority, Task, TaskDraft, TaskStatus, WeeklyGoals};
pub use weekend::WeekendPlanningTrigger;
