pub mod config;
pub mod goals;
pub mod score;
pub mod stats;
pub mod sweep;
pub mod task;
pub mod watch;
