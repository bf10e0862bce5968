//! Foreground host for the background processes.

use std::time::Duration;

use clap::Args;
use tracing::{info, warn};

use dayboard_core::{Clock, Dashboard, Database, Notifier, TickReport};

use crate::context::{self, CliDashboard};

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between checks for due jobs
    #[arg(long, default_value = "1")]
    poll_secs: u64,
    /// Run every enabled job once and exit
    #[arg(long)]
    once: bool,
}

pub fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut dash = context::open()?;
    dash.on_planning_prompt(|date| {
        println!("{date}: time to plan the week ahead. Run `dayboard goals plan`.");
    });

    let report = dash.start();
    log_report(&report);
    context::save(&mut dash)?;
    if args.once {
        dash.stop();
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()?;
    runtime.block_on(watch_loop(&mut dash, Duration::from_secs(args.poll_secs.max(1))))?;
    dash.stop();
    context::save(&mut dash)?;
    Ok(())
}

async fn watch_loop(
    dash: &mut CliDashboard,
    poll: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(poll_secs = poll.as_secs(), "watching; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match self::poll(dash) {
                    Ok(report) => log_report(&report),
                    Err(e) => warn!(error = %e, "watch tick failed"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("stopping");
                return Ok(());
            }
        }
    }
}

/// One watch step: adopt what other invocations saved, run the due jobs,
/// and save at once so their writes are not overwritten later.
fn poll<C: Clock, N: Notifier>(
    dash: &mut Dashboard<C, Database, N>,
) -> Result<TickReport, Box<dyn std::error::Error>> {
    context::reload(dash)?;
    let report = dash.tick();
    context::save(dash)?;
    Ok(report)
}

fn log_report(report: &TickReport) {
    if report.is_empty() {
        return;
    }
    for id in &report.reminded {
        info!(task_id = %id, "reminded");
    }
    if !report.missed.is_empty() {
        println!("{} task(s) marked as missed", report.missed.len());
    }
}
