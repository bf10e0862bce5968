use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod notifier;

#[derive(Parser)]
#[command(name = "dayboard", version, about = "Dayboard daily planner CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Productivity score
    Score {
        #[command(subcommand)]
        action: commands::score::ScoreAction,
    },
    /// Today, this week and month-over-month statistics
    Stats,
    /// Weekly goals
    Goals {
        #[command(subcommand)]
        action: commands::goals::GoalsAction,
    },
    /// Run the end-of-day missed-task check now
    Sweep,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run reminders, the end-of-day sweep and the weekend prompt in the foreground
    Watch(commands::watch::WatchArgs),
}

fn main() {
    // RUST_LOG overrides; quiet by default so stdout stays parseable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Score { action } => commands::score::run(action),
        Commands::Stats => commands::stats::run(),
        Commands::Goals { action } => commands::goals::run(action),
        Commands::Sweep => commands::sweep::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Watch(args) => commands::watch::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
