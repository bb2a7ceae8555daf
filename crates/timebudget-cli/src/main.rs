use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "timebudget", version, about = "Where do the hours go")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a date range into Schedule, Routine, Sleep, Tasks and Free Time
    Allocate(commands::allocate::AllocateArgs),
    /// Recurring routines
    Routine {
        #[command(subcommand)]
        action: commands::routine::RoutineAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Efficiency records
    Efficiency {
        #[command(subcommand)]
        action: commands::efficiency::EfficiencyAction,
    },
    /// Confirmed calendar events
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Draft events and the recently-deleted bin
    Candidate {
        #[command(subcommand)]
        action: commands::candidate::CandidateAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Allocate(args) => commands::allocate::run(args),
        Commands::Routine { action } => commands::routine::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Efficiency { action } => commands::efficiency::run(action),
        Commands::Event { action } => commands::event::run(action),
        Commands::Candidate { action } => commands::candidate::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        log::debug!("command failed: {e:?}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
