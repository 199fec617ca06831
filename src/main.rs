use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use taskloom::presentation::cli::commands::DemoCommand;
use taskloom::presentation::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("taskloom=debug,info")
    } else {
        EnvFilter::new("taskloom=info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let result: Result<()> = match cli.command {
        Commands::Demo { history_out } => DemoCommand::execute(history_out.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(exit_code_for(&e));
    }
}

/// Maps a top-level failure onto the exit codes a `SchedulerError` carries,
/// falling back to the generic "unhandled error" code for anything else
/// (e.g. a failure building the CLI's own async runtime).
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<taskloom::domain::errors::SchedulerError>()
        .map(|e| e.exit_code())
        .unwrap_or(1)
}
