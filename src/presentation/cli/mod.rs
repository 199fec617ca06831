pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "taskloom")]
#[command(author = "Taskloom Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A single-process task scheduler runtime", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, help = "Enable debug logging and condition-evaluation tracebacks")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run the bundled demo scheduler session to completion")]
    Demo {
        #[arg(long, value_name = "FILE", help = "Write the session's event log to this JSON file on exit")]
        history_out: Option<std::path::PathBuf>,
    },
}
