use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    prepare::{self, PrepareArgs},
    show::{self, ShowArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "lad", about = "Ladder DMRG analysis cache driver")]
struct Cli {
    /// Log cache hits and skipped runs as well.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every job of a sweep plan, filling the result cache.
    Prepare(PrepareArgs),
    /// Resolve one result and print it as JSON.
    Show(ShowArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Prepare(args) => prepare::run(&args),
        Command::Show(args) => show::run(&args),
    }
}
