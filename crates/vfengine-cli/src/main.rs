//! `vfengine` command-line driver.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vfengine_cli::OutputFormat;
use vfengine_cli::commands::{self, run::RunArgs};
use vfengine_cli::output;

#[derive(Parser)]
#[command(name = "vfengine", version, about = "Vectorized factorized joins over edge lists")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    format: OutputFormat,

    /// Suppress normal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Run a join query
    Run(RunArgs),
    /// Print edge list statistics
    Stats {
        /// Edge list CSV (`src,dst` per row)
        #[arg(long, value_name = "FILE")]
        edges: PathBuf,
    },
}

fn init_tracing(verbose: u8, debug_chunks: bool) {
    let mut filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    if debug_chunks
        && let Ok(directive) = "vfengine::chunk=trace".parse()
    {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug_chunks = matches!(&cli.command, Command::Run(args) if args.debug_chunks);
    init_tracing(cli.verbose, debug_chunks);

    let result = match &cli.command {
        Command::Run(args) => commands::run::run(args, cli.format, cli.quiet),
        Command::Stats { edges } => commands::stats::run(edges, cli.format, cli.quiet),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
