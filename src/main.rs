use clap::{ArgAction, Parser};
use rollscript::evaluator::Context;
use rollscript::runner::{self, RunOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "rollscript",
    version,
    about = "An interpreter for dice-and-table random generation scripts"
)]
struct Cli {
    /// The script file to execute
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Start in interactive REPL mode (after running FILE, if given)
    #[arg(short, long)]
    interactive: bool,

    /// Seed the dice roller for reproducible output
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Only parse the script and report errors
    #[arg(long)]
    check: bool,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = RunOptions {
        seed: cli.seed,
        check_only: cli.check,
    };

    let context = match &cli.file {
        Some(path) => match runner::run_file(path, &options) {
            Ok(context) => context,
            Err(_) => return ExitCode::FAILURE,
        },
        None => Context::new(),
    };

    if cli.interactive || cli.file.is_none() {
        rollscript::start_repl(context, &options);
    }

    ExitCode::SUCCESS
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "rollscript=warn",
        1 => "rollscript=debug",
        _ => "rollscript=trace",
    }
}
