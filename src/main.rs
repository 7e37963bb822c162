//! apiprobe - schema-driven black-box testing for HTTP API endpoints

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apiprobe::cli::commands;
use apiprobe::cli::config::RunConfig;
use apiprobe::cli::OutputFormat;
use apiprobe::errors::format_error;

/// apiprobe - generate and run black-box tests for an HTTP endpoint
#[derive(Parser)]
#[command(
    name = "apiprobe",
    version,
    about = "Schema-driven black-box test generation for HTTP API endpoints",
    long_about = "apiprobe reads a suite describing one endpoint and its body fields, \
                  generates boundary, type, format and tamper cases, and runs each \
                  through predo/test/undo against the live endpoint."
)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite against its endpoint
    Run {
        /// Suite file (TOML, or JSON by extension)
        suite: PathBuf,

        /// Report format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the endpoint base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Seed for array subset sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Per-request timeout (seconds)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Disable progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// List the cases a suite generates without sending requests
    Plan {
        /// Suite file (TOML, or JSON by extension)
        suite: PathBuf,

        /// Seed for array subset sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Write an example suite file
    Init {
        /// Output path
        #[arg(short, long, default_value = "apiprobe.toml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbosity: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbosity {
            0 => EnvFilter::new("apiprobe=info"),
            1 => EnvFilter::new("apiprobe=debug"),
            2 => EnvFilter::new("apiprobe=trace"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn dispatch(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Run {
            suite,
            format,
            output,
            base_url,
            seed,
            timeout,
            no_progress,
        } => {
            let config = RunConfig::new(suite)
                .with_format(format)
                .with_output(output)
                .with_base_url(base_url)
                .with_seed(seed)
                .with_timeout(timeout)
                .with_no_progress(no_progress)
                .with_quiet(cli.quiet);
            commands::run::run(&config).await
        }
        Commands::Plan {
            suite,
            seed,
            format,
        } => {
            commands::plan::run(&suite, seed, format)?;
            Ok(true)
        }
        Commands::Init { output, force } => {
            commands::init::run(&output, force)?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match dispatch(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}", format_error(&e));
            ExitCode::from(2)
        }
    }
}
