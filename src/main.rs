use anyhow::Context;
use clap::Parser;
use lineprof::cli::{Cli, Command, selector_arg};
use lineprof::commands::replay::{OutputFormat, ReplayOptions};
use lineprof::error::exit_code;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        eprintln!("Error: Invalid arguments: {e}");
        return ExitCode::from(exit_code::INVALID_ARGUMENTS as u8);
    }

    match run(cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(lineprof_err) = e.downcast_ref::<lineprof::Error>() {
                ExitCode::from(lineprof_err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

/// Log to stderr, filtered by `LINEPROF_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LINEPROF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Replay {
            trace,
            file,
            pattern,
            engine,
            top,
            min_wall,
            json,
            csv,
        } => {
            let selector = selector_arg(file.as_deref(), pattern.as_deref())?;
            let format = if json {
                OutputFormat::Json
            } else if csv {
                OutputFormat::Csv
            } else {
                OutputFormat::Table
            };
            let options = ReplayOptions {
                top,
                min_wall,
                format,
            };
            lineprof::commands::replay::run(&trace, selector, engine.config(), options)?;
        }
        Command::Annotate {
            trace,
            source,
            identifier,
            engine,
        } => {
            lineprof::commands::annotate::run(
                &trace,
                &source,
                identifier.as_deref(),
                engine.config(),
            )
            .with_context(|| format!("Failed to annotate {}", source.display()))?;
        }
        Command::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "lineprof", &mut std::io::stdout());
        }
    }

    Ok(())
}
