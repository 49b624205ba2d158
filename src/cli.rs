use crate::config::{DEFAULT_LINE_HEADROOM, DEFAULT_STACK_CAPACITY, ProfilerConfig};
use crate::registry::Selector;
use crate::snapshot::Metrics;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "lineprof")]
#[command(about = "Line-level profiler that replays recorded call/return traces")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a trace and print per-file summaries and the hottest lines
    Replay {
        /// JSON-lines trace file
        trace: PathBuf,

        /// Track exactly this file identifier
        #[arg(long, short = 'f', conflicts_with = "pattern", required_unless_present = "pattern")]
        file: Option<String>,

        /// Track every file identifier matching this regular expression
        #[arg(long, short = 'p')]
        pattern: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,

        /// Number of hot lines to display
        #[arg(long, short = 'n', default_value = "20")]
        top: usize,

        /// Hide lines with less inclusive wall time than this
        #[arg(long, value_parser = parse_duration)]
        min_wall: Option<Duration>,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Replay a trace and print a source file annotated with per-line costs
    Annotate {
        /// JSON-lines trace file
        trace: PathBuf,

        /// Source file to annotate
        source: PathBuf,

        /// File identifier used in the trace (defaults to SOURCE as given)
        #[arg(long = "as", value_name = "ID")]
        identifier: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Engine tunables shared by the replaying commands.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Shadow stack capacity in frames
    #[arg(long, default_value_t = DEFAULT_STACK_CAPACITY)]
    pub stack_capacity: usize,

    /// Extra line slots allocated when a file's line table grows
    #[arg(long, default_value_t = DEFAULT_LINE_HEADROOM)]
    pub line_headroom: usize,

    /// Do not measure process CPU time
    #[arg(long)]
    pub no_cpu: bool,

    /// Do not read the allocation counter
    #[arg(long)]
    pub no_allocations: bool,
}

impl EngineArgs {
    pub fn config(&self) -> ProfilerConfig {
        ProfilerConfig::default()
            .with_stack_capacity(self.stack_capacity)
            .with_line_headroom(self.line_headroom)
            .with_metrics(Metrics {
                cpu_time: !self.no_cpu,
                allocations: !self.no_allocations,
            })
    }

    fn validate(&self) -> Result<(), String> {
        if self.stack_capacity == 0 {
            return Err("Stack capacity must be at least 1 frame".to_string());
        }
        Ok(())
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as milliseconds
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 500us, 5ms, 1s, 250",
        s
    ))
}

/// Textual selector for `--file`/`--pattern`.
pub fn selector_arg(file: Option<&str>, pattern: Option<&str>) -> crate::Result<Selector> {
    match (file, pattern) {
        (Some(file), _) => Selector::exact(file),
        (None, Some(pattern)) => Selector::pattern(pattern),
        (None, None) => Err(crate::Error::InvalidSelector(
            "either --file or --pattern is required".to_string(),
        )),
    }
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Replay { engine, top, .. } => {
                if *top == 0 {
                    return Err("--top must be at least 1".to_string());
                }
                engine.validate()
            }
            Command::Annotate { engine, .. } => engine.validate(),
            Command::Completions { .. } => Ok(()),
        }
    }
}
