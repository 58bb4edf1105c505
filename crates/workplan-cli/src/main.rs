//! workplan CLI - Staffing Feasibility Analysis
//!
//! Command-line interface for checking scenario files and deciding whether
//! their recurring activities fit the available role capacity.

mod exit;
mod report;
mod scenario;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use workplan_core::{
    AnalysisOptions, AnalysisOutcome, DiagnosticsPolicy, FinancialQuarter, PlanningHorizon,
    WorkplanSummary,
};

use exit::ExitCode;
use scenario::Scenario;

#[derive(Parser)]
#[command(name = "workplan")]
#[command(author, version, about = "Staffing feasibility analysis", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether a scenario's activities fit its capacity
    Analyze {
        /// Scenario file (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Solver time limit in seconds
        #[arg(long, value_name = "SECONDS", default_value_t = 30)]
        time_limit: u64,

        /// Diagnostics policy file (TOML)
        #[arg(long, value_name = "FILE", env = "WORKPLAN_POLICY")]
        policy: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a scenario and summarize its workplan without solving
    Check {
        /// Scenario file (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show working days and slots of a financial quarter
    Horizon {
        /// Quarter label, e.g. 2025-Q3
        #[arg(value_name = "QUARTER")]
        quarter: String,

        /// Holiday to leave out (repeatable)
        #[arg(long = "holiday", value_name = "DATE")]
        holidays: Vec<chrono::NaiveDate>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code.into(),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::InputError.into()
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Analyze {
            file,
            time_limit,
            policy,
            format,
            output,
        } => {
            let mut options = AnalysisOptions::default().time_limit(Duration::from_secs(time_limit));
            if let Some(path) = policy {
                options = options.policy(load_policy(&path)?);
            }
            analyze(&file, options, format, output.as_deref())
        }
        Commands::Check { file } => check(&file),
        Commands::Horizon { quarter, holidays } => horizon(&quarter, holidays),
    }
}

fn load_policy(path: &Path) -> Result<DiagnosticsPolicy> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy {}", path.display()))?;
    DiagnosticsPolicy::from_toml(&text).with_context(|| format!("invalid policy {}", path.display()))
}

fn analyze(file: &Path, options: AnalysisOptions, format: Format, output: Option<&Path>) -> Result<ExitCode> {
    let prepared = Scenario::load(file)?.prepare()?;
    info!(
        activities = prepared.request.activities.len(),
        excluded = prepared.excluded.len(),
        "starting analysis"
    );

    let handle = workplan_solver::spawn_analysis(prepared.request, options)?;
    while !handle.is_finished() {
        for phase in handle.progress() {
            debug!(%phase, "analysis progress");
        }
        thread::sleep(Duration::from_millis(20));
    }
    for phase in handle.progress() {
        debug!(%phase, "analysis progress");
    }
    let outcome = handle.join()?;

    let code = ExitCode::from_outcome(&outcome);
    with_output(output, |out| match format {
        Format::Text => report::write_outcome(out, &outcome),
        Format::Json => write_json(out, &outcome),
    })?;
    Ok(code)
}

fn write_json(out: &mut dyn Write, outcome: &AnalysisOutcome) -> io::Result<()> {
    let value = match outcome.result() {
        Some(result) => serde_json::to_value(result)?,
        None => serde_json::json!({ "cancelled": true }),
    };
    serde_json::to_writer_pretty(&mut *out, &value)?;
    writeln!(out)
}

fn check(file: &Path) -> Result<ExitCode> {
    let prepared = Scenario::load(file)?.prepare()?;
    let summary = WorkplanSummary::from_activities(&prepared.request.activities);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_summary(&mut out, &summary, prepared.excluded.len())?;
    Ok(ExitCode::Success)
}

fn horizon(quarter: &str, holidays: Vec<chrono::NaiveDate>) -> Result<ExitCode> {
    let quarter: FinancialQuarter = quarter.parse()?;
    let holidays: BTreeSet<_> = holidays.into_iter().collect();
    let horizon = PlanningHorizon::for_quarter(&quarter, &holidays);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_horizon(&mut out, &quarter, &horizon)?;
    Ok(ExitCode::Success)
}

/// Run `write` against the output file, or stdout when none is given
fn with_output(path: Option<&Path>, write: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write(&mut out)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write(&mut out)?;
        }
    }
    Ok(())
}
