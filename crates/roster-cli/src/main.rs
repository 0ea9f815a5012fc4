//! `roster` CLI: weekly schedules, conflict checks and hours reports from a
//! roster snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Weekly schedule (snapshot on stdin, JSON on stdout)
//! roster week --week-start 2026-03-09 < snapshot.json
//!
//! # Any date of the week, normalized to its Monday
//! roster week --week-start 2026-03-11 --normalize -i snapshot.json -o week.json
//!
//! # Would a new task 07:30-08:30 overlap the driver's day?
//! roster check -i snapshot.json --employee emp-1 --date 2026-03-09 --start 07:30 --end 08:30
//!
//! # Re-check an existing task being edited (excluded from the comparison)
//! roster check -i snapshot.json --employee emp-1 --date 2026-03-09 --start 07:30 --end 08:30 --task t-1
//!
//! # Conflicts already committed on a date
//! roster audit -i snapshot.json --date 2026-03-09
//!
//! # Worked hours between two dates, for some employees
//! roster report -i snapshot.json --from 2026-03-02 --to 2026-03-13 --employees emp-1,emp-2
//! ```
//!
//! Thresholds come from `--config FILE` (JSON). Logs go to stderr; `-v` raises
//! the level and `RUST_LOG` overrides it.

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use roster_engine::{
    audit_conflicts, check_conflict, compute_weekly_schedule, hours_report, week_monday,
    CandidateItem, ConflictCheckRequest, EngineConfig, Snapshot,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "roster",
    version,
    about = "School bus roster engine: weekly hours, conflicts and replacements"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Snapshot input and JSON output shared by every subcommand.
#[derive(clap::Args)]
struct FileArgs {
    /// Snapshot file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the Monday-to-Friday schedule of a week
    Week {
        #[command(flatten)]
        files: FileArgs,
        /// Monday of the week (YYYY-MM-DD)
        #[arg(long)]
        week_start: NaiveDate,
        /// Accept any date and use the Monday of its week
        #[arg(long)]
        normalize: bool,
    },
    /// Check a proposed time window against a driver's committed work
    Check {
        #[command(flatten)]
        files: FileArgs,
        #[arg(long)]
        employee: String,
        #[arg(long)]
        date: NaiveDate,
        /// Window start (HH:MM)
        #[arg(long)]
        start: String,
        /// Window end (HH:MM)
        #[arg(long)]
        end: String,
        /// Existing task being edited
        #[arg(long, conflicts_with = "assignment")]
        task: Option<String>,
        /// Existing assignment being edited
        #[arg(long)]
        assignment: Option<String>,
        /// School the window is for
        #[arg(long)]
        school: Option<String>,
    },
    /// List overlaps among every driver's committed work on a date
    Audit {
        #[command(flatten)]
        files: FileArgs,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Worked hours per employee and school day over a date range
    Report {
        #[command(flatten)]
        files: FileArgs,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Comma-separated employee ids (all employees if omitted)
        #[arg(long, value_delimiter = ',')]
        employees: Option<Vec<String>>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "engine configuration");

    match cli.command {
        Commands::Week {
            files,
            week_start,
            normalize,
        } => {
            let snapshot = load_snapshot(&files)?;
            let week_start = if normalize {
                week_monday(week_start)
            } else {
                week_start
            };
            let schedule = compute_weekly_schedule(&snapshot, week_start, &config)
                .with_context(|| format!("Failed to compute schedule for week of {}", week_start))?;
            emit(&files, &schedule)?;
        }
        Commands::Check {
            files,
            employee,
            date,
            start,
            end,
            task,
            assignment,
            school,
        } => {
            let snapshot = load_snapshot(&files)?;
            let candidate = match (task, assignment) {
                (Some(id), _) => CandidateItem::Task { id },
                (None, Some(id)) => CandidateItem::Assignment { id },
                (None, None) => CandidateItem::NewTask,
            };
            let mut request = ConflictCheckRequest::new(candidate, employee, date, &start, &end)
                .context("Invalid conflict check window")?;
            if let Some(school) = school {
                request = request.with_school(school);
            }
            let check = check_conflict(&snapshot, &request, &config)
                .context("Failed to check conflicts")?;
            emit(&files, &check)?;
        }
        Commands::Audit { files, date } => {
            let snapshot = load_snapshot(&files)?;
            let audit = audit_conflicts(&snapshot, date, &config)
                .with_context(|| format!("Failed to audit conflicts on {}", date))?;
            emit(&files, &audit)?;
        }
        Commands::Report {
            files,
            from,
            to,
            employees,
        } => {
            let snapshot = load_snapshot(&files)?;
            let report = hours_report(&snapshot, from, to, employees.as_deref())
                .context("Failed to build hours report")?;
            emit(&files, &report)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            EngineConfig::from_json(&json)
                .with_context(|| format!("Failed to parse config file: {}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_snapshot(files: &FileArgs) -> Result<Snapshot> {
    let json = read_input(files.input.as_deref())?;
    Snapshot::from_json(&json).context("Failed to parse roster snapshot")
}

fn emit<T: Serialize>(files: &FileArgs, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    json.push('\n');
    write_output(files.output.as_deref(), &json)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
