//! Offline sheet check: normalize a CSV and print what would be imported

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use recruitctl_core::import::{parse_athlete_rows, parse_coach_rows, ImportReport, RowError};
use serde::Serialize;

#[derive(Parser, Debug)]
pub struct ImportArgs {
    #[command(subcommand)]
    pub command: ImportCommands,
}

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Coach sheet (name, email, title, school, gender, ...)
    Coaches(SheetArgs),
    /// Athlete sheet (name, email, graduation year, events, scores, ...)
    Athletes(SheetArgs),
}

#[derive(Parser, Debug)]
pub struct SheetArgs {
    /// CSV file with a header row
    pub file: PathBuf,

    /// Print counts and row errors only
    #[arg(long)]
    pub summary: bool,

    /// Exit non-zero when any row was rejected
    #[arg(long)]
    pub fail_on_errors: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary<'a> {
    total_rows: usize,
    valid_rows: usize,
    error_rows: usize,
    errors: &'a [RowError],
}

impl<'a> Summary<'a> {
    fn of<T>(report: &'a ImportReport<T>) -> Self {
        Self {
            total_rows: report.total_rows,
            valid_rows: report.rows.len(),
            error_rows: report.errors.len(),
            errors: &report.errors,
        }
    }
}

pub fn run_import(args: ImportArgs) -> Result<()> {
    match args.command {
        ImportCommands::Coaches(sheet) => {
            let report = parse_coach_rows(open(&sheet.file)?)
                .with_context(|| format!("Failed to read {}", sheet.file.display()))?;
            print_report(&report, &sheet)
        }
        ImportCommands::Athletes(sheet) => {
            let report = parse_athlete_rows(open(&sheet.file)?)
                .with_context(|| format!("Failed to read {}", sheet.file.display()))?;
            print_report(&report, &sheet)
        }
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn print_report<T: Serialize>(report: &ImportReport<T>, sheet: &SheetArgs) -> Result<()> {
    let json = if sheet.summary {
        serde_json::to_string_pretty(&Summary::of(report))?
    } else {
        serde_json::to_string_pretty(report)?
    };
    println!("{json}");

    tracing::info!(
        total = report.total_rows,
        valid = report.rows.len(),
        errors = report.errors.len(),
        "sheet checked"
    );
    if sheet.fail_on_errors && !report.errors.is_empty() {
        bail!("{} row(s) rejected", report.errors.len());
    }
    Ok(())
}
