//! Command-line interface definitions for the report pipeline.
//!
//! This module defines the CLI arguments and options using the `clap` crate.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for one report run.
///
/// # Examples
///
/// ```sh
/// # Default locations: read data/raw_news.json, write into output/
/// space_report
///
/// # Explicit capture file and output directory
/// space_report -i /var/collector/raw_news.json -o /srv/reports
///
/// # Re-render a past date against a saved capture
/// space_report --run-date 2025-08-15
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the collector's JSON capture file
    #[arg(short, long, default_value = "data/raw_news.json")]
    pub input: PathBuf,

    /// Output directory for the report artifacts
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Run date as YYYY-MM-DD; defaults to today. Artifacts are named after
    /// this date, so a re-run on the same date overwrites them.
    #[arg(long)]
    pub run_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["space_report"]);

        assert_eq!(cli.input, PathBuf::from("data/raw_news.json"));
        assert_eq!(cli.output_dir, PathBuf::from("output"));
        assert!(cli.config.is_none());
        assert!(cli.model.is_none());
        assert!(cli.run_date.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["space_report", "-i", "/tmp/raw.json", "-o", "/tmp/out"]);

        assert_eq!(cli.input, PathBuf::from("/tmp/raw.json"));
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_cli_run_date_parses_iso_dates() {
        let cli = Cli::parse_from(["space_report", "--run-date", "2025-08-15"]);
        assert_eq!(
            cli.run_date,
            Some(NaiveDate::from_ymd_opt(2025, 8, 15).unwrap())
        );
    }

    #[test]
    fn test_cli_rejects_malformed_dates() {
        let result = Cli::try_parse_from(["space_report", "--run-date", "August 15"]);
        assert!(result.is_err());
    }
}
