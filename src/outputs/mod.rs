//! Artifact rendering and filesystem output.
//!
//! # Submodules
//!
//! - [`markdown`]: Deterministic Markdown rendering of a validated report
//! - [`pdf`]: The styled, paginated PDF rendering
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── space_report_20250822.md
//! └── space_report_20250822.pdf
//! ```
//!
//! Both artifacts are staged to a temporary file in the output directory and
//! renamed into place, so a crash mid-write never leaves a half-written
//! report behind and a same-day re-run atomically replaces the previous
//! files. Markdown is written before the PDF is attempted: if PDF rendering
//! fails, the Markdown artifact survives untouched.

pub mod markdown;
pub mod pdf;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::RunError;
use crate::models::{RenderedArtifact, StructuredReport};

/// Title printed at the top of every artifact.
pub const REPORT_TITLE: &str = "Space Business Weekly Report";

/// How many days of collection a report covers.
pub const COVERAGE_DAYS: i64 = 7;

/// Render a validated report and write both artifacts.
///
/// File names depend only on `report_name` and `run_date`, so re-running the
/// pipeline on the same day overwrites the same pair of files.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_artifacts(
    report: &StructuredReport,
    run_date: NaiveDate,
    output_dir: &Path,
    report_name: &str,
) -> Result<RenderedArtifact, RunError> {
    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(RunError::Render(format!(
            "cannot create {}: {e}",
            output_dir.display()
        )));
    }

    let stamp = run_date.format("%Y%m%d");
    let markdown_path = output_dir.join(format!("{report_name}_{stamp}.md"));
    let pdf_path = output_dir.join(format!("{report_name}_{stamp}.pdf"));

    let markdown_text = markdown::render(report, run_date);
    write_atomic(&markdown_path, markdown_text.as_bytes())?;
    info!(path = %markdown_path.display(), bytes = markdown_text.len(), "Wrote Markdown artifact");

    let pdf_bytes = pdf::render(report, run_date)?;
    write_atomic(&pdf_path, &pdf_bytes)?;
    info!(path = %pdf_path.display(), bytes = pdf_bytes.len(), "Wrote PDF artifact");

    Ok(RenderedArtifact {
        markdown_path,
        pdf_path,
        generated_at: Utc::now(),
    })
}

/// Stage bytes in a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RunError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let dir: PathBuf = match dir {
        Some(d) => d.to_path_buf(),
        None => PathBuf::from("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| RunError::Render(format!("cannot stage in {}: {e}", dir.display())))?;
    staged
        .write_all(bytes)
        .map_err(|e| RunError::Render(format!("cannot write staged artifact: {e}")))?;
    staged
        .persist(path)
        .map_err(|e| RunError::Render(format!("cannot move artifact into {}: {e}", path.display())))?;
    Ok(())
}
