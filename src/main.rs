//! Binary entry point: parse the CLI, run the pipeline once, and exit with
//! a classified single-line failure when anything goes wrong.

use std::time::Instant;

use chrono::Local;
use clap::Parser;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use space_report::api;
use space_report::cli::Cli;
use space_report::config::RunConfig;
use space_report::contract::ReportContract;
use space_report::error::RunError;
use space_report::models::RenderedArtifact;
use space_report::outputs;
use space_report::prompt;
use space_report::store::RawInputStore;
use space_report::utils::{ensure_writable_dir, truncate_for_log};
use space_report::validator;

#[tokio::main]
#[instrument]
async fn main() {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    match run(args).await {
        Ok(artifact) => {
            info!(
                markdown = %artifact.markdown_path.display(),
                pdf = %artifact.pdf_path.display(),
                "Run complete"
            );
        }
        Err(e) => {
            error!(classification = e.classification(), error = %e, "Run failed");
            // The cron wrapper reads exactly one line from stderr.
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

async fn run(args: Cli) -> Result<RenderedArtifact, RunError> {
    let start_time = Instant::now();
    info!("space_report starting up");
    debug!(?args.input, ?args.output_dir, "Parsed CLI arguments");

    let mut config = RunConfig::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model_identifier = model;
    }
    let api_key = std::env::var(&config.api_key_env).map_err(|_| {
        RunError::Config(format!(
            "environment variable {} is not set",
            config.api_key_env
        ))
    })?;

    // Early check: fail before spending a completion on an unwritable target.
    ensure_writable_dir(&args.output_dir).await?;

    let run_date = args.run_date.unwrap_or_else(|| Local::now().date_naive());

    let store = RawInputStore::from_json_file(&args.input).await?;
    info!(count = store.len(), "Loaded capture file");
    if store.is_empty() {
        info!("No items collected this window; the report will say so");
    }

    let contract = ReportContract::standard();
    let template = prompt::instruction_template(&contract);
    let request = prompt::build(store.items(), &template, &config.model_identifier);
    debug!(
        prompt_chars = request.prompt_text().chars().count(),
        "Prompt built"
    );

    let client_config = config.client_config(api_key);
    let response = api::complete_with_backoff(&client_config, &request).await?;
    info!(
        model = %response.model_identifier,
        latency_ms = response.latency.as_millis() as u128,
        chars = response.raw_text.len(),
        "Completion received"
    );

    let report = match validator::validate(&response.raw_text, &contract) {
        Ok(report) => report,
        Err(e) => {
            warn!(
                response_preview = %truncate_for_log(&response.raw_text, 300),
                "Response failed structural validation"
            );
            return Err(e.into());
        }
    };
    info!(
        sections = report.sections.len(),
        "Report passed structural validation"
    );

    let artifact =
        outputs::write_artifacts(&report, run_date, &args.output_dir, &config.report_name).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(artifact)
}
