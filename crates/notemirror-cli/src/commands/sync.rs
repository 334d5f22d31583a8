use notemirror_core::SyncReport;

use crate::commands::common::{normalize_note_key, Context};
use crate::error::CliError;

pub async fn run_sync(prefer_local: bool, context: &Context) -> Result<(), CliError> {
    let mut engine = context.engine()?;
    let report = engine.sync_all(prefer_local).await?;

    for line in format_report_lines(&report) {
        println!("{line}");
    }
    finish(&report)
}

pub async fn run_sync_note(
    key: &str,
    prefer_local: bool,
    context: &Context,
) -> Result<(), CliError> {
    let key = normalize_note_key(key)?;
    let mut engine = context.engine()?;
    let outcome = engine.sync_note(&key, prefer_local).await?;

    println!("{key}: {outcome}");
    Ok(())
}

/// Error out when any note failed, after the report has been printed.
pub fn finish(report: &SyncReport) -> Result<(), CliError> {
    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::SyncIncomplete(report.failures.len()))
    }
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    let counts = [
        ("materialized", report.materialized.len()),
        ("pulled", report.pulled.len()),
        ("pushed", report.pushed.len()),
        ("restamped", report.restamped.len()),
        ("removed", report.removed.len()),
        ("unchanged", report.unchanged),
        ("skipped", report.skipped),
        ("failed", report.failures.len()),
    ];
    let summary = counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| format!("{count} {label}"))
        .collect::<Vec<_>>();

    if summary.is_empty() {
        lines.push("Nothing to sync".to_string());
    } else {
        lines.push(format!("Sync completed: {}", summary.join(", ")));
    }

    for failure in &report.failures {
        lines.push(format!("  {}: {}", failure.key, failure.error));
    }
    lines
}
