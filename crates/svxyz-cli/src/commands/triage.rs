use crate::cli::TriageArgs;
use crate::config::builder;
use crate::config::file;
use crate::config::models::TriageFile;
use crate::error::Result;
use std::fs;
use std::path::Path;
use crate::utils::progress::CliProgressHandler;
use svxyz::workflows::triage::{self, TriageReport};
use tracing::info;

pub fn run(args: TriageArgs, progress: &CliProgressHandler) -> Result<()> {
    if file::create_if_missing(&args.config, &TriageFile::default())? {
        println!("Default configuration created: {}", args.config.display());
        println!("Configuration file not found. Generated a default configuration; edit it and run again.");
        return Ok(());
    }

    let file: TriageFile = file::load(&args.config, &args.set_values)?;
    let settings = builder::build_triage(&file)?;
    info!(
        "Loaded '{}' with {} active filter(s).",
        args.config.display(),
        settings.core_config.filter.len()
    );

    let report = triage::run(&settings.core_config, &progress.reporter())?;
    println!(
        "Filtered {} frames saved to {}",
        report.total.passed,
        report.output_file.display()
    );
    if settings.show_summary {
        for line in summary_lines(&report) {
            println!("{}", line);
        }
    }
    if let Some(path) = &args.report {
        write_report(&report, path)?;
        info!("Report written to '{}'.", path.display());
    }
    Ok(())
}

fn write_report(report: &TriageReport, path: &Path) -> Result<()> {
    let mut text = serde_json::to_string_pretty(report).map_err(anyhow::Error::from)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

pub fn summary_lines(report: &TriageReport) -> Vec<String> {
    let t = &report.total;
    let mut lines = vec![
        String::new(),
        "Summary:".to_string(),
        format!("  Input files: {}", report.files.len()),
        format!("  Total frames: {}", t.read),
        format!("  Skipped frames: {}", t.skipped_by_offset),
        format!("  Outside frame range: {}", t.outside_window),
        format!("  Filtered frames: {}", t.passed),
        format!(
            "  Rejected frames: {} ({} with missing or unconvertible data)",
            t.rejected, t.missing_or_unconvertible
        ),
    ];

    let rejecting: Vec<_> = t.per_predicate.iter().filter(|(_, n)| *n > 0).collect();
    if !rejecting.is_empty() {
        lines.push("  Rejections by filter:".to_string());
        for (label, count) in rejecting {
            lines.push(format!("    {:<18}{}", label, count));
        }
    }

    if report.files.len() > 1 {
        lines.push("  Per file:".to_string());
        for f in &report.files {
            lines.push(format!(
                "    {}: {} read, {} kept",
                f.path.display(),
                f.counts.read,
                f.counts.passed
            ));
        }
    }

    if !report.skipped_inputs.is_empty() {
        lines.push("  Unreadable inputs:".to_string());
        for s in &report.skipped_inputs {
            lines.push(format!("    {}: {}", s.path.display(), s.reason));
        }
    }
    lines
}
