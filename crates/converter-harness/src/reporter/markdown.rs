//! Markdown reporter

use anyhow::Result;
use std::fmt::Write;

use crate::runner::ComparisonReport;

pub struct MarkdownReporter;

impl MarkdownReporter {
    pub fn format(report: &ComparisonReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "# Converter comparison: `{}`", report.file.display())?;
        writeln!(output)?;
        writeln!(
            output,
            "Started {} · {} iteration(s) · {}ms total",
            report.started_at, report.iterations, report.total_duration_ms
        )?;
        writeln!(output)?;
        writeln!(output, "| Converter | Fields | Confidence | Median (ms) | p95 (ms) | Status |")?;
        writeln!(output, "|---|---:|---:|---:|---:|---|")?;
        for m in &report.metrics {
            let p95 = m
                .timings
                .as_ref()
                .map(|t| format!("{:.0}", t.p95_ms))
                .unwrap_or_else(|| "-".to_string());
            let status = match &m.error {
                None => "ok".to_string(),
                Some(error) => format!("failed: {}", error.replace('|', "\\|")),
            };
            writeln!(
                output,
                "| {} | {} | {:.2} | {} | {} | {} |",
                m.converter, m.field_count, m.confidence, m.duration_ms, p95, status
            )?;
        }
        writeln!(output)?;
        writeln!(output, "## Recommendations")?;
        writeln!(output)?;
        for line in &report.analysis.recommendations {
            writeln!(output, "- {}", line)?;
        }
        Ok(output)
    }
}
