//! Console reporter

use anyhow::Result;
use std::fmt::Write;

use crate::runner::{ComparisonReport, ConversionMetrics};

pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn format(report: &ComparisonReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                    CONVERTER COMPARISON                      ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;
        writeln!(output, "File:        {}", report.file.display())?;
        writeln!(output, "Started:     {}", report.started_at)?;
        writeln!(output, "Iterations:  {}", report.iterations)?;
        writeln!(output, "Duration:    {}ms", report.total_duration_ms)?;
        writeln!(output)?;

        if report.metrics.is_empty() {
            writeln!(output, "No converter handles this file type.")?;
        }
        for metrics in &report.metrics {
            Self::format_metrics(&mut output, metrics)?;
        }

        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        writeln!(output, "Analysis:")?;
        for line in &report.analysis.recommendations {
            writeln!(output, "  • {}", line)?;
        }
        writeln!(output)?;
        Ok(output)
    }

    fn format_metrics(output: &mut String, metrics: &ConversionMetrics) -> Result<()> {
        let status = if metrics.error.is_none() { "✓" } else { "✗" };
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        writeln!(output, "Converter: {} {}", metrics.converter, status)?;
        writeln!(output, "  Fields Detected:   {}", metrics.field_count)?;
        writeln!(output, "  Confidence Score:  {:.1}%", metrics.confidence * 100.0)?;
        writeln!(output, "  Processing Time:   {}ms", metrics.duration_ms)?;
        if let Some(timings) = metrics.timings.as_ref().filter(|t| t.iterations > 1) {
            writeln!(
                output,
                "  Timings:           min {:.0}ms, p50 {:.0}ms, p95 {:.0}ms, max {:.0}ms over {} runs",
                timings.min_ms, timings.p50_ms, timings.p95_ms, timings.max_ms, timings.iterations
            )?;
        }
        if let Some(error) = &metrics.error {
            writeln!(output, "  Error:             {}", error)?;
        }
        writeln!(output)?;
        Ok(())
    }
}
