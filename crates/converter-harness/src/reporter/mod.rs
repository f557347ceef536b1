//! Comparison report rendering
//!
//! - **Console**: boxed summary for a terminal
//! - **JSON**: machine-readable, compact or pretty
//! - **Markdown**: a table for pull requests and docs

mod console;
mod json;
mod markdown;

use anyhow::Result;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use crate::runner::ComparisonReport;

pub use console::ConsoleReporter;
pub use json::JsonReporter;
pub use markdown::MarkdownReporter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    JsonPretty,
    #[default]
    Console,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json-pretty" | "pretty" => Ok(Self::JsonPretty),
            "console" | "text" => Ok(Self::Console),
            "markdown" | "md" => Ok(Self::Markdown),
            other => anyhow::bail!("unknown report format: {}", other),
        }
    }
}

#[derive(Debug, Default)]
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print to stdout
    pub fn report(&self, report: &ComparisonReport) -> Result<()> {
        let output = self.format_report(report)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(output.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, report: &ComparisonReport, path: P) -> Result<()> {
        fs::write(path, self.format_report(report)?)?;
        Ok(())
    }

    pub fn format_report(&self, report: &ComparisonReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => JsonReporter::format(report, false),
            OutputFormat::JsonPretty => JsonReporter::format(report, true),
            OutputFormat::Console => ConsoleReporter::format(report),
            OutputFormat::Markdown => MarkdownReporter::format(report),
        }
    }
}
