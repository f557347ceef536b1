//! JSON reporter

use anyhow::Result;

use crate::runner::ComparisonReport;

pub struct JsonReporter;

impl JsonReporter {
    pub fn format(report: &ComparisonReport, pretty: bool) -> Result<String> {
        let mut output = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        output.push('\n');
        Ok(output)
    }
}
