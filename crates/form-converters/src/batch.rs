//! Directory batch conversion

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use watermark_detector::WatermarkRules;

use crate::converter::ConversionOptions;
use crate::error::ConverterError;
use crate::factory::ConverterFactory;
use crate::gate::WatermarkGate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    pub recursive: bool,
    /// Lowercase extensions without the dot
    pub file_types: Vec<String>,
    pub skip_watermarked: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            file_types: vec!["pdf".to_string(), "docx".to_string(), "xlsx".to_string()],
            skip_watermarked: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub file: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedFile {
    pub file: PathBuf,
    pub confidence: f64,
    pub section_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<BatchFailure>,
    pub converted: Vec<ConvertedFile>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }

    fn fail(&mut self, file: &Path, error: impl Into<String>) {
        self.failure_count += 1;
        self.errors.push(BatchFailure {
            file: file.to_path_buf(),
            error: error.into(),
        });
    }
}

pub struct BatchProcessor {
    factory: ConverterFactory,
    gate: WatermarkGate,
}

impl BatchProcessor {
    pub fn new(factory: ConverterFactory, gate: WatermarkGate) -> Self {
        Self { factory, gate }
    }

    /// Convert every matching file under `dir`, one at a time. Only an
    /// unreadable `dir` is an error; per-file problems land in the report.
    #[instrument(skip(self, options))]
    pub async fn process_directory(
        &self,
        dir: &Path,
        options: &BatchOptions,
    ) -> Result<BatchReport, ConverterError> {
        let rules = self.gate.detector().rules().clone();
        let root = dir.to_path_buf();
        let walk_options = options.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&root, &walk_options, &rules))
            .await
            .map_err(|e| ConverterError::Io(std::io::Error::other(e.to_string())))??;

        let mut report = BatchReport {
            total_files: files.len(),
            ..BatchReport::default()
        };
        // The gate already ran (or was waived) for every file
        let convert_options = ConversionOptions {
            watermark_check: false,
            ..ConversionOptions::default()
        };

        for file in files {
            if options.skip_watermarked {
                let verdict = self.gate.verdict(&file).await;
                if let Err(e) = self.gate.enforce(&file, verdict) {
                    info!(file = %file.display(), reason = %e, "Skipping file");
                    report.fail(&file, e.to_string());
                    continue;
                }
            }

            let result = self.factory.convert(&file, &convert_options).await;
            if result.success {
                report.success_count += 1;
                report.converted.push(ConvertedFile {
                    file,
                    confidence: result.confidence,
                    section_count: result.sections.len(),
                });
            } else {
                let error = result.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(file = %file.display(), error = %error, "Batch conversion failed");
                report.fail(&file, error);
            }
        }

        info!(
            total = report.total_files,
            succeeded = report.success_count,
            failed = report.failure_count,
            "Batch finished"
        );
        Ok(report)
    }
}

/// Matching files under `dir`, sorted, minus excluded paths
fn collect_files(
    dir: &Path,
    options: &BatchOptions,
    rules: &WatermarkRules,
) -> Result<Vec<PathBuf>, ConverterError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                if options.recursive {
                    pending.push(path);
                }
                continue;
            }
            let ext = watermark_detector::extension(&path);
            if options.file_types.iter().any(|t| t.eq_ignore_ascii_case(&ext))
                && !rules.is_excluded(&path)
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collect_files_filters_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.pdf", "a.docx", "notes.txt", "lease_clean.pdf", "nested/c.xlsx"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let rules = WatermarkRules::default();
        let files = collect_files(dir.path(), &BatchOptions::default(), &rules).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.docx", "b.pdf", "nested/c.xlsx"]);

        let flat = BatchOptions {
            recursive: false,
            ..BatchOptions::default()
        };
        assert_eq!(collect_files(dir.path(), &flat, &rules).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let err = collect_files(
            Path::new("/nonexistent/templates"),
            &BatchOptions::default(),
            &WatermarkRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConverterError::Io(_)));
    }
}
