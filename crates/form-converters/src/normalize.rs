//! Office to PDF normalization through LibreOffice
//!
//! The converted file lives in a private temporary directory owned by the
//! returned [`PdfSource`]; dropping it removes the directory on every path.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ConverterError;
use crate::gate::WatermarkGate;

/// A PDF ready to send to a backend
#[derive(Debug)]
pub enum PdfSource {
    /// The caller's file, already a PDF
    Original(PathBuf),
    /// A temporary conversion, removed on drop
    Converted { path: PathBuf, _dir: TempDir },
}

impl PdfSource {
    pub fn path(&self) -> &Path {
        match self {
            PdfSource::Original(path) => path,
            PdfSource::Converted { path, .. } => path,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, PdfSource::Converted { .. })
    }
}

/// Runs `soffice --headless --convert-to pdf` with a time bound
#[derive(Debug, Clone)]
pub struct PdfNormalizer {
    soffice_bin: String,
    timeout: Duration,
}

impl PdfNormalizer {
    pub fn new(soffice_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            soffice_bin: soffice_bin.into(),
            timeout,
        }
    }

    /// PDFs pass through; DOCX/XLSX are watermark-checked, then converted
    pub async fn ensure_pdf(
        &self,
        path: &Path,
        gate: Option<&WatermarkGate>,
    ) -> Result<PdfSource, ConverterError> {
        let ext = watermark_detector::extension(path);
        match ext.as_str() {
            "pdf" => Ok(PdfSource::Original(path.to_path_buf())),
            "docx" | "xlsx" => {
                if let Some(gate) = gate {
                    gate.check(path).await?;
                }
                self.convert(path).await
            }
            other => Err(ConverterError::UnsupportedFileType(other.to_string())),
        }
    }

    async fn convert(&self, path: &Path) -> Result<PdfSource, ConverterError> {
        let dir = tempfile::Builder::new().prefix("form-pdf-").tempdir()?;
        debug!(input = %path.display(), outdir = %dir.path().display(), "Converting to PDF");

        let child = Command::new(&self.soffice_bin)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(dir.path())
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ConverterError::Timeout {
                service: "soffice".to_string(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| ConverterError::tool("soffice", e.to_string()))?;

        if !output.status.success() {
            return Err(ConverterError::tool(
                "soffice",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stem = path
            .file_stem()
            .ok_or_else(|| ConverterError::tool("soffice", "input has no file name"))?;
        let converted = dir.path().join(stem).with_extension("pdf");
        if !converted.exists() {
            return Err(ConverterError::tool("soffice", "no PDF was produced"));
        }

        info!(input = %path.display(), "Converted to PDF");
        Ok(PdfSource::Converted {
            path: converted,
            _dir: dir,
        })
    }
}
