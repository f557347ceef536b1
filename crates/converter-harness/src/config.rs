//! Harness configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! [harness]
//! iterations = 5
//! parallelism = 2
//! watermark_check = false
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub harness: HarnessSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// Conversions per converter; the median duration is ranked (default: 1)
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Converters allowed to run at once (default: 4)
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Forwarded to every converter as `ConversionOptions::watermark_check`
    #[serde(default = "default_watermark_check")]
    pub watermark_check: bool,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            parallelism: default_parallelism(),
            watermark_check: default_watermark_check(),
        }
    }
}

fn default_iterations() -> u32 {
    1
}

fn default_parallelism() -> usize {
    4
}

fn default_watermark_check() -> bool {
    true
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.harness.iterations = iterations;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.harness.iterations == 0 {
            anyhow::bail!("iterations must be at least 1");
        }
        if self.harness.parallelism == 0 {
            anyhow::bail!("parallelism must be at least 1");
        }
        Ok(())
    }
}
