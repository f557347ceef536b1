//! Data-driven watermark rules
//!
//! Defaults match the sample-document watermarks seen in the template corpus.
//! Deployments override them with a TOML file:
//!
//! ```toml
//! text_keywords = ["acme.example sample", "sample document"]
//! url_pattern = '(?i)acme\.example'
//! sample_pattern = '(?i)sample\s+document'
//! full_pattern = '(?i)acme\.example\s+sample\s+document'
//! office_keywords = ["draft", "confidential"]
//! exclude_patterns = ["_clean"]
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::WatermarkError;

/// Environment variable naming a TOML rules file
pub const RULES_PATH_ENV: &str = "WATERMARK_RULES_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkRules {
    /// Substrings (case-insensitive) that make a PDF text run a candidate
    #[serde(default = "default_text_keywords")]
    pub text_keywords: Vec<String>,
    #[serde(default = "default_url_pattern")]
    pub url_pattern: String,
    #[serde(default = "default_sample_pattern")]
    pub sample_pattern: String,
    /// Brand URL immediately followed by the sample phrase
    #[serde(default = "default_full_pattern")]
    pub full_pattern: String,
    /// Substrings (case-insensitive) that mark an Office document
    #[serde(default = "default_office_keywords")]
    pub office_keywords: Vec<String>,
    /// Folders a batch scan walks by default
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,
    /// Path fragments a batch scan skips
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Rendered text height, in points, that counts as large
    #[serde(default = "default_large_font_size")]
    pub large_font_size: f64,
}

impl Default for WatermarkRules {
    fn default() -> Self {
        Self {
            text_keywords: default_text_keywords(),
            url_pattern: default_url_pattern(),
            sample_pattern: default_sample_pattern(),
            full_pattern: default_full_pattern(),
            office_keywords: default_office_keywords(),
            directories: default_directories(),
            exclude_patterns: default_exclude_patterns(),
            large_font_size: default_large_font_size(),
        }
    }
}

impl WatermarkRules {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WatermarkError::RulesError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, WatermarkError> {
        toml::from_str(s).map_err(|e| WatermarkError::RulesError(e.to_string()))
    }

    /// Rules from [`RULES_PATH_ENV`] when set, otherwise the defaults
    pub fn from_env() -> Result<Self, WatermarkError> {
        match std::env::var(RULES_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.exclude_patterns.iter().any(|p| path.contains(p.as_str()))
    }

    pub(crate) fn compile(self) -> Result<CompiledRules, WatermarkError> {
        Ok(CompiledRules {
            url: compile_pattern(&self.url_pattern)?,
            sample: compile_pattern(&self.sample_pattern)?,
            full: compile_pattern(&self.full_pattern)?,
            text_keywords_lower: lowercase_all(&self.text_keywords),
            office_keywords_lower: lowercase_all(&self.office_keywords),
            rules: self,
        })
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, WatermarkError> {
    Regex::new(pattern).map_err(|e| WatermarkError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Rules with patterns compiled and keywords lowercased once
#[derive(Debug)]
pub(crate) struct CompiledRules {
    pub rules: WatermarkRules,
    pub url: Regex,
    pub sample: Regex,
    pub full: Regex,
    pub text_keywords_lower: Vec<String>,
    pub office_keywords_lower: Vec<String>,
}

impl CompiledRules {
    pub fn has_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.text_keywords_lower.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Full brand pattern, or URL and sample phrase together
    pub fn has_pattern(&self, text: &str) -> bool {
        self.full.is_match(text) || (self.url.is_match(text) && self.sample.is_match(text))
    }

    pub fn has_brand_pattern(&self, text: &str) -> bool {
        self.full.is_match(text)
    }

    pub fn office_keyword_in(&self, text_lower: &str) -> Option<&str> {
        self.office_keywords_lower
            .iter()
            .find(|k| text_lower.contains(k.as_str()))
            .map(String::as_str)
    }
}

fn default_text_keywords() -> Vec<String> {
    vec![
        "www.businessdriver.ng sample document".to_string(),
        "businessdriver.ng".to_string(),
        "sample document".to_string(),
        "www.businessdriver.ng".to_string(),
    ]
}

fn default_url_pattern() -> String {
    r"(?i)www\.businessdriver\.ng".to_string()
}

fn default_sample_pattern() -> String {
    r"(?i)sample\s+document".to_string()
}

fn default_full_pattern() -> String {
    r"(?i)www\.businessdriver\.ng\s+sample\s+document".to_string()
}

fn default_office_keywords() -> Vec<String> {
    vec![
        "draft".to_string(),
        "confidential".to_string(),
        "sample".to_string(),
        "watermark".to_string(),
        "do not copy".to_string(),
        "internal use only".to_string(),
    ]
}

fn default_directories() -> Vec<String> {
    vec!["Free Templates and Forms".to_string(), "templates".to_string()]
}

fn default_exclude_patterns() -> Vec<String> {
    vec!["_clean".to_string(), "-processed".to_string()]
}

fn default_large_font_size() -> f64 {
    20.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let rules = WatermarkRules::from_str(r#"office_keywords = ["proof"]"#).unwrap();
        assert_eq!(rules.office_keywords, vec!["proof".to_string()]);
        assert_eq!(rules.text_keywords, default_text_keywords());
        assert_eq!(rules.large_font_size, 20.0);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let rules = WatermarkRules {
            url_pattern: "(".to_string(),
            ..WatermarkRules::default()
        };
        let err = rules.compile().unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidPattern { .. }));
    }

    #[test]
    fn test_default_pattern_matching() {
        let compiled = WatermarkRules::default().compile().unwrap();
        assert!(compiled.has_pattern("WWW.BUSINESSDRIVER.NG   Sample Document"));
        assert!(compiled.has_brand_pattern("www.businessdriver.ng sample document"));
        assert!(!compiled.has_pattern("sample document"));
        assert!(compiled.has_keyword("Sample Document"));
    }

    #[test]
    fn test_exclude_patterns() {
        let rules = WatermarkRules::default();
        assert!(rules.is_excluded(Path::new("templates/lease_clean.pdf")));
        assert!(rules.is_excluded(Path::new("out/form-processed.docx")));
        assert!(!rules.is_excluded(Path::new("templates/lease.pdf")));
    }
}
