//! Keyword lists and regex patterns used by field detection

use lazy_static::lazy_static;
use regex::Regex;

/// Labels that name a rating or ranking question
pub const RATING_KEYWORDS: &[&str] = &["rating", "score", "rank"];

pub const DATE_KEYWORDS: &[&str] = &["date", "when"];

pub const FILE_KEYWORDS: &[&str] = &["upload", "attachment", "file"];

pub const CURRENCY_KEYWORDS: &[&str] = &["cost", "price", "amount", "budget"];

pub const URL_KEYWORDS: &[&str] = &["url", "website", "link"];

/// Labels asking for free-form prose
pub const TEXTAREA_KEYWORDS: &[&str] = &["description", "comments", "feedback", "explain"];

pub const SIGNATURE_KEYWORDS: &[&str] = &["signature"];

pub const COLOR_KEYWORDS: &[&str] = &["color", "colour"];

pub const EMAIL_KEYWORDS: &[&str] = &["email", "e-mail"];

pub const PHONE_KEYWORDS: &[&str] = &["phone", "mobile", "tel"];

pub const NUMBER_KEYWORDS: &[&str] = &["number", "amount", "quantity"];

/// Labels whose values are money amounts that must be non-negative
pub const MONEY_RULE_KEYWORDS: &[&str] = &["salary", "budget", "cost"];

pub const BRIEF_KEYWORDS: &[&str] = &["summary", "brief"];

pub const DETAILED_KEYWORDS: &[&str] = &["description", "explain"];

/// Free text longer than this is treated as a textarea prompt
pub const TEXTAREA_MIN_TEXT_LEN: usize = 100;

pub const EMPLOYEE_ID_PATTERN: &str = "^[A-Z]{2}[0-9]{6}$";

/// Emoji faces for a five-point emoji scale, lowest first
pub const EMOJI_SCALE: &[&str] = &["😞", "😕", "😐", "🙂", "😀"];

lazy_static! {
    /// "rate ... 3" or "4 ... rate" style prompts
    pub static ref RATE_PATTERN: Regex = Regex::new(r"(?i)rate.*[1-5]|[1-5].*rate").unwrap();

    /// dd-mm-yyyy or mm/dd/yyyy
    pub static ref DATE_TEXT_PATTERN: Regex = Regex::new(r"\d{2}[-/]\d{2}[-/]\d{4}").unwrap();

    pub static ref CURRENCY_GLYPH_PATTERN: Regex = Regex::new(r"[$€£¥]").unwrap();

    pub static ref URL_TEXT_PATTERN: Regex = Regex::new(r"https?://").unwrap();

    /// Seven or more digits in a phone-like grouping
    pub static ref PHONE_TEXT_PATTERN: Regex =
        Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap();

    pub static ref DIGITS_ONLY_PATTERN: Regex = Regex::new(r"^\d+$").unwrap();

    /// "1 to 10"
    pub static ref SCALE_TO_PATTERN: Regex = Regex::new(r"(?i)(\d+)\s*to\s*(\d+)").unwrap();

    /// "1-10"
    pub static ref SCALE_RANGE_PATTERN: Regex = Regex::new(r"(\d+)\s*-\s*(\d+)").unwrap();

    /// "5 stars"
    pub static ref SCALE_STARS_PATTERN: Regex = Regex::new(r"(?i)(\d+)\s*stars?").unwrap();

    /// Markdown heading prefix, "# " through "#### "
    pub static ref HEADING_PREFIX_PATTERN: Regex = Regex::new(r"^(#{1,4}) ").unwrap();
}

/// Case-insensitive check for any keyword in `haystack` (expects lowercase input)
pub fn contains_any(haystack_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack_lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_any() {
        assert!(contains_any("start date", DATE_KEYWORDS));
        assert!(!contains_any("employee name", DATE_KEYWORDS));
    }

    #[test]
    fn test_phone_pattern_requires_full_number() {
        assert!(PHONE_TEXT_PATTERN.is_match("(555) 123-4567"));
        assert!(PHONE_TEXT_PATTERN.is_match("+1 555.123.4567"));
        assert!(!PHONE_TEXT_PATTERN.is_match("1 to 10"));
    }

    #[test]
    fn test_scale_patterns() {
        let caps = SCALE_TO_PATTERN.captures("Scale: 1 to 10").unwrap();
        assert_eq!(&caps[1], "1");
        assert_eq!(&caps[2], "10");
        assert!(SCALE_STARS_PATTERN.is_match("out of 5 stars"));
    }
}
