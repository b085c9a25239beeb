//! Citizen-text sanitizing.
//!
//! Appeal bodies arrive from a rich-text form; listings and captions want
//! plain text.

use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Remove markup tags from citizen-entered text.
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG_REGEX.replace_all(text, "").into_owned()
}
