//! Address patterns shared by ingestion and validation.

use std::sync::LazyLock;

use regex::Regex;

/// Cell-text pattern: any local part without whitespace, `@` or the
/// delimiters that usually surround an address in free text.
static EXTRACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\s@<>()\[\],;:"]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}"#).unwrap()
});

/// Page-text pattern: conservative local part, so markup noise glued to an
/// address is not picked up.
static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap()
});

/// Whole-value pattern: `local@domain.tld`, no whitespace anywhere.
static STRICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Quoting and punctuation that may cling to the front of a match.
const LEADING_NOISE: [char; 4] = ['\'', '`', '.', '*'];

/// All addresses in a cell's text, in order of appearance, deduplicated.
pub fn find_addresses(text: &str) -> Vec<String> {
    collect(&EXTRACT_RE, text)
}

/// All addresses in rendered page text, in order of appearance, deduplicated.
pub fn find_page_addresses(text: &str) -> Vec<String> {
    collect(&PAGE_RE, text)
}

fn collect(re: &Regex, text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let addr = m.as_str().trim_start_matches(LEADING_NOISE);
        if !is_whole_match(re, addr) {
            continue;
        }
        let lower = addr.to_lowercase();
        if !found.iter().any(|f| f.to_lowercase() == lower) {
            found.push(addr.to_string());
        }
    }
    found
}

fn is_whole_match(re: &Regex, value: &str) -> bool {
    re.find(value)
        .is_some_and(|m| m.start() == 0 && m.end() == value.len())
}

/// Whether `text` contains at least one address.
pub fn contains_address(text: &str) -> bool {
    !find_addresses(text).is_empty()
}

/// Whether the whole value is an address as cell extraction sees it.
pub fn is_email_shaped(value: &str) -> bool {
    is_whole_match(&EXTRACT_RE, value)
}

/// Strict validation used before dispatch.
pub fn is_valid_address(value: &str) -> bool {
    STRICT_RE.is_match(value)
}
