//! Document-derived decode — fetched web pages to one contact per page.
//!
//! Each reachable page yields exactly one record. Unreachable pages are
//! logged and skipped; the batch only fails when nothing at all was found.

use std::path::Path;

use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use super::fetcher::DocumentFetcher;
use super::patterns::find_page_addresses;
use super::table::{CanonicalTable, ContactRecord, EMAIL_KEY};
use crate::config::IngestConfig;
use crate::error::{FetchError, IngestError};

/// Column layout of a document-derived table.
pub const DOCUMENT_HEADERS: [&str; 11] = [
    "url",
    "domain",
    "company",
    "position",
    EMAIL_KEY,
    "contact_email",
    "hr_email",
    "careers_email",
    "location",
    "title",
    "description",
];

/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

const COMPANY_META: [(&str, &str); 2] = [
    (r#"meta[property="og:site_name"]"#, "content"),
    (r#"meta[name="application-name"]"#, "content"),
];
const COMPANY_SELECTORS: [&str; 2] = [".company-name", r#"[class*="company"]"#];
const POSITION_SELECTORS: [&str; 3] = ["h1", ".job-title", r#"[class*="title"]"#];
const LOCATION_SELECTORS: [&str; 3] = [".location", r#"[class*="location"]"#, ".job-location"];
const DESCRIPTION_SELECTORS: [&str; 3] = [".job-description", ".description", "p"];

/// Fetch every URI and normalize the pages into a [`CanonicalTable`].
pub async fn normalize_documents(
    uris: &[String],
    fetcher: &dyn DocumentFetcher,
    config: &IngestConfig,
) -> Result<CanonicalTable, IngestError> {
    let targets: Vec<Url> = uris
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .filter_map(|u| match parse_source_uri(u) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Skipping source: {e}");
                None
            }
        })
        .collect();

    info!(
        sources = targets.len(),
        concurrency = config.fetch_concurrency,
        "Fetching contact sources"
    );

    let timeout = config.fetch_timeout;
    let fetched: Vec<(Url, Result<String, FetchError>)> = stream::iter(targets)
        .map(|url| async move {
            let result = match tokio::time::timeout(timeout, fetcher.fetch(&url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    uri: url.to_string(),
                    timeout,
                }),
            };
            (url, result)
        })
        .buffered(config.fetch_concurrency.max(1))
        .collect()
        .await;

    let mut rows = Vec::new();
    for (url, result) in fetched {
        match result {
            Ok(markup) => match extract_contact(&url, &markup, config.synthesize_fallback) {
                Some(record) => rows.push(record),
                None => warn!(url = %url, "No address found on page, skipping"),
            },
            Err(e) => warn!("Fetch failed, skipping: {e}"),
        }
    }

    if rows.is_empty() {
        return Err(IngestError::NoContactInfoFound);
    }

    info!(contacts = rows.len(), "Extracted contacts from documents");
    CanonicalTable::new(DOCUMENT_HEADERS.iter().map(|h| h.to_string()).collect(), rows)
}

/// Parse and check a source URI. Only http(s) sources with a host are accepted.
pub fn parse_source_uri(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUri {
        uri: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(FetchError::InvalidUri {
            uri: raw.to_string(),
            reason: "expected an http(s) URL with a host".into(),
        });
    }
    Ok(url)
}

/// Build the contact record for one fetched page.
///
/// Returns `None` only when the page has no address and fallback synthesis
/// is disabled.
pub fn extract_contact(url: &Url, markup: &str, synthesize_fallback: bool) -> Option<ContactRecord> {
    let doc = Html::parse_document(markup);
    let host = url.host_str().unwrap_or_default();
    let domain = host.strip_prefix("www.").unwrap_or(host);

    let company = COMPANY_META
        .iter()
        .find_map(|(sel, attr)| query_attr(&doc, sel, attr))
        .or_else(|| first_text(&doc, &COMPANY_SELECTORS))
        .unwrap_or_else(|| domain.split('.').next().unwrap_or(domain).to_string());

    let description = first_text(&doc, &DESCRIPTION_SELECTORS)
        .map(|d| d.chars().take(MAX_DESCRIPTION_CHARS).collect::<String>())
        .unwrap_or_default();

    let mut record = ContactRecord::new()
        .with("url", url.as_str())
        .with("domain", host)
        .with("company", company)
        .with("position", first_text(&doc, &POSITION_SELECTORS).unwrap_or_default())
        .with("location", first_text(&doc, &LOCATION_SELECTORS).unwrap_or_default())
        .with("title", query_text(&doc, "title").unwrap_or_default())
        .with("description", description);

    let found = find_page_addresses(&all_text(&doc));
    debug!(url = %url, found = found.len(), "Scanned page for addresses");

    match pick_address(&found) {
        Some(address) => record.set(EMAIL_KEY, address),
        None if synthesize_fallback => {
            record.set(EMAIL_KEY, format!("careers@{domain}"));
            record.set("contact_email", format!("contact@{domain}"));
            record.set("hr_email", format!("hr@{domain}"));
            record.set("careers_email", format!("careers@{domain}"));
        }
        None => return None,
    }

    Some(record)
}

/// Choose among found addresses: careers/jobs/hr first, then contact/info,
/// then whatever came first.
pub fn pick_address(found: &[String]) -> Option<String> {
    let matches_any = |addr: &str, keys: &[&str]| {
        let lower = addr.to_lowercase();
        keys.iter().any(|k| lower.contains(k))
    };

    found
        .iter()
        .find(|a| matches_any(a, &["career", "jobs", "hr"]))
        .or_else(|| found.iter().find(|a| matches_any(a, &["contact", "info"])))
        .or_else(|| found.first())
        .cloned()
}

/// Concatenated, trimmed text of every element matching `selector`.
pub fn query_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let text = doc
        .select(&sel)
        .flat_map(|el| el.text())
        .collect::<String>();
    normalize_ws(&text)
}

/// Trimmed text of the first element matching `selector`.
pub fn query_first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    normalize_ws(&el.text().collect::<String>())
}

/// Attribute value of the first element matching `selector`.
pub fn query_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .and_then(normalize_ws)
}

/// All rendered text in the document, text nodes separated by spaces.
pub fn all_text(doc: &Html) -> String {
    doc.root_element().text().collect::<Vec<_>>().join(" ")
}

fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel| query_first_text(doc, sel))
}

fn normalize_ws(text: &str) -> Option<String> {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Read a newline-separated list of source URIs. Blank lines and `#`
/// comments are ignored.
pub fn read_uri_list(path: &Path) -> Result<Vec<String>, IngestError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::table::FieldValue;

    const JOB_PAGE: &str = r#"<!doctype html>
<html>
<head>
  <title>Senior Rust Engineer - Acme</title>
  <meta property="og:site_name" content="Acme Robotics">
</head>
<body>
  <h1>Senior Rust Engineer</h1>
  <div class="job-location">Berlin, DE</div>
  <div class="job-description">Build   fast things.</div>
  <p>Questions? info@acme.io or apply via careers@acme.io</p>
  <footer>press@acme.io</footer>
</body>
</html>"#;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn text_of<'a>(record: &'a ContactRecord, key: &str) -> Option<&'a str> {
        record.get(key).and_then(FieldValue::as_text)
    }

    #[test]
    fn extracts_page_fields() {
        let record = extract_contact(&url("https://www.acme.io/jobs/1"), JOB_PAGE, true).unwrap();
        assert_eq!(text_of(&record, "title"), Some("Senior Rust Engineer - Acme"));
        assert_eq!(text_of(&record, "company"), Some("Acme Robotics"));
        assert_eq!(text_of(&record, "position"), Some("Senior Rust Engineer"));
        assert_eq!(text_of(&record, "location"), Some("Berlin, DE"));
        assert_eq!(text_of(&record, "description"), Some("Build fast things."));
        assert_eq!(text_of(&record, "domain"), Some("www.acme.io"));
        assert_eq!(record.email(), Some("careers@acme.io"));
        assert!(record.get("hr_email").is_none());
    }

    #[test]
    fn company_falls_back_to_domain_label() {
        let page = "<html><head><title>Hi</title></head><body>hello@beta.dev</body></html>";
        let record = extract_contact(&url("https://www.beta.dev/"), page, true).unwrap();
        assert_eq!(text_of(&record, "company"), Some("beta"));
        assert_eq!(record.email(), Some("hello@beta.dev"));
    }

    #[test]
    fn description_is_truncated() {
        let long = "x".repeat(500);
        let page = format!("<html><body><p>{long}</p><p>a@b.io</p></body></html>");
        let record = extract_contact(&url("https://b.io/"), &page, true).unwrap();
        let description = text_of(&record, "description").unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn missing_address_synthesizes_guesses() {
        let page = "<html><head><title>Careers</title></head><body><h1>Join us</h1></body></html>";
        let record = extract_contact(&url("https://www.gamma.com/careers"), page, true).unwrap();
        assert_eq!(record.email(), Some("careers@gamma.com"));
        assert_eq!(text_of(&record, "contact_email"), Some("contact@gamma.com"));
        assert_eq!(text_of(&record, "hr_email"), Some("hr@gamma.com"));
        assert_eq!(text_of(&record, "careers_email"), Some("careers@gamma.com"));
    }

    #[test]
    fn missing_address_without_synthesis_yields_nothing() {
        let page = "<html><body><h1>Join us</h1></body></html>";
        assert!(extract_contact(&url("https://gamma.com/"), page, false).is_none());
    }

    #[test]
    fn address_priority() {
        let found = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            pick_address(&found(&["sales@x.com", "info@x.com", "jobs@x.com"])).as_deref(),
            Some("jobs@x.com")
        );
        assert_eq!(
            pick_address(&found(&["sales@x.com", "contact@x.com"])).as_deref(),
            Some("contact@x.com")
        );
        assert_eq!(
            pick_address(&found(&["sales@x.com", "press@x.com"])).as_deref(),
            Some("sales@x.com")
        );
        assert_eq!(pick_address(&[]), None);
    }

    #[test]
    fn rejects_non_http_uris() {
        assert!(parse_source_uri("ftp://example.com/file").is_err());
        assert!(parse_source_uri("not a url").is_err());
        assert!(parse_source_uri("https://example.com/jobs").is_ok());
    }

    #[test]
    fn markup_queries() {
        let doc = Html::parse_document(JOB_PAGE);
        assert_eq!(
            query_attr(&doc, r#"meta[property="og:site_name"]"#, "content").as_deref(),
            Some("Acme Robotics")
        );
        assert_eq!(query_first_text(&doc, ".missing"), None);
        assert!(all_text(&doc).contains("press@acme.io"));
    }

    #[test]
    fn uri_list_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "# sources\nhttps://a.com\n\n  https://b.com  \n").unwrap();
        let uris = read_uri_list(&path).unwrap();
        assert_eq!(uris, ["https://a.com", "https://b.com"]);
    }
}
