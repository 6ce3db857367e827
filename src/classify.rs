//! Column classifier — suggests which headers hold addresses.
//!
//! Display hint only; the caller always designates the column explicitly.

/// Header fragments that suggest an address column.
pub const EMAIL_COLUMN_KEYWORDS: [&str; 6] =
    ["email", "mail", "e-mail", "e_mail", "contact", "address"];

/// Headers whose lowercase form contains any keyword, in input order.
pub fn email_columns(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .filter(|h| {
            let lower = h.to_lowercase();
            EMAIL_COLUMN_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .cloned()
        .collect()
}
