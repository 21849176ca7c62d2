//! Recipient extraction from raw address headers.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Loose `local@domain.tld` matcher.
///
/// Matches the address part wherever it appears, so display names, angle
/// brackets, group syntax and comments around it are ignored.
fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
            .expect("address pattern is valid")
    })
}

/// Extract all addresses from a raw header value.
///
/// The result is lowercased, sorted and free of duplicates, so the same
/// header always yields the same list regardless of address order.
///
/// # Examples
/// - `"Bob <Bob@x.com>, alice@x.com"` → `["alice@x.com", "bob@x.com"]`
/// - `"\"a@b.com\" <a@b.com>"` → `["a@b.com"]`
pub fn extract_addresses(raw: &str) -> Vec<String> {
    address_regex()
        .find_iter(raw)
        .map(|m| m.as_str().trim_matches('.').to_lowercase())
        .filter(|addr| !addr.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
