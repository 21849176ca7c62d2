//! Raw RFC 5322 header access: header block location, unfolding, charset
//! fallback and lenient date parsing.
//!
//! mail-parser covers the decoded view of a message. The helpers here work
//! on the raw header text, which is what address matching and the date
//! fallback need.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

/// Formats tried after RFC 2822 and RFC 3339 have failed.
const DATE_FORMATS: [&str; 8] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Zone abbreviations seen in the wild that chrono's `%z` does not accept.
const NAMED_ZONES: [(&str, &str); 13] = [
    ("CEST", "+0200"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("CET", "+0100"),
    ("JST", "+0900"),
];

/// Strip a UTF-8 BOM and an mbox `From ` separator line, if present.
///
/// Messages cut out of an mbox by other tools often keep the separator.
pub fn skip_envelope_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Return the header block: everything before the first blank line.
pub fn header_block(data: &[u8]) -> &[u8] {
    let end = data
        .windows(2)
        .position(|w| w == b"\n\n")
        .into_iter()
        .chain(data.windows(4).position(|w| w == b"\r\n\r\n"))
        .min()
        .unwrap_or(data.len());
    &data[..end]
}

/// `true` if the first line looks like a `Name: value` header field.
pub fn starts_with_header_field(data: &[u8]) -> bool {
    let first_line = data.split(|&b| b == b'\n').next().unwrap_or_default();
    match first_line.iter().position(|&b| b == b':') {
        Some(0) | None => false,
        Some(colon) => first_line[..colon]
            .iter()
            .all(|&b| (33..=126).contains(&b) && b != b':'),
    }
}

/// Decode raw header bytes to text.
///
/// Tries UTF-8 first, then falls back to Windows-1252, which accepts every byte.
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers into `(lowercase_name, raw_value)` pairs.
///
/// Continuation lines (leading space or tab) are joined to the previous
/// field; stray lines without a colon are dropped.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            result.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    result
}

/// All values of a header (case-insensitive), joined with `", "`.
///
/// Repeated `To:` fields are legal enough in practice that they must not
/// hide each other.
pub fn joined_header(headers: &[(String, String)], name: &str) -> Option<String> {
    let name = name.to_lowercase();
    let values: Vec<&str> = headers
        .iter()
        .filter(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
        .collect();
    (!values.is_empty()).then(|| values.join(", "))
}

/// Parse a `Date:` header value, accepting the usual malformed variants.
///
/// Returns `None` when nothing matches; callers substitute a sentinel.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let candidate = numeric_zone(&imap_to_rfc(strip_weekday(trimmed)));
    for fmt in DATE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// `"Thu, 04 Jan 2024 …"` → `"04 Jan 2024 …"`.
fn strip_weekday(s: &str) -> &str {
    const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    match s.split_once([',', ' ']) {
        Some((head, rest)) if WEEKDAYS.contains(&head) => rest.trim_start(),
        _ => s,
    }
}

/// IMAP style `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn imap_to_rfc(s: &str) -> String {
    let (date, rest) = s.split_once(' ').unwrap_or((s, ""));
    let parts: Vec<&str> = date.split('-').collect();
    match parts.as_slice() {
        [day, month, year]
            if month.len() == 3 && month.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            let mut month = month.to_ascii_lowercase();
            month[..1].make_ascii_uppercase();
            format!("{day} {month} {year} {rest}").trim_end().to_string()
        }
        _ => s.to_string(),
    }
}

/// Replace a trailing zone abbreviation (`EST`) with its offset (`-0500`).
fn numeric_zone(s: &str) -> String {
    for (name, offset) in NAMED_ZONES {
        if let Some(head) = s.strip_suffix(name) {
            return format!("{head}{offset}");
        }
    }
    s.to_string()
}
