//! Attachment extraction from individual `.eml` files (RFC 5322 messages
//! without MBOX framing).

use std::path::Path;

use chrono::{DateTime, Utc};
use mail_parser::decoders::base64::base64_decode;
use mail_parser::decoders::quoted_printable::quoted_printable_decode;
use mail_parser::{Encoding, MessagePart, MessageParser, MimeHeaders, PartType};

use crate::error::{ExtractError, Result};
use crate::model::address::extract_addresses;
use crate::model::attachment::Attachment;
use crate::model::message::{ExtractedMessage, MessageMeta, SENTINEL_DATE};
use crate::parser::header;

/// Read a single `.eml` file and extract its attachments and metadata.
///
/// Only reads the file; nothing is written.
pub fn extract(path: impl AsRef<Path>) -> Result<ExtractedMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ExtractError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    extract_bytes(path, &data)
}

/// Extract attachments and metadata from raw message bytes.
///
/// `path` is only used to label the result and any error.
pub fn extract_bytes(path: &Path, raw: &[u8]) -> Result<ExtractedMessage> {
    let message_bytes = header::skip_envelope_line(raw);

    if !header::starts_with_header_field(message_bytes) {
        return Err(parse_failed(path, "no RFC 5322 header at start of file"));
    }

    let msg = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| parse_failed(path, "malformed MIME structure"))?;

    let attachments: Vec<Attachment> = msg
        .attachments()
        .map(|part| {
            Attachment::new(
                part.attachment_name().unwrap_or_default(),
                attachment_data(message_bytes, part),
            )
        })
        .collect();

    if attachments.is_empty() {
        return Err(ExtractError::NoAttachments {
            path: path.to_path_buf(),
        });
    }

    let raw_headers =
        header::unfold_headers(&header::decode_header_bytes(header::header_block(message_bytes)));

    let recipients = header::joined_header(&raw_headers, "to")
        .map(|to| extract_addresses(&to))
        .unwrap_or_default();

    let subject = msg
        .subject()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(placeholder_subject);

    let date = msg
        .date()
        .and_then(|d| DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| {
            header::joined_header(&raw_headers, "date").and_then(|d| header::parse_date(&d))
        })
        .unwrap_or(SENTINEL_DATE);

    tracing::debug!(
        path = %path.display(),
        attachments = attachments.len(),
        recipients = recipients.len(),
        "Extracted message"
    );

    Ok(ExtractedMessage {
        source: path.to_path_buf(),
        attachments,
        meta: MessageMeta {
            recipients,
            subject,
            date,
        },
    })
}

/// Attachment bytes with only the transfer encoding undone.
///
/// mail-parser converts `text/*` parts to UTF-8, so those are decoded again
/// from the raw body to keep their original charset.
fn attachment_data(raw: &[u8], part: &MessagePart<'_>) -> Vec<u8> {
    if !matches!(part.body, PartType::Text(_) | PartType::Html(_)) {
        return part.contents().to_vec();
    }
    let Some(body) = raw.get(part.raw_body_offset()..part.raw_end_offset()) else {
        return part.contents().to_vec();
    };

    let decoded = match part.encoding {
        Encoding::Base64 => base64_decode(body),
        Encoding::QuotedPrintable => quoted_printable_decode(body),
        Encoding::None => Some(body.to_vec()),
    };
    decoded.unwrap_or_else(|| part.contents().to_vec())
}

/// Unique stand-in for a missing subject, so unrelated messages never
/// share an empty-subject folder.
fn placeholder_subject() -> String {
    format!("no-subject-{}", uuid::Uuid::new_v4().simple())
}

fn parse_failed(path: &Path, reason: &str) -> ExtractError {
    ExtractError::ParseFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ATTACHMENTS: &str = "From: Sender <sender@example.com>\r
To: Bob <Bob@X.com>, alice@x.com\r
Subject: Quarterly report\r
Date: Thu, 04 Jan 2024 10:00:00 +0000\r
MIME-Version: 1.0\r
Content-Type: multipart/mixed; boundary=\"XYZ\"\r
\r
--XYZ\r
Content-Type: text/plain\r
\r
See attached.\r
--XYZ\r
Content-Type: text/plain; name=\"notes.txt\"\r
Content-Disposition: attachment; filename=\"notes.txt\"\r
Content-Transfer-Encoding: base64\r
\r
aGVsbG8gd29ybGQ=\r
--XYZ\r
Content-Type: application/octet-stream\r
Content-Disposition: attachment\r
Content-Transfer-Encoding: base64\r
\r
AAEC/w==\r
--XYZ--\r
";

    const PLAIN: &str = "From: sender@example.com\r
To: bob@x.com\r
Subject: Just text\r
\r
Nothing attached here.\r
";

    #[test]
    fn test_extract_attachments_and_meta() {
        let msg = extract_bytes(Path::new("a.eml"), TWO_ATTACHMENTS.as_bytes()).unwrap();
        assert_eq!(msg.attachments.len(), 2);
        assert_eq!(msg.attachments[0].name, "notes.txt");
        assert_eq!(msg.attachments[0].data, b"hello world");
        assert!(msg.attachments[1].is_unnamed());
        assert_eq!(msg.attachments[1].data, vec![0x00, 0x01, 0x02, 0xFF]);

        assert_eq!(msg.meta.recipients, vec!["alice@x.com", "bob@x.com"]);
        assert_eq!(msg.meta.subject, "Quarterly report");
        assert_eq!(
            msg.meta.date.format("%Y%m%d%H%M%S").to_string(),
            "20240104100000"
        );
        assert_eq!(msg.attachment_bytes(), 15);
    }

    #[test]
    fn test_no_attachments() {
        let err = extract_bytes(Path::new("plain.eml"), PLAIN.as_bytes()).unwrap_err();
        assert!(matches!(err, ExtractError::NoAttachments { .. }));
        assert!(err.to_string().contains("plain.eml"));
    }

    #[test]
    fn test_parse_failed_on_garbage() {
        let err = extract_bytes(Path::new("b.eml"), b"\x00\x01 definitely not mail").unwrap_err();
        assert!(matches!(err, ExtractError::ParseFailed { .. }));

        let err = extract_bytes(Path::new("empty.eml"), b"").unwrap_err();
        assert!(matches!(err, ExtractError::ParseFailed { .. }));
    }

    #[test]
    fn test_missing_subject_and_date() {
        let raw = TWO_ATTACHMENTS
            .replace("Subject: Quarterly report\r\n", "")
            .replace("Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n", "");
        let first = extract_bytes(Path::new("a.eml"), raw.as_bytes()).unwrap();
        let second = extract_bytes(Path::new("a.eml"), raw.as_bytes()).unwrap();

        assert!(first.meta.subject.starts_with("no-subject-"));
        assert_ne!(first.meta.subject, second.meta.subject);
        assert!(first.meta.has_sentinel_date());
    }

    #[test]
    fn test_mbox_separator_is_skipped() {
        let raw = format!("From sender@example.com Thu Jan 04 10:00:00 2024\n{TWO_ATTACHMENTS}");
        let msg = extract_bytes(Path::new("a.eml"), raw.as_bytes()).unwrap();
        assert_eq!(msg.attachments.len(), 2);
    }

    fn single_text_attachment(headers: &str, body: &str) -> String {
        format!(
            "From: a@x.com\r\nTo: b@x.com\r\nSubject: text\r\nMIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\r\n\
             --XYZ\r\nContent-Type: text/plain\r\n\r\nbody\r\n\
             --XYZ\r\n{headers}\
             Content-Disposition: attachment; filename=\"data.txt\"\r\n\r\n\
             {body}\r\n--XYZ--\r\n"
        )
    }

    #[test]
    fn test_text_attachment_keeps_latin1_bytes() {
        let raw = single_text_attachment(
            "Content-Type: text/plain; charset=iso-8859-1\r\nContent-Transfer-Encoding: base64\r\n",
            "Y2Fm6Q==",
        );
        let msg = extract_bytes(Path::new("a.eml"), raw.as_bytes()).unwrap();
        assert_eq!(msg.attachments[0].data, b"caf\xe9");
    }

    #[test]
    fn test_text_attachment_keeps_invalid_utf8() {
        let raw = single_text_attachment(
            "Content-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n",
            "//5B",
        );
        let msg = extract_bytes(Path::new("a.eml"), raw.as_bytes()).unwrap();
        assert_eq!(msg.attachments[0].data, vec![0xFF, 0xFE, 0x41]);
    }

    #[test]
    fn test_quoted_printable_text_attachment() {
        let raw = single_text_attachment(
            "Content-Type: text/csv; charset=windows-1252\r\nContent-Transfer-Encoding: quoted-printable\r\n",
            "id;name\r\n1;Jos=E9",
        );
        let msg = extract_bytes(Path::new("a.eml"), raw.as_bytes()).unwrap();
        assert_eq!(msg.attachments[0].data, b"id;name\r\n1;Jos\xe9");
    }

    #[test]
    fn test_open_failed() {
        let err = extract("/definitely/not/here.eml").unwrap_err();
        assert!(matches!(err, ExtractError::OpenFailed { .. }));
    }
}
