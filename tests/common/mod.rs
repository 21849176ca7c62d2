//! Shared message fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// `hello world`
pub const HELLO_B64: &str = "aGVsbG8gd29ybGQ=";
/// `[0x00, 0x01, 0x02, 0xFF]`
pub const BINARY_B64: &str = "AAEC/w==";
pub const BINARY_BYTES: [u8; 4] = [0x00, 0x01, 0x02, 0xFF];

/// Build a multipart message. Each attachment is `(filename, base64 body)`;
/// an empty filename produces a part without any name.
pub fn message(to: &str, subject: Option<&str>, attachments: &[(&str, &str)]) -> String {
    let mut out = String::new();
    out.push_str("From: Sender <sender@example.com>\r\n");
    out.push_str(&format!("To: {to}\r\n"));
    if let Some(subject) = subject {
        out.push_str(&format!("Subject: {subject}\r\n"));
    }
    out.push_str("Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n");
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str("Content-Type: multipart/mixed; boundary=\"BOUNDARY\"\r\n\r\n");
    out.push_str("--BOUNDARY\r\nContent-Type: text/plain\r\n\r\nSee attached.\r\n");

    for (name, body) in attachments {
        out.push_str("--BOUNDARY\r\n");
        if name.is_empty() {
            out.push_str("Content-Type: application/octet-stream\r\n");
            out.push_str("Content-Disposition: attachment\r\n");
        } else {
            out.push_str(&format!(
                "Content-Type: application/octet-stream; name=\"{name}\"\r\n"
            ));
            out.push_str(&format!(
                "Content-Disposition: attachment; filename=\"{name}\"\r\n"
            ));
        }
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(body);
        out.push_str("\r\n");
    }
    out.push_str("--BOUNDARY--\r\n");
    out
}

/// A valid message with a text body only.
pub fn plain_message() -> String {
    "From: sender@example.com\r\nTo: bob@x.com\r\nSubject: Just text\r\n\r\nNo files.\r\n"
        .to_string()
}

/// Bytes no parser would accept as a message.
pub const GARBAGE: &[u8] = b"\x00\x01\x02 this is not an email at all";

/// Sorted entries (files and directories) directly inside `dir`.
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut list: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    list.sort();
    list
}

/// File name of a path as an owned string.
pub fn name_of(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
