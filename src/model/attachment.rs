//! Attachment payloads.

/// A decoded attachment, exactly as it appeared in the message.
///
/// The bytes are already transfer-decoded (base64, quoted-printable) but
/// otherwise untouched: no charset conversion is ever applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename from `Content-Disposition` / `Content-Type`. May be empty.
    pub name: String,

    /// Decoded content.
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// `true` when the message gave no usable filename.
    pub fn is_unnamed(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Size of the decoded content in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
