//! A decoded MIME body part.

use std::io::{self, Write};

/// Default content type for parts that declare none (RFC 2046 §5.1).
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One body part of a multipart stream.
///
/// The body bytes are owned by the part and exclude the line terminator
/// that precedes the next boundary. Transfer encodings are NOT undone; the
/// bytes are exactly what appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    data: Vec<u8>,
    content_type: String,
    content_id: Option<String>,
    headers: Vec<(String, String)>,
    offset: u64,
}

impl Part {
    pub(crate) fn new(data: Vec<u8>, headers: Vec<(String, String)>, offset: u64) -> Self {
        let content_type = first_header(&headers, "content-type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let content_id = first_header(&headers, "content-id").map(String::from);
        Self {
            data,
            content_type,
            content_id,
            headers,
            offset,
        }
    }

    /// Raw body bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the part and return its body.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Declared `Content-Type`, or `application/octet-stream` when absent.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Declared `Content-ID`, verbatim (angle brackets included).
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// First value of a header (name is case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        first_header(&self.headers, &name.to_ascii_lowercase())
    }

    /// All unfolded headers as `(lowercase_name, value)` pairs, in wire order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Byte offset of the first body byte within the input stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Copy the body into a writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.data)
    }
}

impl AsRef<[u8]> for Part {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

fn first_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}
