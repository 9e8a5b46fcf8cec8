//! Multipart `Content-Type` header (RFC 2045 §5.1, RFC 2387).

use std::collections::HashMap;

use crate::error::{MultipartError, Result};

/// A parsed `multipart/*` content type.
///
/// Parameter names are case-insensitive; values are unquoted.
#[derive(Debug, Clone)]
pub struct MultipartContentType {
    media_type: String,
    parameters: HashMap<String, String>,
}

impl MultipartContentType {
    /// Parse a header value such as
    /// `multipart/related; type="application/xop+xml"; boundary=uuid; start="<root>"`.
    ///
    /// Fails when the `boundary` parameter is missing or empty.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let (media_type, params) = match value.find(';') {
            Some(i) => (value[..i].trim(), &value[i + 1..]),
            None => (value, ""),
        };
        let parameters = parse_parameter_list(params);

        match parameters.get("boundary") {
            Some(boundary) if !boundary.is_empty() => {}
            _ => return Err(MultipartError::MissingBoundaryParameter(value.to_string())),
        }

        Ok(Self {
            media_type: media_type.to_ascii_lowercase(),
            parameters,
        })
    }

    /// Lowercased `type/subtype`, e.g. `multipart/related`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    /// The boundary token. Never empty.
    pub fn boundary(&self) -> &str {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Content-ID of the root part, if the `start` parameter is present.
    pub fn start(&self) -> Option<&str> {
        self.parameter("start")
    }

    /// Media type of the root part (`type` parameter of multipart/related).
    pub fn root_type(&self) -> Option<&str> {
        self.parameter("type")
    }

    pub fn start_info(&self) -> Option<&str> {
        self.parameter("start-info")
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Parse a semicolon-separated parameter list (`name=value; name="value"`).
///
/// Malformed entries are skipped. Later duplicates replace earlier ones.
fn parse_parameter_list(params: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let bytes = params.as_bytes();
    let len = bytes.len();
    let mut pos = 0;

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }

        let Some(eq) = bytes[pos..].iter().position(|&b| b == b'=' || b == b';') else {
            break;
        };
        let eq = pos + eq;
        if bytes[eq] == b';' {
            // Bare attribute without a value.
            pos = eq + 1;
            continue;
        }
        let name = params[pos..eq].trim().to_ascii_lowercase();
        pos = eq + 1;
        while pos < len && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
            pos += 1;
        }

        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = Vec::new();
            while pos < len {
                match bytes[pos] {
                    b'\\' if pos + 1 < len => {
                        v.push(bytes[pos + 1]);
                        pos += 2;
                    }
                    b'"' => {
                        pos += 1;
                        break;
                    }
                    c => {
                        v.push(c);
                        pos += 1;
                    }
                }
            }
            // Skip anything between the closing quote and the next separator.
            while pos < len && bytes[pos] != b';' {
                pos += 1;
            }
            String::from_utf8_lossy(&v).into_owned()
        } else {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b';')
                .map(|i| pos + i)
                .unwrap_or(len);
            let v = params[pos..end].trim().to_string();
            pos = end;
            v
        };

        if !name.is_empty() {
            parameters.insert(name, value);
        }
    }

    parameters
}
