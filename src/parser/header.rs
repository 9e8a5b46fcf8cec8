//! Part header block reading: line collection, charset fallback, and unfolding.
//!
//! Only the fields the decoder needs are interpreted (`content-type` and
//! `content-id`); every other header is kept verbatim for callers.

use std::io::{BufRead, Read};

use super::stream::MarkReader;
use crate::error::{MultipartError, Result};

/// Read a header block up to and including the blank line that ends it.
///
/// Returns the unfolded `(lowercase_name, value)` pairs. EOF ends the block
/// like a blank line would; the body scan then reports the missing boundary.
pub fn read_header_block<R: Read>(
    reader: &mut MarkReader<R>,
    limit: usize,
) -> Result<Vec<(String, String)>> {
    let mut raw: Vec<u8> = Vec::with_capacity(256);
    let mut line: Vec<u8> = Vec::with_capacity(128);

    loop {
        line.clear();
        // Leave room for the blank line that ends a block at the limit.
        let budget = u64::try_from((limit - raw.len()).saturating_add(2)).unwrap_or(u64::MAX);
        let n = reader.by_ref().take(budget).read_until(b'\n', &mut line)?;
        if n == 0 || is_blank_line(&line) {
            break;
        }
        raw.extend_from_slice(&line);
        if raw.len() > limit {
            return Err(MultipartError::HeaderTooLarge { limit });
        }
    }

    Ok(unfold_headers(&decode_header_bytes(&raw)))
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, trimmed_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// A header block ends at an empty line (`CRLF` or a bare `LF`).
fn is_blank_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}
