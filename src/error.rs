//! Centralized error types for mimesplit.

use thiserror::Error;

/// All errors produced while decoding a multipart stream.
///
/// Every variant is terminal for the parse attempt that raised it: the
/// parser moves to a failed state and never hands out a partially built part.
#[derive(Error, Debug)]
pub enum MultipartError {
    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The content-type header carries no (or an empty) `boundary` parameter.
    #[error("MIME boundary parameter not found in content type: {0}")]
    MissingBoundaryParameter(String),

    /// No boundary was found before the end of the stream while skipping the preamble.
    #[error("Missing start boundary")]
    MissingStartBoundary,

    /// The first boundary in the stream is the closing delimiter.
    #[error("Found closing boundary delimiter at offset {offset} while skipping preamble")]
    ClosingBoundaryInPreamble { offset: u64 },

    /// A boundary inside a part body is not preceded by CRLF or LF.
    #[error("Boundary at offset {offset} is not preceded by a line terminator")]
    MalformedBoundaryTermination { offset: u64 },

    /// The stream ended before the boundary closing the current part.
    #[error("End of stream at offset {offset} before the part's boundary delimiter")]
    MissingBoundaryDelimiter { offset: u64 },

    /// Transport padding after a boundary does not end in CRLF.
    #[error("Transport padding after boundary at offset {offset} does not end in CRLF")]
    UnterminatedTransportPadding { offset: u64 },

    /// A single `-` follows a boundary where `--` was expected.
    #[error("Unexpected single '-' after boundary at offset {offset}")]
    MalformedClosingDelimiter { offset: u64 },

    /// A part's header block exceeds the configured limit.
    #[error("Part header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    /// A part body exceeds the configured limit.
    #[error("Part body exceeds {limit} bytes")]
    PartTooLarge { limit: usize },

    /// An earlier query already failed; the stream position is unknown.
    #[error("Parser is unusable after an earlier error")]
    Failed,
}

/// Convenience alias for `Result<T, MultipartError>`.
pub type Result<T> = std::result::Result<T, MultipartError>;
