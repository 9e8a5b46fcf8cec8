//! Multipart decoding: boundary matching, buffered scanning, header blocks, and the lazy parser.

pub mod boundary;
pub mod content_type;
pub mod header;
pub mod multipart;
pub mod scanner;
pub mod stream;
