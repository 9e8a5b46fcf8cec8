//! `mimesplit`: a streaming MIME multipart decoder.
//!
//! This crate splits a `multipart/*` byte stream into a root part and
//! content-id addressed attachment parts. Parsing is lazy: each query reads
//! only as far into the stream as it needs to answer.
//!
//! ```
//! use mimesplit::MimeMultipartParser;
//!
//! let body: &[u8] = b"--B\r\nContent-Id: <a>\r\n\r\nHELLO\r\n--B--";
//! let mut parser = MimeMultipartParser::new(body, "multipart/related; boundary=B").unwrap();
//! let root = parser.root_part().unwrap().unwrap();
//! assert_eq!(root.as_bytes(), b"HELLO");
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod parser;

pub use error::{MultipartError, Result};
pub use model::part::Part;
pub use parser::multipart::{MimeMultipartParser, ParseState};
