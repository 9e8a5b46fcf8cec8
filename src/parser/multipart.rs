//! Lazy multipart parser: root part and content-id addressed attachments.
//!
//! Parts are extracted one at a time and only when a query needs them.
//! A query that can be answered from what has already been parsed performs
//! no I/O.

use std::collections::HashMap;
use std::io::Read;

use tracing::{debug, warn};

use super::boundary::BoundaryPattern;
use super::content_type::MultipartContentType;
use super::header;
use super::scanner::{BodySink, BoundaryKind, ScanOutcome, Scanner};
use super::stream::MarkReader;
use crate::config::Config;
use crate::error::{MultipartError, Result};
use crate::model::part::Part;

/// Progress of a parser through its stream.
///
/// Only ever moves forward: `Fresh → Scanning → LastBoundarySeen | EndOfStream`,
/// or to `Failed` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Nothing has been read yet.
    Fresh,
    /// The preamble is skipped and more parts may follow.
    Scanning,
    /// The closing `--boundary--` was consumed.
    LastBoundarySeen,
    /// The stream ended without a closing boundary (lenient mode only).
    EndOfStream,
    /// A query failed; the stream position is no longer meaningful.
    Failed,
}

impl ParseState {
    /// No further parts can be extracted.
    pub fn is_done(self) -> bool {
        matches!(self, Self::LastBoundarySeen | Self::EndOfStream)
    }
}

/// Streaming parser for a single `multipart/*` body.
///
/// The root part is the one whose `Content-ID` matches the `start`
/// parameter, or the first part when there is no `start`. Every other part
/// with a `Content-ID` is an attachment. Parts without a `Content-ID` that
/// are not the root are consumed but cannot be looked up.
///
/// Pass `&mut reader` to keep ownership of the stream.
pub struct MimeMultipartParser<R> {
    reader: MarkReader<R>,
    pattern: BoundaryPattern,
    scanner: Scanner,
    content_type: MultipartContentType,
    config: Config,
    state: ParseState,
    parts_parsed: usize,
    root: Option<Part>,
    attachments: HashMap<String, Part>,
}

impl<R: Read> MimeMultipartParser<R> {
    /// Create a parser with the default configuration.
    ///
    /// Fails with [`MultipartError::MissingBoundaryParameter`] if the content
    /// type has no boundary. Nothing is read from `reader` here.
    pub fn new(reader: R, content_type: &str) -> Result<Self> {
        Self::with_config(reader, content_type, &Config::default())
    }

    pub fn with_config(reader: R, content_type: &str, config: &Config) -> Result<Self> {
        let content_type = MultipartContentType::parse(content_type)?;
        let pattern = BoundaryPattern::new(content_type.boundary());

        let mut chunk_size = config.buffer.read_buffer_size;
        if chunk_size < pattern.len() {
            warn!(
                configured = chunk_size,
                delimiter_len = pattern.len(),
                "read_buffer_size smaller than boundary delimiter, raising it"
            );
            chunk_size = pattern.len();
        }

        Ok(Self {
            reader: MarkReader::with_capacity(chunk_size, reader),
            scanner: Scanner::new(&pattern),
            pattern,
            content_type,
            config: config.clone(),
            state: ParseState::Fresh,
            parts_parsed: 0,
            root: None,
            attachments: HashMap::new(),
        })
    }

    /// The root part, parsing only as far as needed to find it.
    ///
    /// Returns `None` if the stream is exhausted without a root (a `start`
    /// parameter naming no part, or an empty multipart).
    pub fn root_part(&mut self) -> Result<Option<&Part>> {
        while self.root.is_none() && self.can_advance()? {
            self.advance()?;
        }
        Ok(self.root.as_ref())
    }

    /// All attachment parts keyed by content-id. Consumes the rest of the stream.
    pub fn attachment_parts(&mut self) -> Result<&HashMap<String, Part>> {
        while self.can_advance()? {
            self.advance()?;
        }
        Ok(&self.attachments)
    }

    /// The attachment with the given content-id, parsing until it appears.
    ///
    /// `None` means the whole stream was consumed without a match. The root
    /// part is never returned here, even if its content-id matches.
    pub fn attachment_part(&mut self, content_id: &str) -> Result<Option<&Part>> {
        while !self.attachments.contains_key(content_id) && self.can_advance()? {
            self.advance()?;
        }
        Ok(self.attachments.get(content_id))
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Whether every part has been extracted.
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Number of parts extracted so far, including unreachable ones.
    pub fn parts_parsed(&self) -> usize {
        self.parts_parsed
    }

    /// Bytes consumed from the input stream so far.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    pub fn boundary(&self) -> &str {
        self.content_type.boundary()
    }

    /// The `start` parameter naming the root part's content-id.
    pub fn start(&self) -> Option<&str> {
        self.content_type.start()
    }

    pub fn content_type(&self) -> &MultipartContentType {
        &self.content_type
    }

    fn can_advance(&self) -> Result<bool> {
        match self.state {
            ParseState::Fresh | ParseState::Scanning => Ok(true),
            ParseState::LastBoundarySeen | ParseState::EndOfStream => Ok(false),
            ParseState::Failed => Err(MultipartError::Failed),
        }
    }

    fn advance(&mut self) -> Result<()> {
        let result = self.extract_next();
        if let Err(ref e) = result {
            debug!(error = %e, offset = self.reader.position(), "Multipart parse failed");
            self.state = ParseState::Failed;
        }
        result
    }

    /// Extract one part and file it as root or attachment.
    fn extract_next(&mut self) -> Result<()> {
        if self.state == ParseState::Fresh {
            self.skip_preamble()?;
            self.state = ParseState::Scanning;
        }

        let headers =
            header::read_header_block(&mut self.reader, self.config.limits.max_header_size)?;
        let offset = self.reader.position();
        let mut sink = BodySink::new(
            self.config.buffer.initial_part_capacity,
            self.config.limits.max_part_size,
        );

        let next_state = match self
            .scanner
            .find(&mut self.reader, &self.pattern, Some(&mut sink))?
        {
            ScanOutcome::Found(BoundaryKind::Delimiter) => ParseState::Scanning,
            ScanOutcome::Found(BoundaryKind::Close) => ParseState::LastBoundarySeen,
            ScanOutcome::PartialFinal | ScanOutcome::EndOfStream => {
                if !self.config.parser.allow_unterminated_final_part {
                    return Err(MultipartError::MissingBoundaryDelimiter {
                        offset: self.reader.position(),
                    });
                }
                sink.check_limit()?;
                warn!(offset, "Final part ends at EOF without a closing boundary");
                ParseState::EndOfStream
            }
        };

        let part = Part::new(sink.into_bytes(), headers, offset);
        debug!(
            offset,
            length = part.len(),
            content_type = part.content_type(),
            content_id = part.content_id().unwrap_or("-"),
            "Extracted MIME part"
        );
        self.classify(part);
        self.state = next_state;
        Ok(())
    }

    fn skip_preamble(&mut self) -> Result<()> {
        match self.scanner.find(&mut self.reader, &self.pattern, None)? {
            ScanOutcome::Found(BoundaryKind::Delimiter) => {
                debug!(offset = self.reader.position(), "Skipped multipart preamble");
                Ok(())
            }
            ScanOutcome::Found(BoundaryKind::Close) => {
                Err(MultipartError::ClosingBoundaryInPreamble {
                    offset: self.reader.position(),
                })
            }
            ScanOutcome::PartialFinal | ScanOutcome::EndOfStream => {
                Err(MultipartError::MissingStartBoundary)
            }
        }
    }

    fn classify(&mut self, part: Part) {
        let is_first = self.parts_parsed == 0;
        self.parts_parsed += 1;

        if self.root.is_none() {
            let is_root = match self.content_type.start() {
                Some(start) => part.content_id() == Some(start),
                None => is_first,
            };
            if is_root {
                self.root = Some(part);
                return;
            }
        }

        match part.content_id().map(str::to_string) {
            Some(id) => {
                if self.attachments.contains_key(&id) {
                    warn!(content_id = %id, "Duplicate Content-ID, keeping the later part");
                }
                self.attachments.insert(id, part);
            }
            None => {
                warn!(
                    offset = part.offset(),
                    "Part without Content-ID is not the root and cannot be looked up"
                );
            }
        }
    }
}

impl<R> std::fmt::Debug for MimeMultipartParser<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MimeMultipartParser")
            .field("boundary", &self.content_type.boundary())
            .field("state", &self.state)
            .field("parts_parsed", &self.parts_parsed)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CT: &str = "multipart/related; boundary=B; start=\"<root>\"";

    #[test]
    fn test_state_transitions() {
        let body: &[u8] = b"--B\r\nContent-Id: <root>\r\n\r\nR\r\n--B\r\nContent-Id: <a>\r\n\r\nA\r\n--B--";
        let mut parser = MimeMultipartParser::new(body, CT).unwrap();
        assert_eq!(parser.state(), ParseState::Fresh);

        parser.root_part().unwrap();
        assert_eq!(parser.state(), ParseState::Scanning);
        assert_eq!(parser.parts_parsed(), 1);

        parser.attachment_parts().unwrap();
        assert_eq!(parser.state(), ParseState::LastBoundarySeen);
        assert!(parser.is_done());
        assert_eq!(parser.parts_parsed(), 2);
    }

    #[test]
    fn test_construction_reads_nothing() {
        let body: &[u8] = b"--B\r\n\r\nx\r\n--B--";
        let parser = MimeMultipartParser::new(body, CT).unwrap();
        assert_eq!(parser.position(), 0);
        assert_eq!(parser.boundary(), "B");
        assert_eq!(parser.start(), Some("<root>"));
    }

    #[test]
    fn test_failed_state_is_sticky() {
        let body: &[u8] = b"--B\r\nContent-Id: <a>\r\n\r\nunterminated";
        let mut parser = MimeMultipartParser::new(body, "multipart/mixed; boundary=B").unwrap();
        assert!(matches!(
            parser.root_part(),
            Err(MultipartError::MissingBoundaryDelimiter { .. })
        ));
        assert_eq!(parser.state(), ParseState::Failed);
        assert!(matches!(parser.attachment_parts(), Err(MultipartError::Failed)));
        assert!(matches!(parser.attachment_part("<a>"), Err(MultipartError::Failed)));
    }

    #[test]
    fn test_lenient_eof() {
        let mut config = Config::default();
        config.parser.allow_unterminated_final_part = true;
        let body: &[u8] = b"--B\r\nContent-Id: <a>\r\n\r\nfirst\r\n--B\r\nContent-Id: <b>\r\n\r\ntail\r\n";
        let mut parser =
            MimeMultipartParser::with_config(body, "multipart/mixed; boundary=B", &config).unwrap();
        assert_eq!(parser.root_part().unwrap().unwrap().as_bytes(), b"first");
        let tail = parser.attachment_part("<b>").unwrap().unwrap();
        assert_eq!(tail.as_bytes(), b"tail\r\n");
        assert_eq!(parser.state(), ParseState::EndOfStream);
    }

    #[test]
    fn test_small_read_buffer_is_raised() {
        let mut config = Config::default();
        config.buffer.read_buffer_size = 1;
        let body: &[u8] = b"--boundary\r\n\r\nbody\r\n--boundary--";
        let mut parser =
            MimeMultipartParser::with_config(body, "multipart/mixed; boundary=boundary", &config)
                .unwrap();
        assert_eq!(parser.root_part().unwrap().unwrap().as_bytes(), b"body");
    }

    #[test]
    fn test_unbounded_limits() {
        let mut config = Config::default();
        config.limits.max_header_size = usize::MAX;
        config.limits.max_part_size = usize::MAX;
        let body: &[u8] = b"--B\r\nContent-Id: <a>\r\n\r\nfirst\r\n--B\r\nContent-Id: <b>\r\n\r\nsecond\r\n--B--";
        let mut parser =
            MimeMultipartParser::with_config(body, "multipart/mixed; boundary=B", &config).unwrap();
        let root = parser.root_part().unwrap().unwrap();
        assert_eq!(root.content_id(), Some("<a>"));
        assert_eq!(root.as_bytes(), b"first");
        let second = parser.attachment_part("<b>").unwrap().unwrap();
        assert_eq!(second.as_bytes(), b"second");
    }

    #[test]
    fn test_root_matched_by_start_not_position() {
        let body: &[u8] =
            b"--B\r\nContent-Id: <a>\r\n\r\nA\r\n--B\r\nContent-Id: <root>\r\n\r\nR\r\n--B--";
        let mut parser = MimeMultipartParser::new(body, CT).unwrap();
        assert_eq!(parser.root_part().unwrap().unwrap().as_bytes(), b"R");
        assert_eq!(parser.parts_parsed(), 2);
        assert_eq!(parser.attachment_part("<a>").unwrap().unwrap().as_bytes(), b"A");
        assert!(parser.attachment_part("<root>").unwrap().is_none());
    }
}
