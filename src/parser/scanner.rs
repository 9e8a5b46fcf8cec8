//! Dual-buffer boundary scanner.
//!
//! The scanner slides a pattern-sized window over the stream. After each
//! mismatch it rewinds to the window start and skips ahead by the
//! Boyer–Moore shift, so no byte is re-read beyond the mark window.
//!
//! Two windows are kept: `current` (being compared) and `previous` (the one
//! before it). When the window advances by `shift`, the first `shift` bytes
//! of `previous` are exactly the stream bytes that left the window. Those are
//! the bytes emitted to the sink, so a boundary that straddles two physical
//! reads is still seen whole in `current`.

use std::io::Read;

use tracing::trace;

use super::boundary::BoundaryPattern;
use super::stream::MarkReader;
use crate::error::{MultipartError, Result};

/// How a matched boundary line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// `--boundary` followed by CRLF: another part follows.
    Delimiter,
    /// `--boundary--`: no further parts.
    Close,
}

/// Result of one [`Scanner::find`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A boundary was matched and its line consumed.
    Found(BoundaryKind),
    /// The stream ended with fewer bytes left than the pattern length.
    PartialFinal,
    /// The stream ended exactly on a window edge.
    EndOfStream,
}

/// Accumulates the body bytes of one part.
///
/// The line terminator before a boundary belongs to the boundary, not the
/// body. It is only stripped once the boundary is actually matched, so a
/// CR or LF landing on a window seam is never dropped early.
#[derive(Debug)]
pub struct BodySink {
    data: Vec<u8>,
    limit: usize,
}

impl BodySink {
    pub fn new(capacity: usize, limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity.min(limit)),
            limit,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        // Allow room for a trailing CRLF that will be stripped later.
        if self.data.len() + bytes.len() > self.limit.saturating_add(2) {
            return Err(MultipartError::PartTooLarge { limit: self.limit });
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Strip the terminator preceding a boundary.
    ///
    /// An empty body is accepted as is; otherwise the body must end in LF
    /// or CRLF.
    fn terminate(&mut self, offset: u64) -> Result<()> {
        if self.data.is_empty() {
            return Ok(());
        }
        let strip = match self.data.as_slice() {
            [.., b'\r', b'\n'] => 2,
            [.., b'\n'] => 1,
            _ => return Err(MultipartError::MalformedBoundaryTermination { offset }),
        };
        self.data.truncate(self.data.len() - strip);
        self.check_limit()
    }

    pub(crate) fn check_limit(&self) -> Result<()> {
        if self.data.len() > self.limit {
            return Err(MultipartError::PartTooLarge { limit: self.limit });
        }
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// The `current` / `previous` window pair.
///
/// Both windows are exactly the pattern length and are swapped, never
/// reallocated, while scanning.
#[derive(Debug)]
pub struct Scanner {
    current: Vec<u8>,
    previous: Vec<u8>,
}

impl Scanner {
    pub fn new(pattern: &BoundaryPattern) -> Self {
        Self {
            current: vec![0; pattern.len()],
            previous: vec![0; pattern.len()],
        }
    }

    /// Scan forward to the next boundary.
    ///
    /// With a sink (body mode) every byte before the boundary is emitted and
    /// the terminator check applies. Without one (preamble mode) bytes are
    /// discarded.
    pub fn find<R: Read>(
        &mut self,
        reader: &mut MarkReader<R>,
        pattern: &BoundaryPattern,
        mut sink: Option<&mut BodySink>,
    ) -> Result<ScanOutcome> {
        let len = pattern.len();
        debug_assert_eq!(self.current.len(), len);

        // Bytes of `previous` that precede the start of `current`.
        let mut shift = 0usize;
        let mut first = true;

        let outcome = loop {
            reader.mark();
            if !first {
                std::mem::swap(&mut self.current, &mut self.previous);
            }
            let window_start = reader.position();
            let read = reader.read_full(&mut self.current)?;

            if read == 0 {
                emit(&mut sink, &self.previous[..shift])?;
                break ScanOutcome::EndOfStream;
            }
            if read < len {
                // A boundary cannot hide in fewer bytes than its own length.
                emit(&mut sink, &self.previous[..shift])?;
                emit(&mut sink, &self.current[..read])?;
                break ScanOutcome::PartialFinal;
            }

            match pattern.mismatch(&self.current) {
                None => {
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.write(&self.previous[..shift])?;
                        sink.terminate(window_start)?;
                    }
                    trace!(offset = window_start, "Boundary matched");
                    break ScanOutcome::Found(skip_transport_padding(reader)?);
                }
                Some(i) => {
                    emit(&mut sink, &self.previous[..shift])?;
                    shift = pattern.shift(i, self.current[i]);
                    reader.reset()?;
                    reader.skip(shift)?;
                    first = false;
                }
            }
        };

        reader.clear_mark();
        Ok(outcome)
    }
}

fn emit(sink: &mut Option<&mut BodySink>, bytes: &[u8]) -> Result<()> {
    match sink {
        Some(sink) => sink.write(bytes),
        None => Ok(()),
    }
}

/// Consume what follows a matched boundary up to and including its line end.
///
/// Accepts `CRLF`, a bare `LF`, optional `SP`/`HT` padding, and the `--`
/// closing marker. EOF is only acceptable after the closing marker.
fn skip_transport_padding<R: Read>(reader: &mut MarkReader<R>) -> Result<BoundaryKind> {
    let mut kind = BoundaryKind::Delimiter;
    let mut byte = reader.read_byte()?;

    if byte == Some(b'-') {
        if reader.read_byte()? != Some(b'-') {
            return Err(MultipartError::MalformedClosingDelimiter {
                offset: reader.position(),
            });
        }
        kind = BoundaryKind::Close;
        byte = reader.read_byte()?;
    }

    while matches!(byte, Some(b' ') | Some(b'\t')) {
        byte = reader.read_byte()?;
    }

    match byte {
        Some(b'\n') => Ok(kind),
        Some(b'\r') => match reader.read_byte()? {
            Some(b'\n') => Ok(kind),
            _ if kind == BoundaryKind::Close => Ok(kind),
            _ => Err(MultipartError::UnterminatedTransportPadding {
                offset: reader.position(),
            }),
        },
        // Whatever follows the closing delimiter is epilogue and is never read.
        _ if kind == BoundaryKind::Close => Ok(kind),
        _ => Err(MultipartError::UnterminatedTransportPadding {
            offset: reader.position(),
        }),
    }
}
