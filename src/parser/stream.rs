//! Buffered reader with a rewindable mark.
//!
//! The boundary scanner reads a pattern-sized window, then rewinds to where
//! the window started and skips forward by the computed shift. `MarkReader`
//! supplies that over any [`Read`]: bytes from the mark onward are retained
//! until the next mark, everything before it is dropped on refill.

use std::io::{self, BufRead, Read};

/// Default refill size (8 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// A [`BufRead`] adapter supporting `mark` / `reset` / `skip`.
///
/// Memory stays bounded as long as the caller re-marks regularly: only the
/// bytes read since the last mark plus one refill chunk are retained.
pub struct MarkReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    mark: Option<usize>,
    /// Stream offset of `buf[0]`.
    base: u64,
    chunk_size: usize,
}

impl<R: Read> MarkReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_CHUNK_SIZE, inner)
    }

    /// Create a reader that pulls `chunk_size` bytes per refill (minimum 1).
    pub fn with_capacity(chunk_size: usize, inner: R) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            inner,
            buf: Vec::with_capacity(chunk_size),
            pos: 0,
            mark: None,
            base: 0,
            chunk_size,
        }
    }

    /// Number of bytes consumed from the stream so far.
    pub fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Remember the current position. Replaces any previous mark.
    pub fn mark(&mut self) {
        self.mark = Some(self.pos);
    }

    /// Forget the mark so retained bytes can be released.
    pub fn clear_mark(&mut self) {
        self.mark = None;
    }

    /// Rewind to the last mark.
    pub fn reset(&mut self) -> io::Result<()> {
        match self.mark {
            Some(mark) => {
                self.pos = mark;
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "reset called without a mark",
            )),
        }
    }

    /// Advance up to `n` bytes. Returns the number skipped, short only at EOF.
    pub fn skip(&mut self, n: usize) -> io::Result<usize> {
        let mut left = n;
        while left > 0 {
            let available = self.fill_buf()?.len();
            if available == 0 {
                break;
            }
            let step = available.min(left);
            self.consume(step);
            left -= step;
        }
        Ok(n - left)
    }

    /// Read one byte, `None` at EOF.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.fill_buf()?.first().copied();
        if byte.is_some() {
            self.consume(1);
        }
        Ok(byte)
    }

    /// Fill `out` completely unless the stream ends first.
    ///
    /// Short reads from the inner reader are retried; the return value is
    /// less than `out.len()` only at EOF.
    pub fn read_full(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < out.len() {
            let n = self.read(&mut out[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    fn refill(&mut self) -> io::Result<()> {
        let keep_from = self.mark.unwrap_or(self.pos);
        if keep_from > 0 {
            self.buf.drain(..keep_from);
            self.base += keep_from as u64;
            self.pos -= keep_from;
            if let Some(mark) = self.mark.as_mut() {
                *mark = 0;
            }
        }

        let start = self.buf.len();
        self.buf.resize(start + self.chunk_size, 0);
        let read = loop {
            match self.inner.read(&mut self.buf[start..]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        match read {
            Ok(n) => {
                self.buf.truncate(start + n);
                Ok(())
            }
            Err(e) => {
                self.buf.truncate(start);
                Err(e)
            }
        }
    }
}

impl<R: Read> BufRead for MarkReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.refill()?;
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}

impl<R: Read> Read for MarkReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns at most one byte per `read` call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || out.is_empty() {
                return Ok(0);
            }
            out[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn test_read_full_retries_short_reads() {
        let mut reader = MarkReader::with_capacity(2, Trickle(b"abcdef"));
        let mut window = [0u8; 4];
        assert_eq!(reader.read_full(&mut window).unwrap(), 4);
        assert_eq!(&window, b"abcd");
        assert_eq!(reader.read_full(&mut window).unwrap(), 2);
        assert_eq!(&window[..2], b"ef");
        assert_eq!(reader.position(), 6);
    }

    #[test]
    fn test_reset_across_refills() {
        let mut reader = MarkReader::with_capacity(1, Trickle(b"0123456789"));
        reader.skip(3).unwrap();
        reader.mark();
        let mut window = [0u8; 5];
        reader.read_full(&mut window).unwrap();
        assert_eq!(&window, b"34567");
        reader.reset().unwrap();
        assert_eq!(reader.position(), 3);
        reader.skip(2).unwrap();
        assert_eq!(reader.read_byte().unwrap(), Some(b'5'));
    }

    #[test]
    fn test_reset_without_mark_fails() {
        let mut reader = MarkReader::new(&b"abc"[..]);
        assert!(reader.reset().is_err());
    }

    #[test]
    fn test_skip_stops_at_eof() {
        let mut reader = MarkReader::new(&b"abc"[..]);
        assert_eq!(reader.skip(10).unwrap(), 3);
        assert_eq!(reader.read_byte().unwrap(), None);
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_unmarked_bytes_are_released() {
        let data = vec![b'x'; 100];
        let mut reader = MarkReader::with_capacity(10, &data[..]);
        reader.skip(95).unwrap();
        assert!(reader.buf.len() <= 10);
        assert_eq!(reader.position(), 95);
    }

    #[test]
    fn test_read_until_line() {
        let mut reader = MarkReader::with_capacity(3, &b"a: b\r\nrest"[..]);
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).unwrap();
        assert_eq!(line, b"a: b\r\n");
        assert_eq!(reader.position(), 6);
    }
}
