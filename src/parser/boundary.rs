//! Boundary delimiter pattern with precomputed Boyer–Moore shift tables.
//!
//! A [`BoundaryPattern`] is built once per parser from the boundary token and
//! never changes afterwards. Both shift tables are derived from the same
//! bytes in the constructor, so they can never disagree with the pattern.

/// The `--boundary` delimiter and its shift tables.
#[derive(Debug, Clone)]
pub struct BoundaryPattern {
    bytes: Vec<u8>,
    /// Index of each byte's last occurrence in the pattern, plus one (0 if absent).
    bad_character: [usize; 256],
    good_suffix: Vec<usize>,
}

impl BoundaryPattern {
    /// Build the delimiter `"--" + token`.
    ///
    /// The token is matched as literal bytes.
    pub fn new(token: &str) -> Self {
        let mut bytes = Vec::with_capacity(token.len() + 2);
        bytes.extend_from_slice(b"--");
        bytes.extend_from_slice(token.as_bytes());
        Self::from_delimiter(bytes)
    }

    /// Build the tables for an already complete, non-empty delimiter.
    pub(crate) fn from_delimiter(bytes: Vec<u8>) -> Self {
        assert!(!bytes.is_empty(), "boundary delimiter must not be empty");
        let bad_character = bad_character_table(&bytes);
        let good_suffix = good_suffix_table(&bytes);
        Self {
            bytes,
            bad_character,
            good_suffix,
        }
    }

    /// The delimiter bytes, including the leading `--`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Delimiter length in bytes. Never zero.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Last-occurrence index plus one for `byte`, or 0 if it is not in the pattern.
    pub fn bad_character_shift(&self, byte: u8) -> usize {
        self.bad_character[byte as usize]
    }

    /// Good-suffix shift for a mismatch at `position`.
    pub fn good_suffix_shift(&self, position: usize) -> usize {
        self.good_suffix[position]
    }

    /// Compare `window` against the pattern right to left.
    ///
    /// Returns `None` on a full match, otherwise the rightmost mismatching
    /// index. `window` must be exactly [`len`](Self::len) bytes.
    #[inline]
    pub fn mismatch(&self, window: &[u8]) -> Option<usize> {
        debug_assert_eq!(window.len(), self.bytes.len());
        (0..self.bytes.len())
            .rev()
            .find(|&i| window[i] != self.bytes[i])
    }

    /// How far the window may advance after a mismatch at `position` on `byte`.
    ///
    /// Always at least 1 and at most the pattern length.
    #[inline]
    pub fn shift(&self, position: usize, byte: u8) -> usize {
        let bad = (position + 1).saturating_sub(self.bad_character_shift(byte));
        bad.max(self.good_suffix[position])
    }

    /// Offset of the first occurrence of the pattern in `haystack`.
    #[cfg(test)]
    pub(crate) fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        let len = self.bytes.len();
        let mut at = 0;
        while at + len <= haystack.len() {
            let window = &haystack[at..at + len];
            match self.mismatch(window) {
                None => return Some(at),
                Some(i) => at += self.shift(i, window[i]),
            }
        }
        None
    }
}

fn bad_character_table(pattern: &[u8]) -> [usize; 256] {
    let mut table = [0usize; 256];
    for (i, &b) in pattern.iter().enumerate() {
        table[b as usize] = i + 1;
    }
    table
}

/// Single backward pass over candidate shifts, largest first, so the
/// smallest shift consistent with a matched suffix ends up in each slot.
fn good_suffix_table(pattern: &[u8]) -> Vec<usize> {
    let len = pattern.len();
    let mut table = vec![0usize; len];

    'next: for shift in (1..=len).rev() {
        // `j` walks the suffix being compared against the shifted pattern.
        let mut j = len - 1;
        while j >= shift {
            if pattern[j] == pattern[j - shift] {
                table[j - 1] = shift;
                j -= 1;
            } else {
                continue 'next;
            }
        }
        // The suffix is also a prefix: every earlier position may take this shift.
        while j > 0 {
            j -= 1;
            table[j] = shift;
        }
    }
    table[len - 1] = 1;
    table
}
