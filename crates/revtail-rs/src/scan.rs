use memchr::memmem;

use crate::error::TailError;
use crate::session::FileSession;

/// Chunked substring search with boundary-safe overlap.
///
/// Used for lines too large to hold in memory: the range is read forward in
/// fixed-size chunks and each chunk is searched prefixed by the last
/// `term.len() - 1` bytes of the previous one, the minimum carry that can be
/// the unterminated prefix of a match. Memory is bounded by
/// `chunk size + term.len()`.
pub struct OverlapScanner {
    term: Vec<u8>,
    overlap: Vec<u8>,
    keep: usize,
}

impl OverlapScanner {
    /// `term` must be non-empty; callers validate that before building one.
    pub fn new(term: &[u8]) -> Self {
        Self {
            term: term.to_vec(),
            overlap: Vec::new(),
            keep: term.len().saturating_sub(1),
        }
    }

    /// Search `overlap ++ chunk` for the term, retaining the new overlap tail.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        let mut hay = Vec::with_capacity(self.overlap.len() + chunk.len());
        hay.extend_from_slice(&self.overlap);
        hay.extend_from_slice(chunk);
        if memmem::find(&hay, &self.term).is_some() {
            return true;
        }
        let start = hay.len().saturating_sub(self.keep);
        self.overlap.clear();
        self.overlap.extend_from_slice(&hay[start..]);
        false
    }

    /// Scan the absolute byte range `[start, end)` of `session`, stopping at
    /// the first match.
    pub fn scan_range(
        &mut self,
        session: &mut FileSession,
        start: u64,
        end: u64,
        block_size: usize,
    ) -> Result<bool, TailError> {
        let mut buf = vec![0u8; block_size.max(1)];
        let mut pos = start;
        while pos < end {
            let n = (end - pos).min(buf.len() as u64) as usize;
            session.read_at(pos, &mut buf[..n])?;
            if self.feed(&buf[..n]) {
                return Ok(true);
            }
            pos += n as u64;
        }
        Ok(false)
    }
}
