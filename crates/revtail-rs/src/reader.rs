use bytes::Bytes;
use memchr::{memchr, memrchr};

use crate::encoding::Utf8Guard;
use crate::error::TailError;
use crate::scan::OverlapScanner;
use crate::session::FileSession;
use crate::{DEFAULT_BLOCK_SIZE, DEFAULT_LEFTOVER_CEILING};

/// Knobs for one reverse read.
#[derive(Clone, Debug)]
pub struct TailOptions {
    /// Size of each backward block read.
    pub block_size: usize,
    /// Ceiling on the accumulated unterminated-line buffer before switching
    /// to the oversized-line resolution path.
    pub ceiling: usize,
    /// Maximum number of lines to emit; `None` means unbounded.
    pub entries: Option<u64>,
    /// Substring filter; only lines containing it are emitted.
    pub search: Option<String>,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            ceiling: DEFAULT_LEFTOVER_CEILING,
            entries: None,
            search: None,
        }
    }
}

enum State {
    /// Default backward block walk.
    Scanning,
    /// A single line outgrew the ceiling; stream it forward in chunks.
    Oversized(Oversized),
    /// Offset reached 0 or the entry cap was satisfied.
    Done,
}

struct Oversized {
    /// First byte of the line.
    start: u64,
    /// One past the last byte of the line (its terminator's position, or EOF).
    end: u64,
    /// Next byte to emit.
    pos: u64,
    guard: Utf8Guard,
}

/// Reads a file backward in fixed-size blocks and yields newline-terminated
/// lines most-recent-first, optionally capped and substring-filtered.
///
/// This is an explicit state machine driven by [`next_chunk`]: each call runs
/// scanning steps until a chunk of output is ready or the read completes.
/// Auxiliary memory is bounded by `block_size + ceiling` regardless of file
/// size or single-line length. Errors are terminal; after one, the reader
/// stays done.
///
/// [`next_chunk`]: ReverseTailReader::next_chunk
pub struct ReverseTailReader {
    session: FileSession,
    block_size: usize,
    ceiling: usize,
    search: Option<String>,
    /// Lines still allowed out; `None` is unbounded.
    remaining: Option<u64>,
    /// Unread region is `[0, offset)`.
    offset: u64,
    /// Unterminated tail fragment carried between blocks. Never contains a
    /// terminator once the first one has been seen.
    leftover: Vec<u8>,
    /// Scratch block buffer, allocated once and reused for every read.
    block: Vec<u8>,
    state: State,
}

impl ReverseTailReader {
    pub fn new(session: FileSession, opts: TailOptions) -> Self {
        let block_size = opts.block_size.max(1);
        let offset = session.len_at_open();
        let state = match opts.entries {
            Some(0) => State::Done,
            _ => State::Scanning,
        };
        Self {
            session,
            block_size,
            ceiling: opts.ceiling.max(1),
            search: opts.search,
            remaining: opts.entries,
            offset,
            leftover: Vec::new(),
            block: vec![0u8; block_size],
            state,
        }
    }

    /// Advance until the next chunk of output is ready.
    ///
    /// Returns `Ok(None)` once the read is complete. A chunk holds one or more
    /// whole lines (scanning path) or a validated slice of one oversized line;
    /// either way concatenating all chunks gives the terminator-suffixed,
    /// most-recent-first line sequence.
    pub fn next_chunk(&mut self) -> Result<Option<Bytes>, TailError> {
        loop {
            match self.state {
                State::Done => return Ok(None),
                State::Oversized(_) => {
                    if let Some(chunk) = self.oversized_step()? {
                        return Ok(Some(chunk));
                    }
                }
                State::Scanning => {
                    if self.offset == 0 {
                        if let Some(chunk) = self.finish()? {
                            return Ok(Some(chunk));
                        }
                        continue;
                    }
                    if let Some(chunk) = self.scan_step()? {
                        return Ok(Some(chunk));
                    }
                }
            }
        }
    }

    /// One backward block read: either grow the leftover or emit the block's
    /// completed lines.
    fn scan_step(&mut self) -> Result<Option<Bytes>, TailError> {
        let read_size = (self.block_size as u64).min(self.offset) as usize;
        self.offset -= read_size as u64;
        self.session
            .read_at(self.offset, &mut self.block[..read_size])?;

        let block = &self.block[..read_size];
        match memchr(b'\n', block) {
            None => {
                // No terminator: the whole block is part of the still-open line.
                let mut merged = Vec::with_capacity(read_size + self.leftover.len());
                merged.extend_from_slice(block);
                merged.append(&mut self.leftover);
                self.leftover = merged;
                if self.leftover.len() > self.ceiling {
                    self.begin_oversized()?;
                }
                Ok(None)
            }
            Some(p) => {
                // Everything after the first terminator, glued to the carried
                // leftover, is fully terminated line material. Everything
                // before it becomes the new leftover.
                let mut payload =
                    Vec::with_capacity(read_size - p - 1 + self.leftover.len());
                payload.extend_from_slice(&block[p + 1..]);
                payload.append(&mut self.leftover);
                self.leftover.extend_from_slice(&self.block[..p]);
                self.emit_lines(&payload)
            }
        }
    }

    /// Offset hit 0: whatever is left is the file's first physical line.
    fn finish(&mut self) -> Result<Option<Bytes>, TailError> {
        self.state = State::Done;
        if self.leftover.is_empty() {
            return Ok(None);
        }
        let payload = std::mem::take(&mut self.leftover);
        self.emit_lines(&payload)
    }

    /// Decode, split, reverse, filter and cap one payload of complete lines.
    fn emit_lines(&mut self, payload: &[u8]) -> Result<Option<Bytes>, TailError> {
        let text = std::str::from_utf8(payload).map_err(|e| {
            self.state = State::Done;
            TailError::InvalidUtf8(format!(
                "malformed byte sequence after {} valid bytes in line data",
                e.valid_up_to()
            ))
        })?;

        let mut kept: Vec<&str> = Vec::new();
        for line in text.split('\n').rev() {
            if line.is_empty() {
                // Split artifacts (and genuinely empty lines) carry no content.
                continue;
            }
            if let Some(term) = &self.search {
                if !line.contains(term.as_str()) {
                    continue;
                }
            }
            kept.push(line);
            if let Some(rem) = self.remaining {
                if kept.len() as u64 == rem {
                    break;
                }
            }
        }

        if kept.is_empty() {
            return Ok(None);
        }
        if let Some(rem) = &mut self.remaining {
            *rem -= kept.len() as u64;
            if *rem == 0 {
                self.state = State::Done;
            }
        }
        let mut out = kept.join("\n");
        out.push('\n');
        Ok(Some(Bytes::from(out)))
    }

    /// The leftover outgrew the ceiling: locate the full extent of the line it
    /// belongs to and set up forward streaming (or discard on search miss).
    fn begin_oversized(&mut self) -> Result<(), TailError> {
        let end = self.offset + self.leftover.len() as u64;
        self.leftover.clear();

        // Walk further backward until the previous terminator bounds the line.
        let mut scan_pos = self.offset;
        let mut start = 0u64;
        while scan_pos > 0 {
            let read_size = (self.block_size as u64).min(scan_pos) as usize;
            scan_pos -= read_size as u64;
            self.session
                .read_at(scan_pos, &mut self.block[..read_size])?;
            if let Some(p) = memrchr(b'\n', &self.block[..read_size]) {
                start = scan_pos + p as u64 + 1;
                break;
            }
        }

        if let Some(term) = self.search.clone() {
            let mut scanner = OverlapScanner::new(term.as_bytes());
            if !scanner.scan_range(&mut self.session, start, end, self.block_size)? {
                // No match: skip the whole line without touching the entry
                // budget. The byte at start-1 is the previous line's
                // terminator, already accounted for.
                self.offset = start.saturating_sub(1);
                self.state = State::Scanning;
                return Ok(());
            }
        }

        self.state = State::Oversized(Oversized {
            start,
            end,
            pos: start,
            guard: Utf8Guard::new(),
        });
        Ok(())
    }

    /// Emit the next validated slice of an oversized line, or its final
    /// terminator once the range is exhausted.
    fn oversized_step(&mut self) -> Result<Option<Bytes>, TailError> {
        // Errors below leave the state at Done, which is what we want: every
        // failure is terminal.
        let State::Oversized(mut big) = std::mem::replace(&mut self.state, State::Done)
        else {
            return Ok(None);
        };

        if big.pos >= big.end {
            big.guard.finish()?;
            self.offset = big.start.saturating_sub(1);
            if let Some(rem) = &mut self.remaining {
                // The whole oversized line counts as a single entry.
                *rem -= 1;
                if *rem == 0 {
                    return Ok(Some(Bytes::from_static(b"\n")));
                }
            }
            self.state = State::Scanning;
            return Ok(Some(Bytes::from_static(b"\n")));
        }

        let read_size = (big.end - big.pos).min(self.block_size as u64) as usize;
        self.session.read_at(big.pos, &mut self.block[..read_size])?;
        let text = big.guard.push(&self.block[..read_size])?;
        big.pos += read_size as u64;
        self.state = State::Oversized(big);
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Bytes::from(text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(content).unwrap();
        tmp
    }

    fn read_all(reader: &mut ReverseTailReader) -> String {
        let mut out = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            out.extend_from_slice(&chunk);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reverse_order_block_size_twelve() {
        let tmp = write_tmp(b"line4\nline3\nline2\nline1\n");
        let session = FileSession::open(tmp.path()).unwrap();
        let mut r = ReverseTailReader::new(
            session,
            TailOptions {
                block_size: 12,
                ..Default::default()
            },
        );
        assert_eq!(read_all(&mut r), "line1\nline2\nline3\nline4\n");
    }

    #[test]
    fn entry_cap_with_tiny_blocks() {
        let tmp = write_tmp(b"line4\nline3\nline2\nline1\n");
        let session = FileSession::open(tmp.path()).unwrap();
        let mut r = ReverseTailReader::new(
            session,
            TailOptions {
                block_size: 3,
                entries: Some(3),
                ..Default::default()
            },
        );
        assert_eq!(read_all(&mut r), "line1\nline2\nline3\n");
    }

    #[test]
    fn missing_trailing_terminator_is_synthesized() {
        let tmp = write_tmp(b"line3\nline2\nline1");
        let session = FileSession::open(tmp.path()).unwrap();
        let mut r = ReverseTailReader::new(session, TailOptions::default());
        assert_eq!(read_all(&mut r), "line1\nline2\nline3\n");
    }

    #[test]
    fn zero_entries_emits_nothing() {
        let tmp = write_tmp(b"a\nb\n");
        let session = FileSession::open(tmp.path()).unwrap();
        let mut r = ReverseTailReader::new(
            session,
            TailOptions {
                entries: Some(0),
                ..Default::default()
            },
        );
        assert_eq!(read_all(&mut r), "");
    }

    #[test]
    fn empty_file_emits_nothing() {
        let tmp = write_tmp(b"");
        let session = FileSession::open(tmp.path()).unwrap();
        let mut r = ReverseTailReader::new(session, TailOptions::default());
        assert_eq!(read_all(&mut r), "");
    }

    #[test]
    fn search_filters_without_reordering() {
        let tmp = write_tmp(b"alpha one\nbeta two\nalpha three\nbeta four\n");
        let session = FileSession::open(tmp.path()).unwrap();
        let mut r = ReverseTailReader::new(
            session,
            TailOptions {
                block_size: 7,
                search: Some("alpha".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(read_all(&mut r), "alpha three\nalpha one\n");
    }

    #[test]
    fn malformed_utf8_fails_hard() {
        let tmp = write_tmp(b"good line\n\xFF\xFEbad\ngood again\n");
        let session = FileSession::open(tmp.path()).unwrap();
        let mut r = ReverseTailReader::new(session, TailOptions::default());
        let mut saw_err = false;
        loop {
            match r.next_chunk() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    assert!(matches!(e, TailError::InvalidUtf8(_)), "got {e}");
                    saw_err = true;
                    break;
                }
            }
        }
        assert!(saw_err);
        // Errors are terminal.
        assert!(r.next_chunk().unwrap().is_none());
    }
}
