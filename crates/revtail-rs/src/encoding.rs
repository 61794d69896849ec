use crate::error::TailError;

/// Incremental strict UTF-8 validation across chunk boundaries.
///
/// Chunks arrive in emission order. A multi-byte character split at the end of
/// one chunk and completed at the start of the next is accepted; any sequence
/// that is invalid (rather than merely incomplete at the chunk end) fails
/// immediately. Nothing is ever replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Guard {
    /// Trailing bytes of an incomplete sequence, at most 3.
    pending: Vec<u8>,
}

impl Utf8Guard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `chunk` (prefixed by any pending bytes) and return the decoded
    /// text. An incomplete trailing sequence is carried over to the next push.
    pub fn push(&mut self, chunk: &[u8]) -> Result<String, TailError> {
        let carried;
        let bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            carried = buf;
            &carried
        };

        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(e) if e.error_len().is_none() => {
                // Incomplete sequence at the end of the chunk: keep the tail
                // (at most 3 bytes) and hand back the valid prefix.
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                self.pending = rest.to_vec();
                Ok(std::str::from_utf8(valid).unwrap_or_default().to_string())
            }
            Err(e) => Err(TailError::InvalidUtf8(format!(
                "malformed byte sequence after {} valid bytes in chunk",
                e.valid_up_to()
            ))),
        }
    }

    /// Finalize the stream: a dangling partial sequence is an error here,
    /// not something to silently drop.
    pub fn finish(&mut self) -> Result<(), TailError> {
        if !self.pending.is_empty() {
            return Err(TailError::InvalidUtf8(
                "truncated multi-byte sequence at end of input".to_string(),
            ));
        }
        Ok(())
    }
}
