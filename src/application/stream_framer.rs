// Stream framer - Reassembles newline-terminated lines from arbitrary chunks
use crate::application::link_error::LinkError;
use bytes::BytesMut;

/// Default cap for a partial line waiting on its newline: 64 KiB.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Holds the bytes that followed the last newline seen so far.
///
/// Framing is format-agnostic: blank and whitespace-only lines are emitted and
/// left for the decoder to reject.
#[derive(Debug)]
pub struct StreamFramer {
    pending: BytesMut,
    max_line_bytes: usize,
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl StreamFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            max_line_bytes,
        }
    }

    /// Append a chunk and return an iterator over the lines it completed.
    ///
    /// Lines not pulled from the iterator stay buffered and come out first on the
    /// next push. If the unterminated tail exceeds the cap the buffer is cleared
    /// and `UnboundedLine` is returned.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Lines<'_>, LinkError> {
        self.pending.extend_from_slice(chunk);

        let tail = match chunk.iter().rposition(|&b| b == b'\n') {
            Some(pos) => chunk.len() - pos - 1,
            None => self.pending.len() - self.buffered_complete_len(),
        };
        if tail > self.max_line_bytes {
            self.pending.clear();
            return Err(LinkError::UnboundedLine {
                size: tail,
                max: self.max_line_bytes,
            });
        }

        Ok(Lines {
            pending: &mut self.pending,
        })
    }

    /// Bytes currently buffered, complete or not.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // Complete lines left behind by an iterator that was dropped early.
    fn buffered_complete_len(&self) -> usize {
        self.pending
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1)
    }
}

/// Lazily splits completed lines off the framer's buffer.
pub struct Lines<'a> {
    pending: &'a mut BytesMut,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line = self.pending.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(pos - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}
