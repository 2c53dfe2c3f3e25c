//! Line assembly over an arbitrarily chunked byte stream.

use alloc::vec::Vec;

use super::{Message, ProtocolError, LINE_TERMINATOR};
use crate::config::MAX_LINE_LENGTH;

/// Stream-level framing failures. Unlike [`ProtocolError`] these leave the
/// stream in an unknown state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("line too long: more than {max} bytes before a terminator")]
    LineTooLong { max: usize },
}

/// Accumulates received bytes and yields complete lines.
///
/// A partial line stays buffered across [`push`](Self::push) calls until its
/// terminator arrives. The line cap applies to every line, so the verdict
/// does not depend on how the stream was chunked.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_line: usize,
    /// Length of the unterminated tail of `buffer`.
    partial: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_LENGTH)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            partial: 0,
        }
    }

    /// Append received bytes.
    ///
    /// On overflow the offending line and everything after it is discarded;
    /// complete lines before it stay available to [`next_frame`](Self::next_frame).
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        for (i, byte) in bytes.iter().enumerate() {
            if *byte == LINE_TERMINATOR {
                self.partial = 0;
                continue;
            }
            self.partial += 1;
            if self.partial > self.max_line {
                let start = (self.buffer.len() + i + 1) - self.partial;
                match start.checked_sub(self.buffer.len()) {
                    Some(keep) => self.buffer.extend_from_slice(&bytes[..keep]),
                    None => self.buffer.truncate(start),
                }
                self.partial = 0;
                return Err(FrameError::LineTooLong { max: self.max_line });
            }
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Remove and decode the next complete line, `None` when only a partial
    /// line (or nothing) is buffered.
    pub fn next_frame(&mut self) -> Option<Result<Message, ProtocolError>> {
        let pos = self.buffer.iter().position(|b| *b == LINE_TERMINATOR)?;
        let line: Vec<u8> = self.buffer.drain(..=pos).collect();
        let text = &line[..line.len() - 1];
        Some(
            core::str::from_utf8(text)
                .map_err(|_| ProtocolError::NotUtf8)
                .and_then(Message::decode),
        )
    }

    /// Bytes currently buffered, complete lines included.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.partial = 0;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
