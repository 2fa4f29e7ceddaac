use bytes::{Buf, BytesMut};
use tlm_wire::header::DISCRIMINATOR_SIZE;
use tlm_wire::{Frame, FrameHeader};
use tracing::debug;

use crate::error::DecodeError;

/// Where the frame reader is in the TLV cycle.
///
/// ```text
///   AwaitingHeader ──header──▶ AwaitingPayload ──payload──▶ AwaitingHeader
///         │                            │
///         └────── fatal error ─────────┴──────▶ Failed (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecState {
    AwaitingHeader,
    AwaitingPayload,
    Failed,
}

/// Reassembles frames from arbitrarily chunked input.
///
/// Bytes are appended with [`extend`](Self::extend) and complete frames
/// pulled with [`next_frame`](Self::next_frame) until it returns
/// `Ok(None)`. Whatever is left over stays buffered for the next chunk.
///
/// `pending_bytes` is always the exact number of buffered bytes needed
/// before the next transition:
///
/// ```text
///   AwaitingHeader, nothing known      → 4   (discriminator)
///   AwaitingHeader, discriminator = v2 → 12  (full v2 header)
///   AwaitingPayload                    → header.length
/// ```
///
/// The reader never consumes bytes belonging to an incomplete frame, so
/// the frames produced are independent of how the input was chunked.
pub struct FrameReader {
    state: CodecState,
    pending: usize,
    header: Option<FrameHeader>,
    buf: BytesMut,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: CodecState::AwaitingHeader,
            pending: DISCRIMINATOR_SIZE,
            header: None,
            buf: BytesMut::new(),
        }
    }

    /// Append a chunk to the partial buffer.
    pub fn extend(&mut self, chunk: &[u8]) {
        if self.state != CodecState::Failed {
            self.buf.extend_from_slice(chunk);
        }
    }

    /// Pull the next complete frame out of the buffer.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Failed`] once the reader has been failed.
    /// - [`DecodeError::Wire`] if a v1 payload's inner header is
    ///   malformed. The reader moves to [`CodecState::Failed`].
    pub fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        loop {
            if self.state != CodecState::Failed && self.buf.len() < self.pending {
                return Ok(None);
            }

            match self.state {
                CodecState::Failed => return Err(DecodeError::Failed),
                CodecState::AwaitingHeader => {
                    let Some(needed) = FrameHeader::required_len(&self.buf) else {
                        return Ok(None);
                    };
                    if self.buf.len() < needed {
                        self.transition(CodecState::AwaitingHeader, needed);
                        return Ok(None);
                    }
                    let header = match FrameHeader::read_from(&self.buf) {
                        Ok(header) => header,
                        Err(e) => {
                            self.fail();
                            return Err(e.into());
                        }
                    };
                    self.buf.advance(header.header_len());
                    self.header = Some(header);
                    #[allow(clippy::cast_possible_truncation)]
                    let length = header.length as usize;
                    self.transition(CodecState::AwaitingPayload, length);
                }
                CodecState::AwaitingPayload => {
                    let Some(header) = self.header else {
                        self.fail();
                        return Err(DecodeError::Failed);
                    };
                    let payload = self.buf.split_to(self.pending).freeze();
                    self.transition(CodecState::AwaitingHeader, DISCRIMINATOR_SIZE);
                    return match Frame::from_payload(&header, payload) {
                        Ok(frame) => Ok(Some(frame)),
                        Err(e) => {
                            self.fail();
                            Err(e.into())
                        }
                    };
                }
            }
        }
    }

    /// Enter the terminal failed state and drop any buffered bytes.
    pub fn fail(&mut self) {
        debug!(from = ?self.state, buffered = self.buf.len(), "frame reader failed");
        self.state = CodecState::Failed;
        self.pending = 0;
        self.buf.clear();
    }

    fn transition(&mut self, state: CodecState, pending: usize) {
        debug!(from = ?self.state, to = ?state, wait_for = pending, "state transition");
        self.state = state;
        self.pending = pending;
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending
    }

    /// Bytes carried over, waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Header of the frame being read, or of the last frame read.
    pub fn current_header(&self) -> Option<&FrameHeader> {
        self.header.as_ref()
    }
}
