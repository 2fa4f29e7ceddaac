use bytes::Bytes;

use crate::error::WireError;
use crate::header::{FrameFlags, FrameHeader, WireFormat};

/// Known message type IDs.
///
/// The `tlm-types` crate maps these onto the `MessageType` enum.
pub mod message_type {
    /// Zero-length signal: start a fresh inflate stream.
    pub const COMPRESSOR_RESET: u32 = 1;
    pub const JSON: u32 = 2;
    pub const COMPACT: u32 = 3;
    pub const KV: u32 = 4;
}

/// Size of the `[type][inner_length]` pair at the front of a v1 payload.
pub const V1_INNER_HEADER_SIZE: usize = 8;

/// A complete frame lifted off the wire.
///
/// ```text
/// v1 payload:  [u32 BE type] [u32 BE inner_length] [value; inner_length]
/// v2 payload:  [value; length]
/// ```
///
/// `payload` is always the value bytes: for v1 frames the inner header has
/// already been stripped and `message_type` replaced with the inner type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub format: WireFormat,
    pub message_type: u32,
    pub flags: FrameFlags,
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame from its header and exactly `header.length` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::ShortLegacyPayload`] if a v1 payload cannot hold
    /// its inner header. A v1 inner length that runs past the payload is
    /// not an error: the value is cut short at the end of the payload.
    pub fn from_payload(header: &FrameHeader, payload: Bytes) -> Result<Self, WireError> {
        match header.format {
            WireFormat::V2 => Ok(Self {
                format: WireFormat::V2,
                message_type: header.message_type,
                flags: header.flags,
                payload,
            }),
            WireFormat::V1 => {
                if payload.len() < V1_INNER_HEADER_SIZE {
                    return Err(WireError::ShortLegacyPayload {
                        length: payload.len(),
                    });
                }
                let message_type =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let inner = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]])
                    as usize;
                // Bytes after the inner value are padding as far as v1 goes.
                let end = payload.len().min(V1_INNER_HEADER_SIZE.saturating_add(inner));
                let value = payload.slice(V1_INNER_HEADER_SIZE..end);
                Ok(Self {
                    format: WireFormat::V1,
                    message_type,
                    flags: header.flags,
                    payload: value,
                })
            }
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags.is_compressed()
    }
}
