/// Framing-level errors.
///
/// Everything in here means the byte stream no longer lines up with frame
/// boundaries, so the owning connection has to be torn down.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Input ended before a complete header could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// A v1 payload is too short to carry its inner `[type][length]` pair.
    #[error("v1 payload of {length} bytes is shorter than its 8-byte inner header")]
    ShortLegacyPayload { length: usize },
}
