use crate::error::WireError;

/// Bytes needed to tell a v1 header from a v2 header.
pub const DISCRIMINATOR_SIZE: usize = 4;

/// v1 header: a single big-endian length word.
pub const V1_HEADER_SIZE: usize = 4;

/// v2 header: type, flags and length words.
pub const V2_HEADER_SIZE: usize = 12;

/// Largest leading word that is read as a v2 message type. Anything above
/// this is a v1 payload length.
pub const MAX_V2_MESSAGE_TYPE: u32 = 4;

/// Wire format generation of a frame.
///
/// The two generations share a stream: the first word of every header
/// decides which one follows.
///
/// ```text
/// v1:  [u32 BE length]                                   then payload
/// v2:  [u32 BE type] [u32 BE flags] [u32 BE length]      then payload
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    V1,
    V2,
}

impl WireFormat {
    /// Header length in bytes for this generation.
    #[must_use]
    pub fn header_len(self) -> usize {
        match self {
            Self::V1 => V1_HEADER_SIZE,
            Self::V2 => V2_HEADER_SIZE,
        }
    }

    /// Numeric version as it shows up in logs and `inspect` output.
    #[must_use]
    pub fn version(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

/// Frame flags word.
///
/// Bit layout:
///   bit 0 = payload is zlib-compressed on the connection's inflate stream
///   bits 1-31 = unused
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags(u32);

impl FrameFlags {
    pub const NONE: Self = Self(0);
    pub const COMPRESSED: Self = Self(0x1);

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_compressed(self) -> bool {
        self.0 & Self::COMPRESSED.0 != 0
    }
}

/// A parsed frame header.
///
/// For v1 frames the real message type lives inside the payload, so
/// `message_type` holds the implicit JSON type until
/// [`Frame::from_payload`](crate::frame::Frame::from_payload) unwraps it,
/// and `flags` is always [`FrameFlags::COMPRESSED`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub format: WireFormat,
    pub message_type: u32,
    pub flags: FrameFlags,
    /// Payload length in bytes, excluding the header itself.
    pub length: u32,
}

fn read_u32_be(buf: &[u8], offset: usize) -> Result<u32, WireError> {
    let bytes = buf
        .get(offset..offset + 4)
        .ok_or(WireError::UnexpectedEof { offset: buf.len() })?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

impl FrameHeader {
    /// How many header bytes the frame starting at `buf` occupies.
    ///
    /// Returns `None` until the 4-byte discriminator is available. A
    /// leading word above [`MAX_V2_MESSAGE_TYPE`] is a v1 length; anything
    /// else is a v2 message type and the header is 12 bytes long.
    #[must_use]
    pub fn required_len(buf: &[u8]) -> Option<usize> {
        let first = read_u32_be(buf, 0).ok()?;
        Some(Self::format_for(first).header_len())
    }

    fn format_for(first_word: u32) -> WireFormat {
        if first_word > MAX_V2_MESSAGE_TYPE {
            WireFormat::V1
        } else {
            WireFormat::V2
        }
    }

    /// Parse a header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than the
    /// header the discriminator announces.
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        let first = read_u32_be(buf, 0)?;

        match Self::format_for(first) {
            WireFormat::V1 => Ok(Self {
                format: WireFormat::V1,
                message_type: crate::frame::message_type::JSON,
                flags: FrameFlags::COMPRESSED,
                length: first,
            }),
            WireFormat::V2 => {
                let flags = read_u32_be(buf, 4)?;
                let length = read_u32_be(buf, 8)?;
                Ok(Self {
                    format: WireFormat::V2,
                    message_type: first,
                    flags: FrameFlags::from_raw(flags),
                    length,
                })
            }
        }
    }

    /// Header length in bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.format.header_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn v1_when_leading_word_exceeds_four() {
        let buf = words(&[5]);
        let header = FrameHeader::read_from(&buf).unwrap();
        assert_eq!(header.format, WireFormat::V1);
        assert_eq!(header.length, 5);
        assert!(header.flags.is_compressed());
        assert_eq!(header.header_len(), V1_HEADER_SIZE);
    }

    #[test]
    fn v2_when_leading_word_is_four() {
        let buf = words(&[4, 0, 77]);
        let header = FrameHeader::read_from(&buf).unwrap();
        assert_eq!(header.format, WireFormat::V2);
        assert_eq!(header.message_type, 4);
        assert!(!header.flags.is_compressed());
        assert_eq!(header.length, 77);
    }

    #[test]
    fn v2_compressed_flag() {
        let buf = words(&[2, 1, 0]);
        let header = FrameHeader::read_from(&buf).unwrap();
        assert!(header.flags.is_compressed());
        assert_eq!(header.flags.raw(), 1);
    }

    #[test]
    fn only_bit_zero_means_compressed() {
        let buf = words(&[3, 0xFFFF_FFFE, 0]);
        let header = FrameHeader::read_from(&buf).unwrap();
        assert!(!header.flags.is_compressed());
    }

    #[test]
    fn zero_is_a_v2_type() {
        // Zero is not a valid message type, but it is still below the
        // threshold, so the header is read as v2 and rejected later.
        let buf = words(&[0, 0, 0]);
        let header = FrameHeader::read_from(&buf).unwrap();
        assert_eq!(header.format, WireFormat::V2);
        assert_eq!(header.message_type, 0);
    }

    #[test]
    fn required_len_needs_discriminator() {
        assert_eq!(FrameHeader::required_len(&[0, 0, 0]), None);
        assert_eq!(FrameHeader::required_len(&words(&[2])), Some(V2_HEADER_SIZE));
        assert_eq!(FrameHeader::required_len(&words(&[1000])), Some(V1_HEADER_SIZE));
    }

    #[test]
    fn truncated_v2_header_rejected() {
        let mut buf = words(&[2, 1]);
        buf.push(0);
        let result = FrameHeader::read_from(&buf);
        assert!(matches!(result, Err(WireError::UnexpectedEof { offset: 9 })));
    }

    #[test]
    fn empty_buffer_rejected() {
        let result = FrameHeader::read_from(&[]);
        assert!(matches!(result, Err(WireError::UnexpectedEof { offset: 0 })));
    }
}
