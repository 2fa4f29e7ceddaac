use flate2::{Decompress, FlushDecompress, Status};

use crate::error::DecodeError;

/// Default cap on the inflated size of a single frame: 64 MiB.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

/// Initial output reservation per frame before growing.
const CHUNK: usize = 16 * 1024;

/// Persistent zlib inflate context for one connection.
///
/// Senders compress every frame on a single long-lived deflate stream and
/// sync-flush after each one, so a frame only inflates correctly on top
/// of all the frames before it. The context therefore lives as long as
/// the connection and is replaced only when a compressor-reset frame
/// arrives.
pub(crate) struct Decompressor {
    stream: Decompress,
    max_size: usize,
}

impl Decompressor {
    pub(crate) fn new(max_size: usize) -> Self {
        Self {
            stream: Decompress::new(true),
            max_size,
        }
    }

    /// Start a fresh inflate stream.
    pub(crate) fn reset(&mut self) {
        self.stream = Decompress::new(true);
    }

    /// Inflate one frame's worth of compressed bytes.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::DecompressFailed`] if zlib rejects the input.
    /// - [`DecodeError::DecompressionBomb`] if the output grows past the
    ///   configured limit.
    pub(crate) fn inflate(&mut self, input: &[u8]) -> Result<Vec<u8>, DecodeError> {
        // One byte of headroom so overflow is detectable without a second pass.
        let ceiling = self.max_size.saturating_add(1);
        let mut out = Vec::with_capacity(CHUNK.min(ceiling));
        let mut consumed = 0usize;

        loop {
            if out.len() == out.capacity() {
                let grow = out.capacity().max(CHUNK).min(ceiling - out.len());
                out.reserve_exact(grow);
            }

            let before_in = self.stream.total_in();
            let before_out = out.len();
            let status = self
                .stream
                .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Sync)
                .map_err(|e| DecodeError::DecompressFailed(e.to_string()))?;
            #[allow(clippy::cast_possible_truncation)]
            let read = (self.stream.total_in() - before_in) as usize;
            consumed += read;

            if out.len() > self.max_size {
                return Err(DecodeError::DecompressionBomb {
                    actual: out.len(),
                    limit: self.max_size,
                });
            }

            let output_full = out.len() == out.capacity();
            if status == Status::StreamEnd || (consumed >= input.len() && !output_full) {
                break;
            }
            if read == 0 && out.len() == before_out && !output_full {
                return Err(DecodeError::DecompressFailed(
                    "inflate made no progress".into(),
                ));
            }
        }

        Ok(out)
    }
}
