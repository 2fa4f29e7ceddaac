use std::path::PathBuf;

use tlm_types::TypeError;
use tlm_wire::WireError;

/// Errors that end a connection.
///
/// Anything recoverable (a JSON parse failure, a bad row, an undecodable
/// binary header) is logged and dropped inside the decoder and never
/// surfaces here. A `DecodeError` from
/// [`TelemetryDecoder::accept`](crate::TelemetryDecoder::accept) means the
/// stream can no longer be trusted and the decoder has moved to its
/// failed state.
///
/// ```text
///   DecodeError
///   ├── UnknownMessageType   ← frame type outside 1..=4
///   ├── Failed               ← accept() after an earlier fatal error
///   ├── DecompressFailed     ← zlib stream rejected the payload
///   ├── DecompressionBomb    ← inflated frame exceeds the size limit
///   ├── Wire(WireError)      ← malformed v1 inner header
///   └── Io(std::io::Error)   ← from the streaming adapter's reader
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A frame carried a message type the decoder does not know.
    #[error("unexpected message type {message_type} in TLV, resetting connection")]
    UnknownMessageType { message_type: u32 },

    /// The decoder already hit a fatal error and refuses further input.
    #[error("decoder is in failed state after an earlier fatal error")]
    Failed,

    /// zlib inflate failed. The shared stream state is lost with it.
    #[error("zlib decompression failed: {0}")]
    DecompressFailed(String),

    /// Inflated output for a single frame exceeds the configured limit.
    #[error("decompressed size {actual} exceeds limit {limit}")]
    DecompressionBomb { actual: usize, limit: usize },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating [`DecoderConfig`](crate::DecoderConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("filter delimiter must not be empty")]
    EmptyDelimiter,

    #[error("filter {name:?} has an empty pattern")]
    EmptyPattern { name: String },

    /// One `delimiter`-separated level of a pattern failed to compile.
    #[error("filter {name:?}: invalid regex {segment:?}: {source}")]
    InvalidPattern {
        name: String,
        segment: String,
        #[source]
        source: regex::Error,
    },

    #[error("schema path {path:?} registered twice")]
    DuplicateSchema { path: String },

    #[error("invalid descriptor set {}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: prost_reflect::DescriptorError,
    },

    /// A schema binding could not be resolved against the descriptor set.
    #[error("schema binding: {0}")]
    Schema(#[from] TypeError),

    #[error("max_decompressed_size must be greater than zero")]
    ZeroDecompressionLimit,
}
