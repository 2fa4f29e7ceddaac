#![warn(clippy::pedantic)]

pub mod config;
pub mod decoder;
pub mod error;
pub mod flatten;
pub mod frame_reader;
pub mod sink;
pub mod streaming;

mod compact;
mod decompression;
mod json;
mod kv;

pub use config::{DecoderConfig, FilterConfig, OutputMode};
pub use decoder::{DecoderSettings, TelemetryDecoder};
pub use decompression::DEFAULT_MAX_DECOMPRESSED_SIZE;
pub use error::{ConfigError, DecodeError};
pub use flatten::{FilterTable, FlatRecord};
pub use frame_reader::{CodecState, FrameReader};
pub use json::FLAT_PATH_SEED;
pub use sink::{CountingSink, EventSink, FnSink};
pub use streaming::{DEFAULT_CHUNK_SIZE, StreamingDecoder};
pub use tlm_types::Event;
