use std::borrow::Cow;
use std::sync::Arc;

use tlm_types::{DescriptorPool, Event, MessageType, SchemaRegistry};
use tlm_wire::Frame;
use tracing::{debug, error};

use crate::config::{DecoderConfig, OutputMode};
use crate::decompression::{DEFAULT_MAX_DECOMPRESSED_SIZE, Decompressor};
use crate::error::{ConfigError, DecodeError};
use crate::flatten::FilterTable;
use crate::frame_reader::{CodecState, FrameReader};
use crate::sink::EventSink;
use crate::{compact, json, kv};

/// Everything a decoder needs that does not change per connection.
///
/// Build once, wrap in an `Arc`, and hand a clone to each
/// [`TelemetryDecoder`]. Schemas can also be registered programmatically
/// through [`registry_mut`](Self::registry_mut) before sharing.
///
/// ```text
/// ┌──────────────────────────────────────────────────┐
/// │ DecoderSettings                                  │
/// │   mode       ← raw or flat JSON output           │
/// │   filters    ← compiled flattening rules         │
/// │   registry   ← schema path → message descriptor  │
/// │   max_size   ← per-frame inflate ceiling         │
/// └──────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug)]
pub struct DecoderSettings {
    mode: OutputMode,
    filters: FilterTable,
    registry: SchemaRegistry,
    max_decompressed_size: usize,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            filters: FilterTable::default(),
            registry: SchemaRegistry::new(),
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl DecoderSettings {
    /// Compile filters, load the descriptor set and bind schemas from a
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration does not validate,
    /// the descriptor set cannot be loaded, or a schema names a message
    /// the set does not define.
    pub fn from_config(config: &DecoderConfig) -> Result<Self, ConfigError> {
        let pool = config.load_descriptors()?;
        Self::with_descriptors(config, &pool)
    }

    /// Like [`from_config`](Self::from_config), resolving schemas against
    /// an already loaded pool. `descriptor_set` is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration does not validate or
    /// a schema names a message missing from `pool`.
    pub fn with_descriptors(
        config: &DecoderConfig,
        pool: &DescriptorPool,
    ) -> Result<Self, ConfigError> {
        let filters = config.validate()?;
        let registry = SchemaRegistry::from_bindings(pool, &config.schemas)?;

        debug!(
            mode = %config.mode,
            filters = filters.len(),
            schemas = registry.len(),
            "decoder settings built"
        );

        Ok(Self {
            mode: config.mode,
            filters,
            registry,
            max_decompressed_size: config.max_decompressed_size,
        })
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn filters(&self) -> &FilterTable {
        &self.filters
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    pub fn max_decompressed_size(&self) -> usize {
        self.max_decompressed_size
    }
}

/// Per-connection telemetry stream decoder.
///
/// Feed raw transport bytes to [`accept`](Self::accept) in whatever chunks
/// they arrive. Every complete frame is decoded on the spot and its events
/// are handed to the sink in wire order; incomplete trailing bytes are
/// carried to the next call.
///
/// Decoding a frame takes three steps:
///
///   1. **Framing**: the [`FrameReader`] lifts a v1 or v2 frame off the
///      buffered bytes.
///   2. **Decompression**: compressed payloads go through the
///      connection's persistent zlib stream. A compressor-reset frame
///      starts a fresh stream and produces no events.
///   3. **Dispatch**: JSON, compact and key-value payloads go to their
///      decoders. Any other message type is fatal.
///
/// Fatal errors (unknown message type, malformed v1 payload, inflate
/// failure) put the decoder in [`CodecState::Failed`]; from then on every
/// call returns [`DecodeError::Failed`] and the connection should be
/// dropped. Problems confined to one message or row are logged and
/// skipped.
///
/// # Example
///
/// ```rust
/// use tlm_decoder::{Event, TelemetryDecoder};
///
/// let doc = br#"{"Data": {"x": 1}}"#;
/// let mut frame = Vec::new();
/// frame.extend_from_slice(&2u32.to_be_bytes()); // JSON
/// frame.extend_from_slice(&0u32.to_be_bytes()); // not compressed
/// frame.extend_from_slice(&(doc.len() as u32).to_be_bytes());
/// frame.extend_from_slice(doc);
///
/// let mut decoder = TelemetryDecoder::with_defaults();
/// let mut events: Vec<Event> = Vec::new();
/// decoder.accept(&frame[..7], &mut events).unwrap();
/// decoder.accept(&frame[7..], &mut events).unwrap();
///
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].path(), Some("DATA~x"));
/// ```
pub struct TelemetryDecoder {
    settings: Arc<DecoderSettings>,
    reader: FrameReader,
    decompressor: Decompressor,
}

impl TelemetryDecoder {
    #[must_use]
    pub fn new(settings: Arc<DecoderSettings>) -> Self {
        let decompressor = Decompressor::new(settings.max_decompressed_size);
        Self {
            settings,
            reader: FrameReader::new(),
            decompressor,
        }
    }

    /// Decoder with flat output, no filters and no schemas.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(DecoderSettings::default()))
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration does not validate.
    pub fn from_config(config: &DecoderConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(Arc::new(DecoderSettings::from_config(config)?)))
    }

    /// Consume a chunk of transport bytes, emitting every event it
    /// completes.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Failed`] if an earlier call already failed.
    /// - [`DecodeError::UnknownMessageType`], [`DecodeError::Wire`],
    ///   [`DecodeError::DecompressFailed`] or
    ///   [`DecodeError::DecompressionBomb`] on a fatal protocol violation.
    ///   Events from frames before the offending one have already been
    ///   emitted; the offending frame emits none.
    pub fn accept(&mut self, chunk: &[u8], sink: &mut dyn EventSink) -> Result<(), DecodeError> {
        if self.reader.state() == CodecState::Failed {
            return Err(DecodeError::Failed);
        }

        debug!(
            length = chunk.len(),
            prepending = self.reader.buffered(),
            waiting_for = self.reader.pending_bytes(),
            "transport passing data down"
        );
        self.reader.extend(chunk);

        loop {
            let frame = match self.reader.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => return Err(self.fail(e)),
            };
            if let Err(e) = self.dispatch(&frame, sink) {
                return Err(self.fail(e));
            }
        }

        if self.reader.buffered() > 0 {
            debug!(
                length = self.reader.buffered(),
                waiting_for = self.reader.pending_bytes(),
                "stashing data until transport hands us the rest"
            );
        }
        Ok(())
    }

    /// Decode a complete byte buffer and collect the events.
    ///
    /// # Errors
    ///
    /// Same as [`accept`](Self::accept).
    pub fn decode_all(&mut self, bytes: &[u8]) -> Result<Vec<Event>, DecodeError> {
        let mut events: Vec<Event> = Vec::new();
        self.accept(bytes, &mut events)?;
        Ok(events)
    }

    fn fail(&mut self, e: DecodeError) -> DecodeError {
        error!(error = %e, "resetting connection");
        self.reader.fail();
        e
    }

    fn dispatch(&mut self, frame: &Frame, sink: &mut dyn EventSink) -> Result<(), DecodeError> {
        let message_type = MessageType::from_wire_id(frame.message_type);
        debug!(
            version = frame.format.version(),
            message_type = message_type.label(),
            compressed = frame.is_compressed(),
            length = frame.payload.len(),
            "dispatching frame"
        );

        match message_type {
            MessageType::CompressorReset => {
                self.decompressor.reset();
                debug!("compressor reset");
            }
            MessageType::Json => {
                let payload = self.payload(frame)?;
                json::decode(&payload, self.settings.mode, &self.settings.filters, sink);
            }
            MessageType::Compact => {
                let payload = self.payload(frame)?;
                compact::decode(&payload, &self.settings.registry, sink);
            }
            MessageType::KeyValue => {
                let payload = self.payload(frame)?;
                kv::decode(&payload, sink);
            }
            MessageType::Unknown(message_type) => {
                return Err(DecodeError::UnknownMessageType { message_type });
            }
        }
        Ok(())
    }

    fn payload<'f>(&mut self, frame: &'f Frame) -> Result<Cow<'f, [u8]>, DecodeError> {
        if frame.is_compressed() {
            let inflated = self.decompressor.inflate(&frame.payload)?;
            debug!(
                compressed = frame.payload.len(),
                inflated = inflated.len(),
                "inflated payload"
            );
            Ok(Cow::Owned(inflated))
        } else {
            Ok(Cow::Borrowed(&frame.payload[..]))
        }
    }

    pub fn state(&self) -> CodecState {
        self.reader.state()
    }

    pub fn is_failed(&self) -> bool {
        self.reader.state() == CodecState::Failed
    }

    /// Bytes needed before the next state transition.
    pub fn pending_bytes(&self) -> usize {
        self.reader.pending_bytes()
    }

    /// Bytes carried over from earlier chunks.
    pub fn buffered(&self) -> usize {
        self.reader.buffered()
    }

    pub fn settings(&self) -> &Arc<DecoderSettings> {
        &self.settings
    }
}
