use tlm_wire::frame::message_type;

/// Payload kinds a frame can carry.
///
/// Maps onto the `tlm_wire::frame::message_type` constants. Values outside
/// the table are kept as `Unknown(id)` so the decoder can report exactly
/// what it refused.
///
/// ```text
/// ┌──────┬─────────────────┬────────────────────────────────────┐
/// │ Wire │ Variant         │ Payload                            │
/// ├──────┼─────────────────┼────────────────────────────────────┤
/// │ 1    │ CompressorReset │ none; restarts the inflate stream  │
/// │ 2    │ Json            │ JSON document                      │
/// │ 3    │ Compact         │ TelemetryHeader + schema rows      │
/// │ 4    │ KeyValue        │ self-describing Telemetry tree     │
/// └──────┴─────────────────┴────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    CompressorReset,
    Json,
    Compact,
    KeyValue,
    Unknown(u32),
}

impl MessageType {
    pub fn wire_id(self) -> u32 {
        match self {
            Self::CompressorReset => message_type::COMPRESSOR_RESET,
            Self::Json => message_type::JSON,
            Self::Compact => message_type::COMPACT,
            Self::KeyValue => message_type::KV,
            Self::Unknown(id) => id,
        }
    }

    pub fn from_wire_id(id: u32) -> Self {
        match id {
            message_type::COMPRESSOR_RESET => Self::CompressorReset,
            message_type::JSON => Self::Json,
            message_type::COMPACT => Self::Compact,
            message_type::KV => Self::KeyValue,
            other => Self::Unknown(other),
        }
    }

    /// Short lowercase label used in logs and `inspect` output.
    pub fn label(self) -> &'static str {
        match self {
            Self::CompressorReset => "reset",
            Self::Json => "json",
            Self::Compact => "compact",
            Self::KeyValue => "kv",
            Self::Unknown(_) => "unknown",
        }
    }
}
