/// Errors raised while decoding binary message bodies.
///
/// These describe protobuf-level problems inside a payload that framing
/// already delivered intact. A `TypeError` never poisons the connection;
/// the caller drops the message or row.
///
/// ```text
/// ┌──────────────────────────────────────────────────────┐
/// │ TypeError                                            │
/// │   ├── Decode(prost::DecodeError)  malformed body     │
/// │   ├── Render(serde_json::Error)   row not JSON-able  │
/// │   └── UnknownMessage              name not in pool   │
/// └──────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),

    /// A decoded row could not be turned into JSON.
    #[error("failed to render row: {0}")]
    Render(#[from] serde_json::Error),

    /// A schema binding names a message the descriptor pool lacks.
    #[error("message {name:?} not found in descriptor pool")]
    UnknownMessage { name: String },
}
