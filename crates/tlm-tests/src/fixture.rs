use flate2::{Compress, Compression, FlushCompress};
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};
use tlm_types::{KvField, KvTelemetry, KvValue, TelemetryHeader, TelemetryTable};

/// Message type IDs as they appear on the wire.
pub mod message_type {
    pub const COMPRESSOR_RESET: u32 = 1;
    pub const JSON: u32 = 2;
    pub const COMPACT: u32 = 3;
    pub const KV: u32 = 4;
}

fn be32(n: usize) -> [u8; 4] {
    u32::try_from(n)
        .unwrap_or_else(|_| panic!("{n} does not fit a u32 length word"))
        .to_be_bytes()
}

/// `[length][type][inner_length][value]`. The outer header marks the
/// payload compressed, so `value` must come from a [`SyncCompressor`].
pub fn v1_frame(message_type: u32, value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + value.len());
    buf.extend_from_slice(&be32(8 + value.len()));
    buf.extend_from_slice(&message_type.to_be_bytes());
    buf.extend_from_slice(&be32(value.len()));
    buf.extend_from_slice(value);
    buf
}

/// `[type][flags][length][payload]`.
pub fn v2_frame(message_type: u32, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + payload.len());
    buf.extend_from_slice(&message_type.to_be_bytes());
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&be32(payload.len()));
    buf.extend_from_slice(payload);
    buf
}

/// Sender side of a connection's deflate stream.
///
/// Every call to [`compress`](Self::compress) sync-flushes, so each
/// returned chunk ends on a byte boundary but may refer back to earlier
/// chunks.
pub struct SyncCompressor(Compress);

impl Default for SyncCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncCompressor {
    pub fn new() -> Self {
        Self(Compress::new(Compression::default(), true))
    }

    pub fn compress(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 64);
        let start = self.0.total_in();
        loop {
            let fed = usize::try_from(self.0.total_in() - start).unwrap();
            self.0
                .compress_vec(&data[fed..], &mut out, FlushCompress::Sync)
                .expect("deflate failed");
            let fed = usize::try_from(self.0.total_in() - start).unwrap();
            if fed == data.len() && out.len() < out.capacity() {
                return out;
            }
            out.reserve(out.capacity());
        }
    }
}

/// Builds a byte stream frame by frame, the way a router would send it.
///
/// ```rust
/// use tlm_tests::fixture::StreamBuilder;
///
/// let bytes = StreamBuilder::new()
///     .json(r#"{"Data": {"a": 1}}"#)
///     .compressed_json(r#"{"Data": {"b": 2}}"#)
///     .build();
/// assert!(!bytes.is_empty());
/// ```
#[derive(Default)]
pub struct StreamBuilder {
    bytes: Vec<u8>,
    compressor: SyncCompressor,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uncompressed v2 frame.
    #[must_use]
    pub fn frame(mut self, message_type: u32, payload: &[u8]) -> Self {
        self.bytes.extend(v2_frame(message_type, 0, payload));
        self
    }

    /// v2 frame compressed on the shared stream.
    #[must_use]
    pub fn compressed(mut self, message_type: u32, payload: &[u8]) -> Self {
        let deflated = self.compressor.compress(payload);
        self.bytes.extend(v2_frame(message_type, 1, &deflated));
        self
    }

    /// v1 frame compressed on the shared stream.
    #[must_use]
    pub fn legacy(mut self, message_type: u32, payload: &[u8]) -> Self {
        let deflated = self.compressor.compress(payload);
        self.bytes.extend(v1_frame(message_type, &deflated));
        self
    }

    #[must_use]
    pub fn json(self, doc: &str) -> Self {
        self.frame(message_type::JSON, doc.as_bytes())
    }

    #[must_use]
    pub fn compressed_json(self, doc: &str) -> Self {
        self.compressed(message_type::JSON, doc.as_bytes())
    }

    /// Send a compressor-reset frame and start a new sender stream.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.bytes.extend(v2_frame(message_type::COMPRESSOR_RESET, 0, &[]));
        self.compressor = SyncCompressor::new();
        self
    }

    /// Append bytes verbatim.
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Fully qualified name of the interface counters row message.
pub const IFSTATS: &str = "tlm.test.IfStats";

fn scalar(name: &str, number: i32, label: Label, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(kind as i32),
        ..FieldDescriptorProto::default()
    }
}

/// What `protoc --include_imports --descriptor_set_out` would write for
/// the row schema the tests use.
///
/// ```text
/// package tlm.test;
/// message IfStats {
///   uint64          packets_received = 1;
///   string          name             = 2;
///   repeated uint32 drops            = 3;
/// }
/// ```
pub fn interface_descriptor_set() -> FileDescriptorSet {
    let stats = DescriptorProto {
        name: Some("IfStats".into()),
        field: vec![
            scalar("packets_received", 1, Label::Optional, Type::Uint64),
            scalar("name", 2, Label::Optional, Type::String),
            scalar("drops", 3, Label::Repeated, Type::Uint32),
        ],
        ..DescriptorProto::default()
    };
    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("tlm_test_ifstats.proto".into()),
            package: Some("tlm.test".into()),
            message_type: vec![stats],
            syntax: Some("proto3".into()),
            ..FileDescriptorProto::default()
        }],
    }
}

pub fn interface_pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(interface_descriptor_set())
        .expect("fixture descriptor set is valid")
}

pub fn interface_descriptor() -> MessageDescriptor {
    interface_pool()
        .get_message_by_name(IFSTATS)
        .expect("fixture pool defines IfStats")
}

/// Encode one row of `descriptor` with the given fields set.
pub fn row(descriptor: &MessageDescriptor, fields: &[(&str, Value)]) -> Vec<u8> {
    let mut message = DynamicMessage::new(descriptor.clone());
    for (name, value) in fields {
        message.set_field_by_name(name, value.clone());
    }
    message.encode_to_vec()
}

/// `IfStats` row with a counter and an interface name.
pub fn interface_row(packets: u64, name: &str) -> Vec<u8> {
    row(
        &interface_descriptor(),
        &[
            ("packets_received", Value::U64(packets)),
            ("name", Value::String(name.into())),
        ],
    )
}

pub fn table(policy_path: &str, rows: Vec<Vec<u8>>) -> TelemetryTable {
    TelemetryTable {
        policy_path: policy_path.into(),
        rows,
    }
}

/// Compact message body: fixed header fields around `tables`.
pub fn compact_message(tables: Vec<TelemetryTable>) -> Vec<u8> {
    TelemetryHeader {
        version: Some(1),
        encoding: Some("gpb".into()),
        policy_name: Some("ifstats".into()),
        identifier: Some("router-1".into()),
        start_time: Some(1000),
        end_time: Some(2000),
        tables,
    }
    .encode_to_vec()
}

/// Key-value node with a name and child nodes.
pub fn kv_node(name: &str, timestamp: Option<u64>, children: Vec<KvField>) -> KvField {
    KvField {
        timestamp,
        name: name.into(),
        fields: children,
        ..KvField::default()
    }
}

pub fn kv_leaf(name: &str, value: KvValue) -> KvField {
    KvField {
        name: name.into(),
        value: Some(value),
        ..KvField::default()
    }
}

pub fn kv_string(name: &str, value: &str) -> KvField {
    kv_leaf(name, KvValue::StringValue(value.into()))
}

pub fn kv_uint64(name: &str, value: u64) -> KvField {
    kv_leaf(name, KvValue::Uint64Value(value))
}

/// Key-value message body wrapping top-level nodes. `msg_timestamp` is
/// always 5000.
pub fn kv_message(collection_id: u64, base_path: &str, nodes: Vec<KvField>) -> Vec<u8> {
    KvTelemetry {
        collection_id: Some(collection_id),
        base_path: Some(base_path.into()),
        msg_timestamp: Some(5000),
        tables: nodes,
        ..KvTelemetry::default()
    }
    .encode_to_vec()
}
