use serde_json::{Map, Number, Value};

/// Envelope of a self-describing key-value message.
///
/// ```text
/// Telemetry
///   1   collection_id            uint64
///   2   base_path                string
///   3   subscription_identifier  string
///   4   model_version            string
///   5   collection_start_time    uint64
///   6   msg_timestamp            uint64
///   14  tables                   repeated TelemetryField
///   15  collection_end_time      uint64
/// ```
///
/// Node nesting is bounded by prost's decode recursion limit; deeper
/// messages fail to decode instead of exhausting the stack.
#[derive(Clone, PartialEq, prost::Message)]
pub struct KvTelemetry {
    #[prost(uint64, optional, tag = "1")]
    pub collection_id: Option<u64>,
    #[prost(string, optional, tag = "2")]
    pub base_path: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub subscription_identifier: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub model_version: Option<String>,
    #[prost(uint64, optional, tag = "5")]
    pub collection_start_time: Option<u64>,
    #[prost(uint64, optional, tag = "6")]
    pub msg_timestamp: Option<u64>,
    #[prost(message, repeated, tag = "14")]
    pub tables: Vec<KvField>,
    #[prost(uint64, optional, tag = "15")]
    pub collection_end_time: Option<u64>,
}

/// One node of the key-value tree.
///
/// ```text
/// TelemetryField
///   1   timestamp     uint64
///   2   name          string
///   3   augment_data  bool
///   4..12             oneof value (see KvValue)
///   15  tables        repeated TelemetryField
/// ```
#[derive(Clone, PartialEq, prost::Message)]
pub struct KvField {
    #[prost(uint64, optional, tag = "1")]
    pub timestamp: Option<u64>,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(bool, optional, tag = "3")]
    pub augment_data: Option<bool>,
    #[prost(oneof = "KvValue", tags = "4, 5, 6, 7, 8, 9, 10, 11, 12")]
    pub value: Option<KvValue>,
    #[prost(message, repeated, tag = "15")]
    pub fields: Vec<KvField>,
}

/// The scalar carried by a leaf node.
///
/// ```text
/// ┌───────┬──────────────┐
/// │ Field │ Variant      │
/// ├───────┼──────────────┤
/// │ 4     │ BytesValue   │
/// │ 5     │ StringValue  │
/// │ 6     │ BoolValue    │
/// │ 7     │ Uint32Value  │
/// │ 8     │ Uint64Value  │
/// │ 9     │ Sint32Value  │
/// │ 10    │ Sint64Value  │
/// │ 11    │ DoubleValue  │
/// │ 12    │ FloatValue   │
/// └───────┴──────────────┘
/// ```
#[derive(Clone, PartialEq, prost::Oneof)]
pub enum KvValue {
    #[prost(bytes, tag = "4")]
    BytesValue(Vec<u8>),
    #[prost(string, tag = "5")]
    StringValue(String),
    #[prost(bool, tag = "6")]
    BoolValue(bool),
    #[prost(uint32, tag = "7")]
    Uint32Value(u32),
    #[prost(uint64, tag = "8")]
    Uint64Value(u64),
    #[prost(sint32, tag = "9")]
    Sint32Value(i32),
    #[prost(sint64, tag = "10")]
    Sint64Value(i64),
    #[prost(double, tag = "11")]
    DoubleValue(f64),
    #[prost(float, tag = "12")]
    FloatValue(f32),
}

impl KvValue {
    /// JSON rendering. Bytes become a lossy UTF-8 string; non-finite
    /// floats become `null`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::BytesValue(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            Self::StringValue(s) => Value::String(s.clone()),
            Self::BoolValue(b) => Value::Bool(*b),
            Self::Uint32Value(n) => Value::from(*n),
            Self::Uint64Value(n) => Value::from(*n),
            Self::Sint32Value(n) => Value::from(*n),
            Self::Sint64Value(n) => Value::from(*n),
            Self::DoubleValue(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::FloatValue(f) => {
                Number::from_f64(f64::from(*f)).map_or(Value::Null, Value::Number)
            }
        }
    }
}

impl KvTelemetry {
    /// Header fields other than `tables`, in field-number order.
    #[must_use]
    pub fn envelope(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(v) = self.collection_id {
            map.insert("collection_id".into(), v.into());
        }
        if let Some(v) = &self.base_path {
            map.insert("base_path".into(), v.clone().into());
        }
        if let Some(v) = &self.subscription_identifier {
            map.insert("subscription_identifier".into(), v.clone().into());
        }
        if let Some(v) = &self.model_version {
            map.insert("model_version".into(), v.clone().into());
        }
        if let Some(v) = self.collection_start_time {
            map.insert("collection_start_time".into(), v.into());
        }
        if let Some(v) = self.msg_timestamp {
            map.insert("msg_timestamp".into(), v.into());
        }
        if let Some(v) = self.collection_end_time {
            map.insert("collection_end_time".into(), v.into());
        }
        map
    }
}

impl KvField {
    pub fn is_leaf(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_nested_nodes() {
        let leaf = KvField {
            name: "mtu".into(),
            value: Some(KvValue::Uint32Value(1500)),
            ..KvField::default()
        };
        let sent = KvTelemetry {
            collection_id: Some(7),
            base_path: Some("Cisco-IOS-XR-ifmgr".into()),
            msg_timestamp: Some(1000),
            collection_end_time: Some(2000),
            tables: vec![KvField {
                timestamp: Some(42),
                name: "eth0".into(),
                fields: vec![leaf],
                ..KvField::default()
            }],
            ..KvTelemetry::default()
        };

        let msg = KvTelemetry::decode(sent.encode_to_vec().as_slice()).unwrap();
        assert_eq!(msg.tables.len(), 1);
        let node = &msg.tables[0];
        assert_eq!(node.timestamp, Some(42));
        assert!(!node.is_leaf());
        assert_eq!(node.fields[0].value, Some(KvValue::Uint32Value(1500)));
        assert_eq!(
            Value::Object(msg.envelope()),
            json!({
                "collection_id": 7,
                "base_path": "Cisco-IOS-XR-ifmgr",
                "msg_timestamp": 1000,
                "collection_end_time": 2000
            })
        );
    }

    #[test]
    fn later_oneof_member_wins() {
        // name "v", sint32 field 9 = 3 (zigzag -2), then double field 11 = 1.25
        let mut body = vec![0x12, 0x01, b'v', 0x48, 0x03, 0x59];
        body.extend_from_slice(&1.25f64.to_le_bytes());
        let node = KvField::decode(body.as_slice()).unwrap();
        assert_eq!(node.value, Some(KvValue::DoubleValue(1.25)));
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(KvValue::Sint32Value(-2).to_json(), json!(-2));
        assert_eq!(KvValue::BytesValue(b"ab".to_vec()).to_json(), json!("ab"));
        assert_eq!(KvValue::BytesValue(vec![0xFF]).to_json(), json!("\u{FFFD}"));
        assert_eq!(KvValue::FloatValue(0.5).to_json(), json!(0.5));
        assert_eq!(KvValue::DoubleValue(f64::NAN).to_json(), Value::Null);
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let mut node = KvField {
            name: "leaf".into(),
            ..KvField::default()
        };
        for _ in 0..200 {
            node = KvField {
                fields: vec![node],
                ..KvField::default()
            };
        }
        assert!(KvField::decode(node.encode_to_vec().as_slice()).is_err());
    }
}
