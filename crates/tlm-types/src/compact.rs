use serde_json::{Map, Value};

/// Envelope of a compact (schema-driven) message.
///
/// ```text
/// TelemetryHeader
///   1  version      uint32
///   2  encoding     string
///   3  policy_name  string
///   6  identifier   string
///   7  start_time   uint64
///   8  end_time     uint64
///   9  tables       repeated TelemetryTable
/// ```
///
/// Only fields present on the wire show up in [`envelope`](Self::envelope).
/// Row bytes stay opaque until the table's `policy_path` resolves to a
/// schema.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TelemetryHeader {
    #[prost(uint32, optional, tag = "1")]
    pub version: Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub encoding: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub policy_name: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub identifier: Option<String>,
    #[prost(uint64, optional, tag = "7")]
    pub start_time: Option<u64>,
    #[prost(uint64, optional, tag = "8")]
    pub end_time: Option<u64>,
    #[prost(message, repeated, tag = "9")]
    pub tables: Vec<TelemetryTable>,
}

/// One table of rows sharing a schema path.
///
/// ```text
/// TelemetryTable
///   1  policy_path  string
///   2  row          repeated bytes
/// ```
#[derive(Clone, PartialEq, prost::Message)]
pub struct TelemetryTable {
    #[prost(string, tag = "1")]
    pub policy_path: String,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub rows: Vec<Vec<u8>>,
}

impl TelemetryHeader {
    /// Header fields other than `tables`, in declaration order.
    #[must_use]
    pub fn envelope(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(v) = self.version {
            map.insert("version".into(), v.into());
        }
        if let Some(v) = &self.encoding {
            map.insert("encoding".into(), v.clone().into());
        }
        if let Some(v) = &self.policy_name {
            map.insert("policy_name".into(), v.clone().into());
        }
        if let Some(v) = &self.identifier {
            map.insert("identifier".into(), v.clone().into());
        }
        if let Some(v) = self.start_time {
            map.insert("start_time".into(), v.into());
        }
        if let Some(v) = self.end_time {
            map.insert("end_time".into(), v.into());
        }
        map
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}
