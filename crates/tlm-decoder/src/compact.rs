use prost::Message;
use serde_json::Value;
use tlm_types::event::field;
use tlm_types::{Event, SchemaRegistry, TelemetryHeader};
use tracing::{debug, warn};

use crate::sink::EventSink;

/// Decode a compact message: header, then each table's rows through the
/// decoder registered for its schema path.
///
/// Tables without a registered decoder are skipped. Each table and each
/// row stands alone, so one bad row costs only itself.
pub(crate) fn decode(payload: &[u8], registry: &SchemaRegistry, sink: &mut dyn EventSink) {
    let header = match TelemetryHeader::decode(payload) {
        Ok(header) => header,
        Err(e) => {
            warn!(error = %e, length = payload.len(), "failed to decode telemetry header");
            return;
        }
    };
    let envelope = header.envelope();

    for table in &header.tables {
        debug!(
            identifier = header.identifier.as_deref(),
            policy_name = header.policy_name.as_deref(),
            policy_path = %table.policy_path,
            rows = table.rows.len(),
            "message policy path"
        );

        let Some(entry) = registry.resolve(&table.policy_path) else {
            debug!(policy_path = %table.policy_path, "no decoder available");
            continue;
        };

        for (index, row) in table.rows.iter().enumerate() {
            match entry.decode_row(row) {
                Ok(content) => {
                    let mut event = Event::from(envelope.clone());
                    event.insert(field::CONTENT, content);
                    event.insert(field::TYPE, Value::String(entry.type_name().to_string()));
                    event.insert(field::PATH, Value::String(table.policy_path.clone()));
                    sink.emit(event);
                }
                Err(e) => warn!(
                    policy_path = %table.policy_path,
                    decoder = entry.type_name(),
                    row = index,
                    error = %e,
                    "failed to decode telemetry row"
                ),
            }
        }
    }
}
