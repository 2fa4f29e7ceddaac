use prost::Message;
use serde_json::{Map, Value};
use tlm_types::event::field;
use tlm_types::{Event, KvField, KvTelemetry, KvValue};
use tracing::{debug, warn};

use crate::sink::EventSink;

/// Decode a key-value message into one event per top-level node.
pub(crate) fn decode(payload: &[u8], sink: &mut dyn EventSink) {
    let message = match KvTelemetry::decode(payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, length = payload.len(), "failed to decode telemetry kv");
            return;
        }
    };
    debug!(
        collection_id = message.collection_id,
        base_path = message.base_path.as_deref(),
        nodes = message.tables.len(),
        "kv message"
    );

    for event in events(&message) {
        sink.emit(event);
    }
}

/// One event per top-level node, merged with the message header.
pub(crate) fn events(message: &KvTelemetry) -> impl Iterator<Item = Event> + '_ {
    let envelope = message.envelope();
    message.tables.iter().map(move |node| {
        let mut event = Event::from(render(node, message.msg_timestamp));
        // Header fields take precedence over node fields.
        event.merge(&envelope);
        event
    })
}

/// Render a node as `{timest, <name>: scalar?, content?}`.
///
/// `timest` is the node's own timestamp or the nearest ancestor's. Children
/// land in `content` keyed by name: leaves as their scalar, inner nodes as
/// their rendered map. Later siblings with the same name replace earlier
/// ones.
pub(crate) fn render(node: &KvField, inherited: Option<u64>) -> Map<String, Value> {
    let timestamp = node.timestamp.or(inherited);

    let mut map = Map::new();
    map.insert(
        field::TIMESTAMP.to_string(),
        timestamp.map_or(Value::Null, Value::from),
    );
    if let Some(value) = &node.value {
        map.insert(node.name.clone(), value.to_json());
    }

    if !node.is_leaf() {
        let mut content = Map::new();
        for child in &node.fields {
            let rendered = if child.is_leaf() {
                child.value.as_ref().map_or(Value::Null, KvValue::to_json)
            } else {
                Value::Object(render(child, timestamp))
            };
            content.insert(child.name.clone(), rendered);
        }
        map.insert(field::CONTENT.to_string(), Value::Object(content));
    }

    map
}
