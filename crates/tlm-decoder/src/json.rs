use serde_json::{Map, Value};
use tlm_types::Event;
use tlm_types::event::field;
use tracing::{debug, info, warn};

use crate::config::OutputMode;
use crate::flatten::FilterTable;
use crate::sink::EventSink;

/// Rendered-path prefix for flattened records.
pub const FLAT_PATH_SEED: &str = "DATA";

/// Decode one JSON payload into events.
///
/// A payload that does not parse becomes a single
/// `{"unparsed_message": <text>}` event; nothing here is fatal.
pub(crate) fn decode(
    payload: &[u8],
    mode: OutputMode,
    filters: &FilterTable,
    sink: &mut dyn EventSink,
) {
    let document: Value = match serde_json::from_slice(payload) {
        Ok(document) => document,
        Err(e) => {
            info!(error = %e, length = payload.len(), "JSON parse error, emitting text message");
            let mut event = Event::new();
            event.insert(
                field::UNPARSED_MESSAGE,
                Value::String(String::from_utf8_lossy(payload).into_owned()),
            );
            sink.emit(event);
            return;
        }
    };

    match mode {
        OutputMode::Raw => emit_raw(document, sink),
        OutputMode::Flat => emit_flat(&document, filters, sink),
    }
}

fn emit_raw(document: Value, sink: &mut dyn EventSink) {
    let event = match document {
        Value::Object(map) => Event::from(map),
        other => {
            let mut event = Event::new();
            event.insert(field::MESSAGE, other);
            event
        }
    };
    debug!("yielding raw event");
    sink.emit(event);
}

fn emit_flat(document: &Value, filters: &FilterTable, sink: &mut dyn EventSink) {
    let Some(data) = document.get("Data").and_then(Value::as_object) else {
        warn!("JSON document has no Data object, nothing to flatten");
        return;
    };
    let raw_path = document.get("Path").and_then(Value::as_str).unwrap_or_default();
    let envelope = envelope(document);

    filters.flatten(raw_path, FLAT_PATH_SEED, data, |record| {
        let mut event = Event::with_path(record.path, record.event_type, record.content);
        event.merge(&envelope);
        sink.emit(event);
    });
}

/// Metadata copied onto every flattened event.
///
/// Documents carrying `"End Time"` use it directly; older documents
/// report the collection window and id instead.
fn envelope(document: &Value) -> Map<String, Value> {
    let lookup = |key: &str| document.get(key).cloned().unwrap_or(Value::Null);

    let mut map = Map::new();
    map.insert("identifier".into(), lookup("Identifier"));
    map.insert("policy_name".into(), lookup("Policy"));
    map.insert("version".into(), lookup("Version"));

    let end_time = lookup("End Time");
    if end_time.is_null() {
        map.insert("end_time".into(), lookup("CollectionEndTime"));
        map.insert("start_time".into(), lookup("CollectionStartTime"));
        map.insert("collection_id".into(), lookup("CollectionID"));
    } else {
        map.insert("end_time".into(), end_time);
    }
    map
}
