use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known event field names.
pub mod field {
    pub const PATH: &str = "path";
    pub const TYPE: &str = "type";
    pub const CONTENT: &str = "content";
    /// Set instead of everything else when a JSON payload fails to parse.
    pub const UNPARSED_MESSAGE: &str = "unparsed_message";
    /// Regex captures collected while matching a flattening filter.
    pub const CAPTURES: &str = "key";
    /// Inherited node timestamp in kv output.
    pub const TIMESTAMP: &str = "timest";
    /// Wrapper for non-object JSON documents in raw mode.
    pub const MESSAGE: &str = "message";
}

/// One decoded telemetry record.
///
/// An event is a flat JSON object. Flattened and table events carry
/// `path`, `type` and `content` plus envelope fields copied from the
/// message header; raw JSON events are the document itself. Keys keep
/// insertion order, so serialised events are stable across runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the usual `path`/`type`/`content` triple.
    pub fn with_path(path: impl Into<String>, event_type: impl Into<String>, content: Value) -> Self {
        let mut event = Self::new();
        event.insert(field::PATH, Value::String(path.into()));
        event.insert(field::TYPE, Value::String(event_type.into()));
        event.insert(field::CONTENT, content);
        event
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Copy every field of `envelope` in, replacing fields already set.
    pub fn merge(&mut self, envelope: &Map<String, Value>) {
        for (key, value) in envelope {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn path(&self) -> Option<&str> {
        self.get(field::PATH).and_then(Value::as_str)
    }

    pub fn event_type(&self) -> Option<&str> {
        self.get(field::TYPE).and_then(Value::as_str)
    }

    pub fn content(&self) -> Option<&Value> {
        self.get(field::CONTENT)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn triple_accessors() {
        let event = Event::with_path("DATA~x", "x", json!(1));
        assert_eq!(event.path(), Some("DATA~x"));
        assert_eq!(event.event_type(), Some("x"));
        assert_eq!(event.content(), Some(&json!(1)));
    }

    #[test]
    fn merge_overwrites_in_place() {
        let mut event = Event::with_path("p", "t", json!(null));
        let envelope = json!({"type": "header", "identifier": "r1"});
        event.merge(envelope.as_object().unwrap());
        assert_eq!(event.to_string(), r#"{"path":"p","type":"header","content":null,"identifier":"r1"}"#);
    }

    #[test]
    fn display_keeps_insertion_order() {
        let mut event = Event::new();
        event.insert("z", json!(1));
        event.insert("a", json!(2));
        assert_eq!(event.to_string(), r#"{"z":1,"a":2}"#);
    }
}
