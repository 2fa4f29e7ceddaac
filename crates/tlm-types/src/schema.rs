use std::collections::HashMap;

use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, SerializeOptions};
use serde::Deserialize;
use serde_json::Value;

use crate::error::TypeError;

/// Field names as written in the `.proto`, 64-bit integers as JSON
/// numbers. Fields left at their default are omitted.
fn row_options() -> SerializeOptions {
    SerializeOptions::new()
        .stringify_64_bit_integers(false)
        .use_proto_field_name(true)
}

/// Binds a schema path to a message in the operator's descriptor set.
///
/// ```toml
/// [[schemas]]
/// path = "RootOper.InfraStatistics.Interface.Latest.GenericCounters"
/// message = "cisco.ifstats.IfstatsbagGeneric"
/// type = "IfstatsbagGeneric"
/// ```
///
/// `type` is what events report; it defaults to the message's short name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaBinding {
    pub path: String,
    /// Fully qualified message name.
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
}

/// A resolved schema: how to decode rows and what to call them.
#[derive(Clone, Debug)]
pub struct SchemaEntry {
    descriptor: MessageDescriptor,
    type_name: String,
}

impl SchemaEntry {
    /// Entry reported under the message's short name.
    pub fn new(descriptor: MessageDescriptor) -> Self {
        let type_name = descriptor.name().to_string();
        Self {
            descriptor,
            type_name,
        }
    }

    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Reported as the event `type`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Decode one row and render it as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a [`TypeError`] if the row does not decode as this message.
    pub fn decode_row(&self, row: &[u8]) -> Result<Value, TypeError> {
        let message = DynamicMessage::decode(self.descriptor.clone(), row)?;
        let value = message.serialize_with_options(serde_json::value::Serializer, &row_options())?;
        Ok(value)
    }
}

/// Read-only map from schema path to row decoder.
///
/// Built once at startup and shared between connections behind an `Arc`.
/// Paths are matched exactly.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    entries: HashMap<String, SchemaEntry>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every binding against `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::UnknownMessage`] for the first binding whose
    /// message the pool does not define.
    pub fn from_bindings(
        pool: &DescriptorPool,
        bindings: &[SchemaBinding],
    ) -> Result<Self, TypeError> {
        let mut registry = Self::new();
        for binding in bindings {
            let descriptor = pool.get_message_by_name(&binding.message).ok_or_else(|| {
                TypeError::UnknownMessage {
                    name: binding.message.clone(),
                }
            })?;
            let mut entry = SchemaEntry::new(descriptor);
            if let Some(type_name) = &binding.type_name {
                entry = entry.with_type_name(type_name.clone());
            }
            registry.register(binding.path.clone(), entry);
        }
        Ok(registry)
    }

    /// Register `entry` under `path`, returning any entry it replaces.
    pub fn register(&mut self, path: impl Into<String>, entry: SchemaEntry) -> Option<SchemaEntry> {
        self.entries.insert(path.into(), entry)
    }

    pub fn resolve(&self, path: &str) -> Option<&SchemaEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
