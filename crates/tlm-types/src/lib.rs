#![warn(clippy::pedantic)]

pub mod compact;
pub mod error;
pub mod event;
pub mod kv;
pub mod message_type;
pub mod schema;

pub use compact::{TelemetryHeader, TelemetryTable};
pub use error::TypeError;
pub use event::Event;
pub use kv::{KvField, KvTelemetry, KvValue};
pub use message_type::MessageType;
pub use schema::{SchemaBinding, SchemaEntry, SchemaRegistry};

pub use prost_reflect::{DescriptorPool, MessageDescriptor};
