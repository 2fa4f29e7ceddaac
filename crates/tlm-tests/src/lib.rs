//! Shared fixtures for the integration tests and benches.
//!
//! Nothing in the production crates encodes telemetry, so the builders
//! here play the sender's part: frame payloads, keep a sender-side deflate
//! stream, and encode protobuf message bodies with prost.

pub mod fixture;
