//! Framing integration tests.
//!
//! A connection interleaves v1 and v2 frames and delivers them in
//! arbitrary chunks. These tests check that chunking never changes the
//! decoded events, and that every framing violation is fatal for the
//! connection.

use tlm_decoder::{CodecState, DecodeError, Event, TelemetryDecoder};
use tlm_tests::fixture::{StreamBuilder, SyncCompressor, message_type, v1_frame, v2_frame};

fn decode_in_chunks(bytes: &[u8], chunk: usize) -> Vec<Event> {
    let mut decoder = TelemetryDecoder::with_defaults();
    let mut events: Vec<Event> = Vec::new();
    for piece in bytes.chunks(chunk) {
        decoder.accept(piece, &mut events).expect("stream should decode");
    }
    assert_eq!(decoder.buffered(), 0, "no bytes should be left over");
    events
}

fn mixed_stream() -> Vec<u8> {
    StreamBuilder::new()
        .json(r#"{"Data": {"a": 1}}"#)
        .legacy(message_type::JSON, br#"{"Data": {"b": 2}}"#)
        .compressed_json(r#"{"Data": {"c": {"d": 3}}}"#)
        .reset()
        .compressed_json(r#"{"Data": {"e": "x"}}"#)
        .build()
}

// ── Chunking ──────────────────────────────────────────────────────────────────

#[test]
fn every_chunk_size_yields_the_same_events() {
    let bytes = mixed_stream();
    let whole = decode_in_chunks(&bytes, bytes.len());
    assert_eq!(whole.len(), 4);

    for chunk in 1..bytes.len() {
        assert_eq!(
            decode_in_chunks(&bytes, chunk),
            whole,
            "chunk size {chunk} changed the output"
        );
    }
}

#[test]
fn every_split_point_yields_the_same_events() {
    let bytes = mixed_stream();
    let whole = decode_in_chunks(&bytes, bytes.len());

    for split in 0..=bytes.len() {
        let mut decoder = TelemetryDecoder::with_defaults();
        let mut events: Vec<Event> = Vec::new();
        decoder.accept(&bytes[..split], &mut events).unwrap();
        decoder.accept(&bytes[split..], &mut events).unwrap();
        assert_eq!(events, whole, "split at {split} changed the output");
    }
}

#[test]
fn v1_and_v2_frames_interleave() {
    let events = decode_in_chunks(&mixed_stream(), 7);
    let paths: Vec<_> = events.iter().filter_map(Event::path).collect();
    assert_eq!(paths, ["DATA~a", "DATA~b", "DATA~c~d", "DATA~e"]);
}

#[test]
fn empty_chunks_are_harmless() {
    let mut decoder = TelemetryDecoder::with_defaults();
    let mut events: Vec<Event> = Vec::new();
    decoder.accept(&[], &mut events).unwrap();
    decoder.accept(&[], &mut events).unwrap();
    assert!(events.is_empty());
    assert_eq!(decoder.state(), CodecState::AwaitingHeader);
    assert_eq!(decoder.pending_bytes(), 4);
}

#[test]
fn waits_for_the_full_v2_header() {
    let bytes = v2_frame(message_type::JSON, 0, br#"{"Data": {"a": 1}}"#);
    let mut decoder = TelemetryDecoder::with_defaults();
    let mut events: Vec<Event> = Vec::new();

    decoder.accept(&bytes[..4], &mut events).unwrap();
    assert_eq!(decoder.pending_bytes(), 12);
    decoder.accept(&bytes[4..11], &mut events).unwrap();
    assert_eq!(decoder.buffered(), 11);
    decoder.accept(&bytes[11..12], &mut events).unwrap();
    assert_eq!(decoder.state(), CodecState::AwaitingPayload);
    assert_eq!(decoder.pending_bytes(), bytes.len() - 12);
    decoder.accept(&bytes[12..], &mut events).unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(decoder.state(), CodecState::AwaitingHeader);
    assert_eq!(decoder.pending_bytes(), 4);
}

#[test]
fn zero_length_json_frame_degrades_to_unparsed() {
    let bytes = v2_frame(message_type::JSON, 0, b"");
    let events = decode_in_chunks(&bytes, bytes.len());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].get("unparsed_message"), Some(&serde_json::json!("")));
}

// ── Fatal violations ──────────────────────────────────────────────────────────

#[test]
fn unknown_message_type_is_fatal() {
    let bytes = StreamBuilder::new()
        .json(r#"{"Data": {"a": 1}}"#)
        .frame(0, b"")
        .json(r#"{"Data": {"b": 2}}"#)
        .build();

    let mut decoder = TelemetryDecoder::with_defaults();
    let mut events: Vec<Event> = Vec::new();
    let err = decoder.accept(&bytes, &mut events).unwrap_err();

    assert!(matches!(err, DecodeError::UnknownMessageType { message_type: 0 }));
    assert_eq!(events.len(), 1);
    assert_eq!(decoder.state(), CodecState::Failed);
    assert_eq!(decoder.buffered(), 0, "failure drops buffered bytes");
}

#[test]
fn failed_decoder_rejects_further_input() {
    let mut decoder = TelemetryDecoder::with_defaults();
    let mut events: Vec<Event> = Vec::new();
    assert!(decoder.accept(&v2_frame(0, 0, b""), &mut events).is_err());

    let good = v2_frame(message_type::JSON, 0, br#"{"Data": {"a": 1}}"#);
    assert!(matches!(
        decoder.accept(&good, &mut events),
        Err(DecodeError::Failed)
    ));
    assert!(events.is_empty());
}

#[test]
fn v1_inner_length_overrun_keeps_the_available_value() {
    let mut compressor = SyncCompressor::new();
    let value = compressor.compress(br#"{"Data": {"a": 1}}"#);
    let mut bytes = v1_frame(message_type::JSON, &value);
    // Claim five more value bytes than the outer length leaves room for.
    let claimed = u32::try_from(value.len() + 5).unwrap();
    bytes[8..12].copy_from_slice(&claimed.to_be_bytes());

    let mut decoder = TelemetryDecoder::with_defaults();
    let events = decoder.decode_all(&bytes).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path(), Some("DATA~a"));
    assert!(!decoder.is_failed());
}

#[test]
fn short_v1_payload_is_fatal() {
    // Outer length 6 leaves no room for the 8-byte inner header.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 2, 0, 0]);

    let mut decoder = TelemetryDecoder::with_defaults();
    let err = decoder.decode_all(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::Wire(_)));
    assert!(decoder.is_failed());
}

#[test]
fn fresh_decoder_after_teardown_works() {
    let mut events: Vec<Event> = Vec::new();
    let mut failed = TelemetryDecoder::with_defaults();
    assert!(failed.accept(&v2_frame(0, 0, b""), &mut events).is_err());
    drop(failed);

    let mut fresh = TelemetryDecoder::with_defaults();
    let good = v2_frame(message_type::JSON, 0, br#"{"Data": {"a": 1}}"#);
    fresh.accept(&good, &mut events).unwrap();
    assert_eq!(events.len(), 1);
}
