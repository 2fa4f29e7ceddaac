#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use prost::Message;
use tlm_types::SchemaEntry;

static ENTRY: OnceLock<SchemaEntry> = OnceLock::new();

// Fuzz target: compact header decode and row rendering.
//
// Catches bugs in:
// - Malformed table lists and length prefixes
// - Rows that do not match the bound message
fuzz_target!(|data: &[u8]| {
    let Ok(header) = tlm_types::TelemetryHeader::decode(data) else {
        return;
    };
    let _ = header.envelope();
    let _ = header.row_count();

    let entry = ENTRY.get_or_init(|| SchemaEntry::new(tlm_tests::fixture::interface_descriptor()));
    for table in &header.tables {
        for row in &table.rows {
            let _ = entry.decode_row(row);
        }
    }
});
