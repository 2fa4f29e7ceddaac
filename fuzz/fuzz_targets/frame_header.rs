#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: FrameHeader::read_from on arbitrary bytes.
//
// Catches bugs in:
// - v1/v2 discrimination on the leading word
// - Truncated 12-byte v2 headers
fuzz_target!(|data: &[u8]| {
    if let Some(needed) = tlm_wire::FrameHeader::required_len(data) {
        let parsed = tlm_wire::FrameHeader::read_from(data);
        assert_eq!(parsed.is_ok(), data.len() >= needed);
    }
});
