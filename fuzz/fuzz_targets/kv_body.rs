#![no_main]

use libfuzzer_sys::fuzz_target;
use prost::Message;

// Fuzz target: key-value message decode.
//
// Deeply nested node chains must hit the decode recursion limit, not the
// stack.
fuzz_target!(|data: &[u8]| {
    if let Ok(message) = tlm_types::KvTelemetry::decode(data) {
        for node in &message.tables {
            let _ = node.is_leaf();
        }
        let _ = message.envelope();
    }
});
