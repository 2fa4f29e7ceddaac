#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tlm_decoder::{Event, TelemetryDecoder};

#[derive(Debug, Arbitrary)]
struct Input {
    stream: Vec<u8>,
    splits: Vec<u8>,
}

// Fuzz target: chunked accept() against one-shot accept().
//
// However the stream is split, the decoder must emit the same events and
// end in the same failed/healthy state.
fuzz_target!(|input: Input| {
    let mut whole = TelemetryDecoder::with_defaults();
    let mut expected: Vec<Event> = Vec::new();
    let whole_ok = whole.accept(&input.stream, &mut expected).is_ok();

    let mut chunked = TelemetryDecoder::with_defaults();
    let mut got: Vec<Event> = Vec::new();
    let mut chunked_ok = true;
    let mut rest = &input.stream[..];
    for split in input.splits.iter().map(|&s| usize::from(s)) {
        let at = split.min(rest.len());
        let (head, tail) = rest.split_at(at);
        if chunked.accept(head, &mut got).is_err() {
            chunked_ok = false;
            break;
        }
        rest = tail;
    }
    if chunked_ok {
        chunked_ok = chunked.accept(rest, &mut got).is_ok();
    }

    assert_eq!(whole_ok, chunked_ok);
    assert_eq!(expected, got);
});
