use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tlm_decoder::{CountingSink, DecoderConfig, DecoderSettings, TelemetryDecoder};
use tlm_tests::fixture::{
    StreamBuilder, compact_message, interface_pool, interface_row, message_type, table,
};

fn interface_doc(index: usize) -> String {
    format!(
        r#"{{"Identifier":"r1","Policy":"ifs","End Time":{index},"Path":"RootOper.Interfaces",
        "Data":{{"Interfaces":{{"Gi0/0/0/{index}":{{"rx":{index},"tx":{index},"mtu":1500}}}}}}}}"#
    )
}

fn json_stream(frames: usize, compressed: bool) -> Vec<u8> {
    (0..frames)
        .fold(StreamBuilder::new(), |stream, i| {
            if compressed {
                stream.compressed_json(&interface_doc(i))
            } else {
                stream.json(&interface_doc(i))
            }
        })
        .build()
}

fn bench_json_flat(c: &mut Criterion) {
    let config: DecoderConfig = r#"
        [[filters]]
        name = "interface"
        pattern = "Interfaces~(?P<Name>.*)"
    "#
    .parse()
    .unwrap();
    let settings = Arc::new(DecoderSettings::from_config(&config).unwrap());

    let mut group = c.benchmark_group("json_flat");
    for compressed in [false, true] {
        let bytes = json_stream(200, compressed);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        let label = if compressed { "compressed" } else { "plain" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut decoder = TelemetryDecoder::new(Arc::clone(&settings));
                let mut sink = CountingSink::default();
                decoder.accept(&bytes, &mut sink).unwrap();
                sink.count
            });
        });
    }
    group.finish();
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let bytes = json_stream(200, true);
    let mut group = c.benchmark_group("chunked_accept");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    for chunk in [64, 1024, 16 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut decoder = TelemetryDecoder::with_defaults();
                let mut sink = CountingSink::default();
                for piece in bytes.chunks(chunk) {
                    decoder.accept(piece, &mut sink).unwrap();
                }
                sink.count
            });
        });
    }
    group.finish();
}

fn bench_compact_rows(c: &mut Criterion) {
    let config: DecoderConfig = r#"
        [[schemas]]
        path = "RootOper.Interfaces"
        message = "tlm.test.IfStats"
    "#
    .parse()
    .unwrap();
    let settings = Arc::new(DecoderSettings::with_descriptors(&config, &interface_pool()).unwrap());

    let rows: Vec<_> = (0..500u64)
        .map(|i| interface_row(i + 1, "GigabitEthernet0/0/0/0"))
        .collect();
    let body = compact_message(vec![table("RootOper.Interfaces", rows)]);
    let bytes = StreamBuilder::new()
        .compressed(message_type::COMPACT, &body)
        .build();

    c.bench_function("compact_500_rows", |b| {
        b.iter(|| {
            let mut decoder = TelemetryDecoder::new(Arc::clone(&settings));
            let mut sink = CountingSink::default();
            decoder.accept(&bytes, &mut sink).unwrap();
            sink.count
        });
    });
}

criterion_group!(benches, bench_json_flat, bench_chunk_sizes, bench_compact_rows);
criterion_main!(benches);
