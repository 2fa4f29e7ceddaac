/// Implementation of `tlm inspect`.
///
/// Walks a capture frame by frame without decompressing or decoding JSON,
/// and prints one line per frame header. Uncompressed compact and
/// key-value frames also get a one-line summary of their binary header.
///
/// # Output format
///
/// ```text
/// Frame 0: v2 reset flags=0x00000000 (0 bytes)
/// Frame 1: v2 compact flags=0x00000000 (212 bytes)
///          policy="ifstats" tables=1 rows=4
/// Frame 2: v1 json flags=0x00000001 compressed (87 bytes)
/// ---
/// 3 frames, 0 bytes left over
/// ```
use std::fs;

use anyhow::{Context, Result};
use prost::Message;
use tlm_decoder::FrameReader;
use tlm_types::{KvTelemetry, MessageType, TelemetryHeader};
use tlm_wire::Frame;

use crate::InspectArgs;

/// Run the `tlm inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a frame is malformed.
/// Frames before the malformed one are still printed.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let mut reader = FrameReader::new();
    reader.extend(&bytes);

    let mut index = 0;
    while let Some(frame) = reader
        .next_frame()
        .with_context(|| format!("malformed frame {index} in {}", args.file.display()))?
    {
        if args.frame.is_none_or(|target| target == index) {
            print_frame(index, &frame, args.show_hex);
        }
        index += 1;
    }

    println!("---");
    println!(
        "{index} frame{}, {} bytes left over",
        if index == 1 { "" } else { "s" },
        reader.buffered()
    );
    Ok(())
}

fn print_frame(index: usize, frame: &Frame, show_hex: bool) {
    let message_type = MessageType::from_wire_id(frame.message_type);
    let compressed = if frame.is_compressed() { " compressed" } else { "" };
    println!(
        "Frame {index}: v{} {} flags=0x{:08X}{compressed} ({} bytes)",
        frame.format.version(),
        match message_type {
            MessageType::Unknown(_) => format!("unknown({})", frame.message_type),
            known => known.label().to_string(),
        },
        frame.flags.raw(),
        frame.payload.len(),
    );

    if !frame.is_compressed()
        && let Some(summary) = summarize(message_type, &frame.payload)
    {
        println!("         {summary}");
    }

    if show_hex {
        for (i, chunk) in frame.payload.chunks(16).enumerate() {
            let ascii: String = chunk
                .iter()
                .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
                .collect();
            println!("           {:04x}  {:<32}  {ascii}", i * 16, hex::encode(chunk));
        }
    }
}

/// One line describing a binary header, if the payload decodes.
fn summarize(message_type: MessageType, payload: &[u8]) -> Option<String> {
    match message_type {
        MessageType::Compact => {
            let header = TelemetryHeader::decode(payload).ok()?;
            Some(format!(
                "policy={:?} tables={} rows={}",
                header.policy_name.as_deref().unwrap_or_default(),
                header.tables.len(),
                header.row_count()
            ))
        }
        MessageType::KeyValue => {
            let message = KvTelemetry::decode(payload).ok()?;
            Some(format!(
                "path={:?} collection={} nodes={}",
                message.base_path.unwrap_or_default(),
                message.collection_id.unwrap_or_default(),
                message.tables.len()
            ))
        }
        _ => None,
    }
}
