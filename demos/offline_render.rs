//! # Offline render
//!
//! Warp a sawtooth through a small melody and write the result to a WAV file.
//!
//! **Concepts:** `TimeWarpBuilder`, control nodes, raw host MIDI, saved state
//!
//! ```bash
//! RUST_LOG=debug cargo run --example offline_render
//! ```

use timewarp::prelude::*;

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK: usize = 256;
const OUTPUT: &str = "/tmp/timewarp_demo.wav";

/// (block index, MIDI note) pairs; each note replaces the previous one.
const MELODY: [(usize, u8); 4] = [(0, 45), (180, 48), (360, 52), (540, 43)];
const TOTAL_BLOCKS: usize = 750;

/// Raw bytes as a host would deliver them, parsed into frame-stamped events.
fn host_midi(raw: &[(usize, [u8; 3])]) -> Vec<MidiEvent> {
    raw.iter()
        .filter_map(|(offset, bytes)| match MidiEvent::from_bytes_with_offset(bytes, *offset) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!("dropping MIDI {bytes:02X?}: {err:?}");
                None
            }
        })
        .collect()
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (mut engine, mut controller) = TimeWarpBuilder::default()
        .oversampling(4)
        .bend_range(2.0)
        .control_nodes(vec![
            ControlNode::new(0.0, 0.0),
            ControlNode::new(0.3, 0.8),
            ControlNode::new(0.6, 0.2),
            ControlNode::new(1.0, 1.0),
        ])
        .config(EngineConfig::new(SAMPLE_RATE, BLOCK, 2))
        .build()?;

    controller.set_depth(0.8);
    controller.set_dry_wet(0.7);

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(OUTPUT, spec)?;

    let saw_hz = 110.0;
    let mut saw_phase = 0.0f64;
    let mut left = vec![0.0f32; BLOCK];
    let mut right = vec![0.0f32; BLOCK];

    for block in 0..TOTAL_BLOCKS {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let sample = (2.0 * saw_phase - 1.0) as f32 * 0.3;
            *l = sample;
            *r = sample;
            saw_phase = (saw_phase + saw_hz / SAMPLE_RATE).fract();
        }

        let mut raw = Vec::new();
        if let Some(&(_, note)) = MELODY.iter().find(|(at, _)| *at == block) {
            raw.push((BLOCK / 2, [0x90, note, 100]));
        }
        // slow upward bend across the last note
        if block > 600 {
            let bend = 8192 + ((block - 600) * 40).min(8191) as u16;
            raw.push((0, [0xE0, (bend & 0x7F) as u8, (bend >> 7) as u8]));
        }
        let events = host_midi(&raw);

        engine.process(&mut [&mut left[..], &mut right[..]], &events);

        for (l, r) in left.iter().zip(&right) {
            writer.write_sample(*l)?;
            writer.write_sample(*r)?;
        }

        if block % 150 == 0 {
            println!(
                "block {block:>4}: oscillator {:7.2} Hz, phase {:.3}",
                controller.frequency(),
                controller.phase()
            );
        }
    }
    writer.finalize()?;
    println!("Rendered: {OUTPUT}");

    let state = controller.snapshot();
    println!(
        "Saved state: {} nodes, held pitch {:?} Hz",
        state.control_nodes.len(),
        state.last_frequency
    );

    Ok(())
}
