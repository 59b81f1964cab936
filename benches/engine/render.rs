//! Benchmarks for a single worker's tick.
//!
//! Runs `worker::render` on the calling thread so only the chip and the
//! buffer fill are measured, not channel hand-off.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fmtg::{
    dsp::block_and_fnum,
    engine::worker::{self, RenderRequest},
    synth::register,
    SquareChip, WorkerLayout,
};

use crate::BLOCK_FRAMES;

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/render");
    let layout = WorkerLayout {
        index: 0,
        channels: 0..3,
        percussion: false,
        sample_rate: 48_000,
    };

    for &frames in BLOCK_FRAMES {
        // === THREE HELD NOTES ===
        // a full voice worker, no register traffic per tick
        let mut chip = SquareChip::new(&layout);
        let chord = [60u8, 64, 67];
        let mut setup = Vec::new();
        for (ch, &note) in chord.iter().enumerate() {
            setup.extend(register::key_on(ch as u8, 1, 0, block_and_fnum(note, 48_000)));
        }
        let mut buffer = vec![0i16; frames * 2].into_boxed_slice();
        let mut commands = setup;

        group.bench_with_input(BenchmarkId::new("chord", frames), &frames, |b, &frames| {
            b.iter(|| {
                let request = RenderRequest {
                    commands: std::mem::take(&mut commands),
                    buffer: std::mem::take(&mut buffer),
                    frames,
                };
                let ack = worker::render(0, &mut chip, black_box(request));
                commands = ack.commands;
                commands.clear();
                buffer = ack.buffer;
            })
        });
    }

    group.finish();
}
