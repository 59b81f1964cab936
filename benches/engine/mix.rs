//! Benchmarks for wrapping block mixes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fmtg::dsp::mix;

use crate::BLOCK_FRAMES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/mix");

    for &frames in BLOCK_FRAMES {
        let samples = frames * 2;
        let blocks: Vec<Vec<i16>> = (0..3)
            .map(|w| {
                (0..samples)
                    .map(|i| ((i as f32 * 0.05 * (w + 1) as f32).sin() * 12_000.0) as i16)
                    .collect()
            })
            .collect();
        let mut out = vec![0i16; samples];

        // Three workers, the default layout
        group.bench_with_input(BenchmarkId::new("three_workers", frames), &frames, |b, _| {
            b.iter(|| {
                mix::mix_blocks(
                    black_box(&mut out),
                    blocks.iter().map(|block| black_box(&block[..])),
                );
            })
        });

        // Single accumulate step
        group.bench_with_input(BenchmarkId::new("sum_in_place", frames), &frames, |b, _| {
            b.iter(|| {
                mix::sum_in_place(black_box(&mut out), black_box(&blocks[1]));
            })
        });
    }

    group.finish();
}
