//! Benchmarks for the control-thread hot paths.
//!
//! Run with: cargo bench
//!
//! Everything measured here runs once per tick or once per note event, so it
//! has to fit comfortably inside a block's deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 120 frames = 2.5ms deadline
//!   - 240 frames = 5ms deadline
//!   - 480 frames = 10ms deadline
//!
//! Benchmark groups:
//!   - engine/mix        Worker block mixing
//!   - engine/allocator  Note-on/note-off and voice stealing
//!   - engine/render     A worker's tick, synchronous, with the preview chip

use criterion::{criterion_group, criterion_main};

mod engine;

/// Stereo frames per block.
pub const BLOCK_FRAMES: &[usize] = &[120, 240, 480];

criterion_group!(
    benches,
    engine::bench_mix,
    engine::bench_allocator,
    engine::bench_render,
);
criterion_main!(benches);
