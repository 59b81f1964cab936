//! Benchmarks for engine building blocks.

mod allocator;
mod mix;
mod render;

pub use allocator::bench_allocator;
pub use mix::bench_mix;
pub use render::bench_render;
