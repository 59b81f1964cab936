//! Low-level numeric primitives shared by the allocator and the mixer.
//!
//! Everything here is allocation-free and pure, so it can run on the control
//! thread between ticks or inside a worker without coordination.

/// Wrapping 16-bit summing of worker blocks.
pub mod mix;
/// MIDI note to block/fnum conversion.
pub mod pitch;

pub use pitch::block_and_fnum;
