//! The chip seam: what a synthesis worker drives.
//!
//! Workers treat the chip as an opaque, deterministic machine. Register
//! writes go in, one mono sample comes out per call. The worker applies a
//! tick's writes first, then pulls samples for the whole block.

use std::ops::Range;

mod square;

pub use square::SquareChip;

/// A register-driven tone generator owned by exactly one worker.
pub trait ToneChip: Send {
    fn write_register(&mut self, address: u8, value: u8);

    /// Advance one sample period and return the mono output.
    fn next_sample(&mut self) -> i16;
}

impl ToneChip for Box<dyn ToneChip> {
    fn write_register(&mut self, address: u8, value: u8) {
        (**self).write_register(address, value)
    }

    fn next_sample(&mut self) -> i16 {
        (**self).next_sample()
    }
}

/// What a worker is responsible for, handed to the chip factory so each
/// chip can mute everything it does not own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLayout {
    pub index: usize,
    /// Chip channels (= voice slots) this worker renders.
    pub channels: Range<usize>,
    /// Whether this worker runs the chip's rhythm section.
    pub percussion: bool,
    pub sample_rate: u32,
}

impl WorkerLayout {
    pub fn owns_channel(&self, channel: usize) -> bool {
        self.channels.contains(&channel)
    }
}

/// Factory for the per-worker chip instances.
///
/// The engine calls this once per worker at `begin()`; each chip then lives
/// on its worker thread.
pub trait ChipFactory {
    type Chip: ToneChip + 'static;

    fn create_chip(&self, layout: &WorkerLayout) -> Self::Chip;
}

impl<F, T> ChipFactory for F
where
    F: Fn(&WorkerLayout) -> T,
    T: ToneChip + 'static,
{
    type Chip = T;

    fn create_chip(&self, layout: &WorkerLayout) -> Self::Chip {
        self(layout)
    }
}
