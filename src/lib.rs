//! Voice allocation and multi-worker rendering for a polyphonic FM tone
//! generator.
//!
//! Note events become chip register writes, the writes are spread over
//! several synthesis workers, and the workers' blocks are mixed into one
//! interleaved stereo i16 stream. See [`engine::FmToneGenerator`].

pub mod chip;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod filter;
pub mod io;
pub mod synth;

pub use chip::{ChipFactory, SquareChip, ToneChip, WorkerLayout};
pub use config::EngineConfig;
pub use engine::FmToneGenerator;
pub use error::{ConfigError, WorkerError};
pub use filter::Filter;
pub use io::sink::OutputSink;
pub use synth::message::SynthMessage;

/// MIDI channels addressable by note events and instrument parameters.
pub const MIDI_CHANNELS: usize = 16;
