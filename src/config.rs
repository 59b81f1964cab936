//! Engine configuration.
//!
//! Configure once, hand the config to [`FmToneGenerator::new`], and the
//! layout (voice pool, worker partition, block size) is fixed for the life of
//! the engine.
//!
//! [`FmToneGenerator::new`]: crate::engine::FmToneGenerator::new

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    synth::register::{CHIP_CHANNELS, CHIP_CHANNELS_WITH_RHYTHM},
    MIDI_CHANNELS,
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Output sample rate in Hz. Also tunes the fnum table.
    pub sample_rate: u32,
    /// Stereo frames rendered per tick.
    pub block_frames: usize,
    /// Size of the melodic voice pool.
    pub max_voices: usize,
    /// Consecutive voice slots owned by each worker.
    pub voices_per_worker: usize,
    /// Route `percussion_channel` to a dedicated rhythm-mode worker.
    pub percussion: bool,
    /// MIDI channel (0-based) carrying drum notes.
    pub percussion_channel: u8,
    /// How long a tick waits for all workers to acknowledge.
    pub ack_timeout: Duration,
    /// Silent blocks written to the sink before the first tick.
    pub preload_frames: usize,
    /// Instrument every MIDI channel starts with.
    pub default_instrument: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_frames: 240,
            max_voices: 6,
            voices_per_worker: 3,
            percussion: true,
            percussion_channel: 9,
            ack_timeout: Duration::from_millis(1000),
            preload_frames: 3,
            default_instrument: 1, // violin
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames;
        self
    }

    pub fn voices(mut self, max_voices: usize, voices_per_worker: usize) -> Self {
        self.max_voices = max_voices;
        self.voices_per_worker = voices_per_worker;
        self
    }

    pub fn percussion(mut self, enabled: bool) -> Self {
        self.percussion = enabled;
        self
    }

    pub fn percussion_channel(mut self, channel: u8) -> Self {
        self.percussion_channel = channel;
        self
    }

    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn preload_frames(mut self, frames: usize) -> Self {
        self.preload_frames = frames;
        self
    }

    pub fn default_instrument(mut self, instrument: u8) -> Self {
        self.default_instrument = instrument;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.block_frames == 0 {
            return Err(ConfigError::ZeroBlockFrames);
        }
        if self.max_voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        if self.voices_per_worker == 0 {
            return Err(ConfigError::ZeroVoicesPerWorker);
        }

        let available = if self.percussion {
            CHIP_CHANNELS_WITH_RHYTHM
        } else {
            CHIP_CHANNELS
        };
        if self.max_voices > available {
            return Err(ConfigError::TooManyVoices {
                voices: self.max_voices,
                available,
            });
        }

        if self.percussion_channel as usize >= MIDI_CHANNELS {
            return Err(ConfigError::InvalidPercussionChannel(self.percussion_channel));
        }
        if self.default_instrument > 15 {
            return Err(ConfigError::InvalidInstrument(self.default_instrument));
        }
        if self.ack_timeout.is_zero() {
            return Err(ConfigError::ZeroAckTimeout(self.ack_timeout));
        }

        Ok(())
    }

    /// Workers that render melodic voices.
    pub fn voice_workers(&self) -> usize {
        self.max_voices.div_ceil(self.voices_per_worker)
    }

    /// Total workers, including the rhythm worker when percussion is on.
    pub fn worker_count(&self) -> usize {
        self.voice_workers() + usize::from(self.percussion)
    }

    /// Index of the rhythm-mode worker, if percussion is enabled.
    pub fn percussion_worker(&self) -> Option<usize> {
        self.percussion.then(|| self.voice_workers())
    }

    /// Interleaved stereo samples in one block.
    pub fn samples_per_block(&self) -> usize {
        self.block_frames * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.voice_workers(), 2);
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.percussion_worker(), Some(2));
        assert_eq!(config.samples_per_block(), 480);
    }

    #[test]
    fn test_without_percussion() {
        let config = EngineConfig::new().percussion(false).voices(9, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.percussion_worker(), None);
    }

    #[test]
    fn test_uneven_partition_rounds_up() {
        let config = EngineConfig::new().percussion(false).voices(7, 3);
        assert_eq!(config.voice_workers(), 3);
    }

    #[test]
    fn test_rhythm_mode_limits_voices() {
        let config = EngineConfig::new().voices(7, 3);
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyVoices {
                voices: 7,
                available: 6
            })
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            EngineConfig::new().sample_rate(0).validate(),
            Err(ConfigError::ZeroSampleRate)
        );
        assert_eq!(
            EngineConfig::new().block_frames(0).validate(),
            Err(ConfigError::ZeroBlockFrames)
        );
        assert_eq!(
            EngineConfig::new().voices(0, 3).validate(),
            Err(ConfigError::NoVoices)
        );
        assert_eq!(
            EngineConfig::new().voices(6, 0).validate(),
            Err(ConfigError::ZeroVoicesPerWorker)
        );
        assert_eq!(
            EngineConfig::new().percussion_channel(16).validate(),
            Err(ConfigError::InvalidPercussionChannel(16))
        );
        assert_eq!(
            EngineConfig::new().default_instrument(16).validate(),
            Err(ConfigError::InvalidInstrument(16))
        );
        assert!(matches!(
            EngineConfig::new().ack_timeout(Duration::ZERO).validate(),
            Err(ConfigError::ZeroAckTimeout(_))
        ));
    }
}
