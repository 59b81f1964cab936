use std::time::Duration;

/// Problems found when validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("block must hold at least one frame")]
    ZeroBlockFrames,

    #[error("at least one voice is required")]
    NoVoices,

    #[error("voices_per_worker must be non-zero")]
    ZeroVoicesPerWorker,

    /// More voices than the chip has melodic channels.
    #[error("{voices} voices requested but only {available} chip channels are available")]
    TooManyVoices { voices: usize, available: usize },

    #[error("percussion channel {0} is not a MIDI channel (must be 0-15)")]
    InvalidPercussionChannel(u8),

    #[error("default instrument {0} is out of range (must be 0-15)")]
    InvalidInstrument(u8),

    #[error("ack timeout must be non-zero, got {0:?}")]
    ZeroAckTimeout(Duration),
}

/// Failures on the worker request/ack boundary.
///
/// These never abort a tick; they are logged and the tick carries on with
/// whatever audio is available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("worker {0} is not accepting requests")]
    Disconnected(usize),

    #[error("worker {0} still has a request in flight")]
    Busy(usize),

    #[error("worker {worker} did not acknowledge within {timeout:?}")]
    Timeout { worker: usize, timeout: Duration },

    #[error("failed to spawn worker {worker}: {reason}")]
    Spawn { worker: usize, reason: String },
}
