//! The tone generator: note events in, mixed PCM blocks out.
//!
//! ```text
//!  note_on / note_off ──► VoiceAllocator ─┐
//!                         Percussion ─────┤ register writes
//!                                         ▼
//!                                   StandbyQueues (one per worker)
//!                                         │ swap, once per tick
//!                                         ▼
//!  update() ──► RenderCoordinator ──► workers ──► mix ──► OutputSink
//! ```
//!
//! Everything here runs on the control thread. Workers only ever see the
//! batches and buffers the coordinator hands them.

pub mod coordinator;
pub mod params;
pub mod queue;
pub mod worker;

use tracing::{debug, warn};

use self::{
    coordinator::{RenderCoordinator, TickReport},
    params::{clamp_output_level, playing_channel_map, Param},
    queue::StandbyQueues,
    worker::WorkerHandle,
};
use crate::{
    chip::{ChipFactory, WorkerLayout},
    config::EngineConfig,
    error::ConfigError,
    filter::{Filter, ParamId},
    io::sink::OutputSink,
    synth::{
        message::{MessageReceiver, SynthMessage},
        register::RHYTHM_PITCH_PRESETS,
        Percussion, VoiceAllocator,
    },
};

/// Initial capacity of each standby queue. A full pool steal plus a drum hit
/// is well under this.
const QUEUE_CAPACITY: usize = 64;

/// Worker layouts for `config`, in worker index order.
///
/// Voice worker `i` renders slots `i * voices_per_worker` up to the pool
/// size. The percussion worker, when enabled, comes last and renders no
/// melodic channels.
pub fn worker_layouts(config: &EngineConfig) -> Vec<WorkerLayout> {
    let vpw = config.voices_per_worker;
    let mut layouts: Vec<WorkerLayout> = (0..config.voice_workers())
        .map(|index| WorkerLayout {
            index,
            channels: index * vpw..((index + 1) * vpw).min(config.max_voices),
            percussion: false,
            sample_rate: config.sample_rate,
        })
        .collect();

    if let Some(index) = config.percussion_worker() {
        layouts.push(WorkerLayout {
            index,
            channels: 0..0,
            percussion: true,
            sample_rate: config.sample_rate,
        });
    }

    layouts
}

/// Polyphonic FM tone generator.
pub struct FmToneGenerator<F: ChipFactory, S: OutputSink> {
    config: EngineConfig,
    factory: F,
    sink: S,
    allocator: VoiceAllocator,
    percussion: Option<Percussion>,
    queues: StandbyQueues,
    /// Present once `begin()` has succeeded.
    coordinator: Option<RenderCoordinator>,
    output_level: i32,
}

impl<F: ChipFactory, S: OutputSink> FmToneGenerator<F, S> {
    pub fn new(config: EngineConfig, factory: F, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let allocator = VoiceAllocator::new(
            config.max_voices,
            config.voices_per_worker,
            config.default_instrument,
            config.sample_rate,
        );
        let percussion = config.percussion_worker().map(Percussion::new);
        let queues = StandbyQueues::new(config.worker_count(), QUEUE_CAPACITY);

        Ok(Self {
            config,
            factory,
            sink,
            allocator,
            percussion,
            queues,
            coordinator: None,
            output_level: 0,
        })
    }

    /// Boot the workers, prime the sink and queue the rhythm setup.
    ///
    /// Returns `false` if already started or a worker thread could not be
    /// spawned. In the latter case any workers that did start are shut down
    /// again and `begin()` may be retried.
    pub fn begin(&mut self) -> bool {
        if self.coordinator.is_some() {
            warn!("begin() called twice");
            return false;
        }

        let mut handles = Vec::with_capacity(self.config.worker_count());
        for layout in worker_layouts(&self.config) {
            let chip = self.factory.create_chip(&layout);
            match WorkerHandle::spawn(&layout, chip) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!(error = %err, "worker boot failed");
                    return false;
                }
            }
        }

        let coordinator =
            RenderCoordinator::new(handles, self.config.block_frames, self.config.ack_timeout);
        let primed = coordinator.prime(&mut self.sink, self.config.preload_frames);

        // Drum pitches must be programmed before any drum queued earlier is keyed.
        if let Some(queue) = self
            .percussion
            .as_ref()
            .and_then(|p| self.queues.get_mut(p.worker()))
        {
            queue.prepend(&RHYTHM_PITCH_PRESETS);
        }

        debug!(
            workers = coordinator.worker_count(),
            primed,
            percussion = self.percussion.is_some(),
            "tone generator started"
        );
        self.coordinator = Some(coordinator);
        true
    }

    /// Run one render tick if started and the sink has room for a block.
    pub fn tick(&mut self) -> Option<&TickReport> {
        let coordinator = self.coordinator.as_mut()?;
        coordinator.tick(&mut self.queues, &mut self.sink)
    }

    pub fn note_on(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
        match self.percussion.as_mut() {
            Some(percussion) if channel == self.config.percussion_channel => {
                percussion.note_on(note, velocity, &mut self.queues)
            }
            _ => self
                .allocator
                .note_on(note, velocity, channel, &mut self.queues),
        }
    }

    pub fn note_off(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
        match self.percussion.as_mut() {
            Some(percussion) if channel == self.config.percussion_channel => {
                percussion.note_off(note, velocity, &mut self.queues)
            }
            _ => self
                .allocator
                .note_off(note, velocity, channel, &mut self.queues),
        }
    }

    /// Apply every queued message. Returns how many were taken.
    pub fn drain_messages(&mut self, receiver: &mut impl MessageReceiver) -> usize {
        let mut count = 0;
        while let Some(message) = receiver.pop() {
            let handled = match message {
                SynthMessage::NoteOn {
                    note,
                    velocity,
                    channel,
                } => self.note_on(note, velocity, channel),
                SynthMessage::NoteOff {
                    note,
                    velocity,
                    channel,
                } => self.note_off(note, velocity, channel),
                SynthMessage::SetInstrument {
                    channel,
                    instrument,
                } => self.allocator.set_instrument(channel, instrument),
            };
            if !handled {
                debug!(?message, "message ignored");
            }
            count += 1;
        }
        count
    }

    pub fn is_started(&self) -> bool {
        self.coordinator.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn allocator(&self) -> &VoiceAllocator {
        &self.allocator
    }

    pub fn percussion(&self) -> Option<&Percussion> {
        self.percussion.as_ref()
    }

    /// Commands waiting for the next tick.
    pub fn queues(&self) -> &StandbyQueues {
        &self.queues
    }

    pub fn coordinator(&self) -> Option<&RenderCoordinator> {
        self.coordinator.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<F: ChipFactory, S: OutputSink> Filter for FmToneGenerator<F, S> {
    fn is_available(&self, id: ParamId) -> bool {
        Param::from_id(id).is_some()
    }

    fn get_param(&self, id: ParamId) -> i32 {
        match Param::from_id(id) {
            Some(Param::Instrument { channel }) => {
                self.allocator.instrument(channel).map_or(0, i32::from)
            }
            Some(Param::PlayingChannelMap) => playing_channel_map(
                self.allocator.playing_map(),
                self.config.max_voices,
                self.percussion.as_ref().is_some_and(Percussion::is_active),
            ),
            Some(Param::OutputLevel) => self.output_level,
            None => 0,
        }
    }

    fn set_param(&mut self, id: ParamId, value: i32) -> bool {
        let Some(param) = Param::from_id(id).filter(|p| p.is_writable()) else {
            return false;
        };

        match param {
            Param::Instrument { channel } => match u8::try_from(value) {
                Ok(instrument) => self.allocator.set_instrument(channel, instrument),
                Err(_) => false,
            },
            Param::OutputLevel => {
                self.output_level = clamp_output_level(value);
                self.sink.set_output_level(self.output_level);
                true
            }
            Param::PlayingChannelMap => false,
        }
    }

    fn begin(&mut self) -> bool {
        FmToneGenerator::begin(self)
    }

    fn update(&mut self) {
        self.tick();
    }

    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
        FmToneGenerator::note_on(self, note, velocity, channel)
    }

    fn note_off(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
        FmToneGenerator::note_off(self, note, velocity, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layouts = worker_layouts(&EngineConfig::default());

        assert_eq!(layouts.len(), 3);
        assert_eq!(layouts[0].channels, 0..3);
        assert_eq!(layouts[1].channels, 3..6);
        assert!(!layouts[1].percussion);
        assert_eq!(layouts[2].channels, 0..0);
        assert!(layouts[2].percussion);
    }

    #[test]
    fn test_uneven_pool_truncates_last_voice_worker() {
        let config = EngineConfig::default().voices(5, 2).percussion(false);
        let layouts = worker_layouts(&config);

        assert_eq!(layouts.len(), 3);
        assert_eq!(layouts[2].channels, 4..5);
        assert!(layouts.iter().all(|l| !l.percussion));
    }
}
