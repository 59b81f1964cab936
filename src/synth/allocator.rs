use std::collections::VecDeque;

use tracing::trace;

use crate::{
    dsp::pitch::block_and_fnum,
    synth::{
        register::{self, CommandSink},
        voice::Voice,
    },
    MIDI_CHANNELS,
};

/// Maps note events onto a fixed pool of chip channels.
///
/// Slots are handed out lowest-index first. When every slot is sounding, the
/// oldest key-on is stolen: its key-off is queued before the new note's
/// writes so the old sound stops before the new one starts.
///
/// Slot `n` is chip channel `n` and belongs to worker
/// `n / voices_per_worker`; that partition never changes.
pub struct VoiceAllocator {
    voices: Vec<Voice>,
    /// Sounding slots in key-on order, oldest at the front.
    key_on_history: VecDeque<usize>,
    instruments: [u8; MIDI_CHANNELS],
    voices_per_worker: usize,
    sample_rate: u32,
}

impl VoiceAllocator {
    pub fn new(
        max_voices: usize,
        voices_per_worker: usize,
        default_instrument: u8,
        sample_rate: u32,
    ) -> Self {
        debug_assert!(voices_per_worker > 0);

        Self {
            voices: vec![Voice::new(); max_voices],
            key_on_history: VecDeque::with_capacity(max_voices),
            instruments: [default_instrument; MIDI_CHANNELS],
            voices_per_worker,
            sample_rate,
        }
    }

    /// Start `note` on a free (or stolen) slot.
    ///
    /// Returns `false` only when an argument is out of MIDI range; nothing is
    /// changed in that case.
    pub fn note_on(
        &mut self,
        note: u8,
        velocity: u8,
        channel: u8,
        out: &mut impl CommandSink,
    ) -> bool {
        if note > 127 || velocity > 127 || channel as usize >= MIDI_CHANNELS {
            return false;
        }
        if self.voices.is_empty() {
            return false;
        }

        let slot = match self.voices.iter().position(Voice::is_free) {
            Some(slot) => slot,
            None => {
                let Some(stolen) = self.key_on_history.pop_front() else {
                    return false;
                };
                trace!(slot = stolen, note, "stealing oldest voice");
                out.push(self.worker_of(stolen), register::key_off(stolen as u8));
                stolen
            }
        };

        self.voices[slot].start(note, channel);
        self.key_on_history.push_back(slot);

        let block_fnum = block_and_fnum(note, self.sample_rate);
        let volume = register::velocity_to_volume(velocity);
        let instrument = self.instruments[channel as usize];

        let worker = self.worker_of(slot);
        for command in register::key_on(slot as u8, instrument, volume, block_fnum) {
            out.push(worker, command);
        }

        true
    }

    /// Release the slot playing `(note, channel)`.
    ///
    /// Returns `false` if an argument is out of MIDI range or no slot holds
    /// that pair.
    pub fn note_off(
        &mut self,
        note: u8,
        velocity: u8,
        channel: u8,
        out: &mut impl CommandSink,
    ) -> bool {
        if note > 127 || velocity > 127 || channel as usize >= MIDI_CHANNELS {
            return false;
        }
        let Some(slot) = self.voices.iter().position(|v| v.plays(note, channel)) else {
            return false;
        };

        out.push(self.worker_of(slot), register::key_off(slot as u8));

        self.voices[slot].free();
        self.key_on_history.retain(|&s| s != slot);

        true
    }

    /// Worker that owns slot `slot`.
    #[inline]
    pub fn worker_of(&self, slot: usize) -> usize {
        slot / self.voices_per_worker
    }

    pub fn set_instrument(&mut self, channel: u8, instrument: u8) -> bool {
        if channel as usize >= MIDI_CHANNELS || instrument > 15 {
            return false;
        }
        self.instruments[channel as usize] = instrument;
        true
    }

    pub fn instrument(&self, channel: u8) -> Option<u8> {
        self.instruments.get(channel as usize).copied()
    }

    /// Bitmask with bit `slot` set for every sounding slot.
    pub fn playing_map(&self) -> u32 {
        self.key_on_history
            .iter()
            .fold(0, |map, &slot| map | (1 << slot))
    }

    /// Slots in key-on order, oldest first.
    pub fn key_on_history(&self) -> impl Iterator<Item = usize> + '_ {
        self.key_on_history.iter().copied()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn max_voices(&self) -> usize {
        self.voices.len()
    }
}
