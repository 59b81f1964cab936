use crate::synth::register::{
    velocity_to_volume, CommandSink, RegisterCommand, RHYTHM_ENABLE, RHYTHM_KEYS, RHYTHM_VOLUME,
};

/*
Rhythm Mode
===========

With rhythm mode on, the chip's last three channels become five fixed drum
voices. Each drum is keyed by one bit of the rhythm register:

    bit   0x10   0x08    0x04   0x02     0x01
          kick   snare   tom    cymbal   hi-hat

    reg 0x0E <- 0x20 | keys        (0x20 keeps rhythm mode enabled)

Drum volumes are 4-bit attenuation codes packed two per register:

    position   0      1      2      3      4       5
    drum       kick   (none) snare  hi-hat cymbal  tom

    reg 0x36 + (pos >> 1) <- volumes[pos | 1] << 4 | volumes[pos & 6]

So 0x36 holds kick (low nibble, high nibble unused), 0x37 snare/hi-hat and
0x38 cymbal/tom. Position 1 is the "null" drum: notes that do not map to any
drum write there, which only touches the unused nibble of 0x36.

MIDI drum notes use the General MIDI percussion map:

    36 kick   38 snare   43 47 50 tom   49 51 cymbal   42 44 hi-hat
*/

const KEY_MASK: u8 = 0x1F;
const NULL_POSITION: usize = 1;

/// Key bit for a GM drum note, or 0 for notes the chip has no drum for.
pub fn note_to_key_bit(note: u8) -> u8 {
    match note {
        36 => 0x10,
        38 => 0x08,
        43 | 47 | 50 => 0x04,
        49 | 51 => 0x02,
        42 | 44 => 0x01,
        _ => 0,
    }
}

/// Nibble position of a drum's volume in the packed volume registers.
pub fn note_to_volume_position(note: u8) -> usize {
    match note {
        36 => 0,
        38 => 2,
        43 | 47 | 50 => 5,
        49 | 51 => 4,
        42 | 44 => 3,
        _ => NULL_POSITION,
    }
}

/// Key bitmask and volume table for the chip's rhythm section.
#[derive(Debug, Clone, Default)]
pub struct Percussion {
    keys: u8,
    volumes: [u8; 6],
    worker: usize,
}

impl Percussion {
    /// `worker` is the synthesis worker whose chip runs rhythm mode.
    pub fn new(worker: usize) -> Self {
        Self {
            keys: 0,
            volumes: [0; 6],
            worker,
        }
    }

    pub fn note_on(&mut self, note: u8, velocity: u8, out: &mut impl CommandSink) -> bool {
        if note > 127 || velocity > 127 {
            return false;
        }

        self.keys |= note_to_key_bit(note);

        let position = note_to_volume_position(note);
        self.volumes[position] = velocity_to_volume(velocity);

        self.emit(position, out);
        true
    }

    pub fn note_off(&mut self, note: u8, velocity: u8, out: &mut impl CommandSink) -> bool {
        if note > 127 || velocity > 127 {
            return false;
        }

        self.keys &= !note_to_key_bit(note);

        self.emit(note_to_volume_position(note), out);
        true
    }

    /// Packed volume byte and register for the pair containing `position`.
    pub fn packed_volume(&self, position: usize) -> RegisterCommand {
        let value = (self.volumes[position | 1] << 4) | self.volumes[position & 6];
        RegisterCommand::new(RHYTHM_VOLUME + (position >> 1) as u8, value)
    }

    pub fn key_state(&self) -> RegisterCommand {
        RegisterCommand::new(RHYTHM_KEYS, RHYTHM_ENABLE | (self.keys & KEY_MASK))
    }

    fn emit(&self, position: usize, out: &mut impl CommandSink) {
        out.push(self.worker, self.packed_volume(position));
        out.push(self.worker, self.key_state());
    }

    pub fn keys(&self) -> u8 {
        self.keys & KEY_MASK
    }

    pub fn is_active(&self) -> bool {
        self.keys() != 0
    }

    pub fn worker(&self) -> usize {
        self.worker
    }
}
