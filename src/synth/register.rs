//! Chip register commands and the register map the allocator writes to.

/// One register write for a worker's chip.
///
/// Batches are applied in order, so a later write to the same address wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterCommand {
    pub address: u8,
    pub value: u8,
}

impl RegisterCommand {
    pub const fn new(address: u8, value: u8) -> Self {
        Self { address, value }
    }
}

/// Destination for register writes produced by note handling.
///
/// `worker` selects which synthesis worker's standby queue receives the write.
pub trait CommandSink {
    fn push(&mut self, worker: usize, command: RegisterCommand);
}

/// Flat log of `(worker, command)` pairs, used by tests and benches.
impl CommandSink for Vec<(usize, RegisterCommand)> {
    fn push(&mut self, worker: usize, command: RegisterCommand) {
        Vec::push(self, (worker, command));
    }
}

/// fnum low byte for channel `ch` is at `FNUM_LOW + ch`.
pub const FNUM_LOW: u8 = 0x10;
/// Key-on bit, block and fnum bit 8 for channel `ch` at `KEY_BLOCK + ch`.
pub const KEY_BLOCK: u8 = 0x20;
/// Instrument (high nibble) and volume (low nibble) at `INST_VOLUME + ch`.
pub const INST_VOLUME: u8 = 0x30;
/// Rhythm control: bit 5 enables rhythm mode, bits 4..0 key the drums.
pub const RHYTHM_KEYS: u8 = 0x0E;
/// First of the three packed drum volume registers.
pub const RHYTHM_VOLUME: u8 = 0x36;

/// Key-on flag inside the `KEY_BLOCK` register.
pub const KEY_ON: u8 = 0x10;
/// Rhythm-mode enable flag inside `RHYTHM_KEYS`.
pub const RHYTHM_ENABLE: u8 = 0x20;

/// Number of melodic channels on the chip.
pub const CHIP_CHANNELS: usize = 9;
/// Melodic channels left once rhythm mode takes over channels 6..=8.
pub const CHIP_CHANNELS_WITH_RHYTHM: usize = 6;

/// Pitch presets for the three rhythm channels, written once when rhythm
/// mode is brought up.
pub const RHYTHM_PITCH_PRESETS: [RegisterCommand; 6] = [
    RegisterCommand::new(FNUM_LOW + 6, 0x20),
    RegisterCommand::new(FNUM_LOW + 7, 0x50),
    RegisterCommand::new(FNUM_LOW + 8, 0xC0),
    RegisterCommand::new(KEY_BLOCK + 6, 0x05),
    RegisterCommand::new(KEY_BLOCK + 7, 0x05),
    RegisterCommand::new(KEY_BLOCK + 8, 0x01),
];

/// Attenuation code for a MIDI velocity: 0 is loudest, 15 softest.
#[inline]
pub fn velocity_to_volume(velocity: u8) -> u8 {
    0x0F - ((velocity >> 3) & 0x0F)
}

/// Key-off write for a channel. Block/fnum bits are don't-care once the
/// key-on bit is clear.
#[inline]
pub fn key_off(channel: u8) -> RegisterCommand {
    RegisterCommand::new(KEY_BLOCK + channel, 0x00)
}

/// The three writes that start a note on `channel`, in the order the chip
/// expects them.
#[inline]
pub fn key_on(channel: u8, instrument: u8, volume: u8, block_fnum: u16) -> [RegisterCommand; 3] {
    [
        RegisterCommand::new(INST_VOLUME + channel, (instrument << 4) | (volume & 0x0F)),
        RegisterCommand::new(FNUM_LOW + channel, (block_fnum & 0xFF) as u8),
        RegisterCommand::new(KEY_BLOCK + channel, KEY_ON + (block_fnum >> 8) as u8),
    ]
}
