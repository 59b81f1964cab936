/*
Block / F-Number Pitch Encoding
===============================

The FM chip does not take a frequency in Hz. Each channel is tuned with two
fields packed into its pitch registers:

  fnum     9-bit "frequency number" - the fractional pitch inside one octave
  block    3-bit octave selector - doubles the pitch for every step

The chip's phase generator advances by (fnum << block) every sample, so the
output frequency is:

    freq = fnum * sample_rate * 2^block / 2^19

Picking fnum for A
------------------

We anchor the table on A4 = 440 Hz. Solving the formula for fnum with
block = 5 (A4 is note 69, (69 - 9) / 12 = 5) gives the reference value:

    fnum_a4 = 440 * 2^18 / sample_rate / 16

At 48 kHz that is 150 (integer division on both steps, matching the way the
register tables were originally tuned).

Every other note is the A of its octave scaled by the equal-tempered ratio:

    interval = (note - 9) % 12          semitones above the octave's A
    fnum     = fnum_a4 * 2^(interval / 12)
    block    = clamp((note - 9) / 12, 0, 7)

Both `%` and `/` truncate toward zero. For the lowest notes (below A0, MIDI
0..=8) the interval goes negative and the block stays at 0, which keeps those
notes at the correct pitch instead of jumping up an octave.

Register Layout
---------------

    block_fnum = (block << 9) | fnum          12 bits total

    reg 0x10+ch  <- block_fnum & 0xFF          fnum low byte
    reg 0x20+ch  <- key_on | (block_fnum >> 8) bit 4 = key on,
                                               bits 3..1 = block,
                                               bit 0 = fnum bit 8

Notes more than 7 octaves above A0 clamp at block 7, so they repeat the top
octave. That is a property of the chip, not something we correct.
*/

/// Reference tuning frequency for MIDI note 69.
pub const A4_HZ: u32 = 440;

/// MIDI note number of the A that anchors block 0.
const A0_OFFSET: i32 = 9;

/// Highest octave the 3-bit block field can express.
pub const MAX_BLOCK: u8 = 7;

/// fnum of A4 at the given sample rate (block 4 reference).
#[inline]
pub fn fnum_a4(sample_rate: u32) -> u32 {
    A4_HZ * (1 << 18) / sample_rate / 16
}

/// Octave block for a MIDI note, clamped to the chip's 0..=7 range.
#[inline]
pub fn note_to_block(note: u8) -> u8 {
    ((note as i32 - A0_OFFSET) / 12).clamp(0, MAX_BLOCK as i32) as u8
}

/// 9-bit frequency number for a MIDI note.
#[inline]
pub fn note_to_fnum(note: u8, sample_rate: u32) -> u16 {
    let interval = (note as i32 - A0_OFFSET) % 12;
    let ratio = 2.0_f32.powf((1.0_f32 / 12.0) * interval as f32);
    (fnum_a4(sample_rate) as f32 * ratio) as u16
}

/// Combined `(block << 9) + fnum` field written across the two pitch registers.
#[inline]
pub fn block_and_fnum(note: u8, sample_rate: u32) -> u16 {
    ((note_to_block(note) as u16) << 9) + note_to_fnum(note, sample_rate)
}

/// Frequency the chip produces for a block/fnum pair.
///
/// Used by preview chips; the allocator never needs Hz.
#[inline]
pub fn block_fnum_to_freq(block_fnum: u16, sample_rate: u32) -> f32 {
    let fnum = (block_fnum & 0x1FF) as f32;
    let block = (block_fnum >> 9) & 0x07;
    fnum * sample_rate as f32 * (1u32 << block) as f32 / (1u32 << 19) as f32
}
