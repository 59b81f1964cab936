use crate::{
    chip::{ToneChip, WorkerLayout},
    dsp::pitch::block_fnum_to_freq,
    synth::register::{
        CHIP_CHANNELS, FNUM_LOW, INST_VOLUME, KEY_BLOCK, KEY_ON, RHYTHM_ENABLE, RHYTHM_KEYS,
        RHYTHM_VOLUME,
    },
};

/*
Preview Chip
============

A stand-in tone generator that understands the same register map as the FM
chip but renders plain square waves. It exists so the engine can be heard
and tested end to end without a full FM emulation behind it.

What it honours:

  0x10+ch / 0x20+ch   block, fnum and key-on, same encoding as the real chip
  0x30+ch             low nibble: 3 dB attenuation steps (instrument ignored)
  0x0E                rhythm keys: each rising key bit fires a noise burst
  0x36..0x38          drum volume nibbles

Level Smoothing
---------------

Key-on and key-off would click if the amplitude jumped instantly, so each
channel slews its level toward the target by a fixed step per sample:

    level += clamp(target - level, -SLEW, +SLEW)

At 48 kHz a slew of 1/64 reaches full scale in ~1.3 ms.
*/

const CHANNEL_PEAK: f32 = 3000.0;
const DRUM_PEAK: f32 = 4000.0;
const SLEW: f32 = 1.0 / 64.0;
const DRUM_DECAY: f32 = 0.9992;
const DRUMS: usize = 5;

/// Volume position (see percussion module) of each key bit, bit 4 first.
const DRUM_VOLUME_POSITION: [usize; DRUMS] = [0, 2, 5, 4, 3];

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    phase: f32,
    increment: f32,
    level: f32,
    target: f32,
}

impl Channel {
    fn next(&mut self) -> f32 {
        let step = (self.target - self.level).clamp(-SLEW, SLEW);
        self.level += step;

        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        if self.phase < 0.5 {
            self.level
        } else {
            -self.level
        }
    }
}

/// Square-wave chip that follows the FM register map.
pub struct SquareChip {
    registers: [u8; 0x40],
    channels: [Channel; CHIP_CHANNELS],
    enabled: [bool; CHIP_CHANNELS],
    percussion: bool,
    drum_levels: [f32; DRUMS],
    noise: u32,
    sample_rate: u32,
}

impl SquareChip {
    pub fn new(layout: &WorkerLayout) -> Self {
        let mut enabled = [false; CHIP_CHANNELS];
        for (ch, flag) in enabled.iter_mut().enumerate() {
            *flag = layout.owns_channel(ch);
        }

        Self {
            registers: [0; 0x40],
            channels: [Channel::default(); CHIP_CHANNELS],
            enabled,
            percussion: layout.percussion,
            drum_levels: [0.0; DRUMS],
            noise: 0x1_FFFF,
            sample_rate: layout.sample_rate,
        }
    }

    fn refresh_channel(&mut self, ch: usize) {
        let low = self.registers[(FNUM_LOW as usize) + ch] as u16;
        let high = self.registers[(KEY_BLOCK as usize) + ch];
        let block_fnum = ((high as u16 & 0x0F) << 8) | low;

        let freq = block_fnum_to_freq(block_fnum, self.sample_rate);
        let attenuation = self.registers[(INST_VOLUME as usize) + ch] & 0x0F;
        let gain = 10f32.powf(-3.0 * attenuation as f32 / 20.0);

        let channel = &mut self.channels[ch];
        channel.increment = freq / self.sample_rate as f32;
        channel.target = if high & KEY_ON != 0 { gain } else { 0.0 };
    }

    fn drum_gain(&self, drum: usize) -> f32 {
        let position = DRUM_VOLUME_POSITION[drum];
        let byte = self.registers[(RHYTHM_VOLUME as usize) + (position >> 1)];
        let nibble = if position & 1 == 1 { byte >> 4 } else { byte & 0x0F };
        10f32.powf(-3.0 * nibble as f32 / 20.0)
    }

    fn next_noise(&mut self) -> f32 {
        // 17-bit LFSR, taps 17 and 14
        let bit = ((self.noise >> 16) ^ (self.noise >> 13)) & 1;
        self.noise = ((self.noise << 1) | bit) & 0x1_FFFF;
        if bit == 1 {
            1.0
        } else {
            -1.0
        }
    }
}

impl ToneChip for SquareChip {
    fn write_register(&mut self, address: u8, value: u8) {
        let address = address as usize;
        if address >= self.registers.len() {
            return;
        }

        let previous = self.registers[address];
        self.registers[address] = value;

        match address as u8 {
            RHYTHM_KEYS => {
                if !self.percussion || value & RHYTHM_ENABLE == 0 {
                    return;
                }
                let rising = value & !previous;
                for drum in 0..DRUMS {
                    if rising & (0x10 >> drum) != 0 {
                        self.drum_levels[drum] = self.drum_gain(drum);
                    }
                }
            }
            a if (FNUM_LOW..FNUM_LOW + CHIP_CHANNELS as u8).contains(&a) => {
                self.refresh_channel((a - FNUM_LOW) as usize)
            }
            a if (KEY_BLOCK..KEY_BLOCK + CHIP_CHANNELS as u8).contains(&a) => {
                self.refresh_channel((a - KEY_BLOCK) as usize)
            }
            a if (INST_VOLUME..INST_VOLUME + CHIP_CHANNELS as u8).contains(&a) => {
                self.refresh_channel((a - INST_VOLUME) as usize)
            }
            _ => {}
        }
    }

    fn next_sample(&mut self) -> i16 {
        let mut out = 0.0;

        for (channel, &enabled) in self.channels.iter_mut().zip(&self.enabled) {
            if enabled {
                out += channel.next() * CHANNEL_PEAK;
            }
        }

        if self.percussion {
            let noise = self.next_noise();
            for level in &mut self.drum_levels {
                out += noise * *level * DRUM_PEAK;
                *level *= DRUM_DECAY;
            }
        }

        out.clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dsp::pitch::block_and_fnum, synth::register};

    fn layout(channels: std::ops::Range<usize>, percussion: bool) -> WorkerLayout {
        WorkerLayout {
            index: 0,
            channels,
            percussion,
            sample_rate: 48_000,
        }
    }

    fn render(chip: &mut SquareChip, n: usize) -> Vec<i16> {
        (0..n).map(|_| chip.next_sample()).collect()
    }

    #[test]
    fn test_silent_until_keyed() {
        let mut chip = SquareChip::new(&layout(0..3, false));
        assert!(render(&mut chip, 256).iter().all(|&s| s == 0));
    }

    #[test]
    fn test_key_on_produces_sound() {
        let mut chip = SquareChip::new(&layout(0..3, false));
        for cmd in register::key_on(1, 1, 0, block_and_fnum(69, 48_000)) {
            chip.write_register(cmd.address, cmd.value);
        }

        let out = render(&mut chip, 1024);
        assert!(out.iter().any(|&s| s.abs() > 1000));
    }

    #[test]
    fn test_unowned_channel_is_muted() {
        let mut chip = SquareChip::new(&layout(3..6, false));
        for cmd in register::key_on(1, 1, 0, block_and_fnum(69, 48_000)) {
            chip.write_register(cmd.address, cmd.value);
        }

        assert!(render(&mut chip, 1024).iter().all(|&s| s == 0));
    }

    #[test]
    fn test_key_off_fades_to_silence() {
        let mut chip = SquareChip::new(&layout(0..3, false));
        for cmd in register::key_on(0, 1, 0, block_and_fnum(60, 48_000)) {
            chip.write_register(cmd.address, cmd.value);
        }
        render(&mut chip, 512);

        let off = register::key_off(0);
        chip.write_register(off.address, off.value);
        let tail = render(&mut chip, 512);

        assert!(tail[256..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_drum_fires_on_rising_key_bit() {
        let mut chip = SquareChip::new(&layout(0..0, true));
        chip.write_register(RHYTHM_KEYS, RHYTHM_ENABLE | 0x10);

        let out = render(&mut chip, 256);
        assert!(out.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_rhythm_ignored_without_percussion() {
        let mut chip = SquareChip::new(&layout(0..3, false));
        chip.write_register(RHYTHM_KEYS, RHYTHM_ENABLE | 0x1F);

        assert!(render(&mut chip, 256).iter().all(|&s| s == 0));
    }
}
