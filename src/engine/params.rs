use crate::{
    filter::ParamId,
    io::sink::{OUTPUT_LEVEL_MAX, OUTPUT_LEVEL_MIN},
    MIDI_CHANNELS,
};

/// First per-channel instrument id (`'F' << 8`); channel `n` is this plus `n`.
pub const PARAM_INSTRUMENT: ParamId = (b'F' as ParamId) << 8;
/// Read-only bitmap of sounding voices.
pub const PARAM_PLAYING_CHANNEL_MAP: ParamId = PARAM_INSTRUMENT + MIDI_CHANNELS as ParamId;
/// Output attenuation, 0.1 dB units.
pub const PARAM_OUTPUT_LEVEL: ParamId = 0x0100;

/// The parameters the tone generator answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Instrument { channel: u8 },
    PlayingChannelMap,
    OutputLevel,
}

impl Param {
    pub fn from_id(id: ParamId) -> Option<Self> {
        match id {
            PARAM_PLAYING_CHANNEL_MAP => Some(Param::PlayingChannelMap),
            PARAM_OUTPUT_LEVEL => Some(Param::OutputLevel),
            id if (PARAM_INSTRUMENT..PARAM_PLAYING_CHANNEL_MAP).contains(&id) => {
                Some(Param::Instrument {
                    channel: (id - PARAM_INSTRUMENT) as u8,
                })
            }
            _ => None,
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, Param::PlayingChannelMap)
    }
}

#[inline]
pub fn clamp_output_level(level: i32) -> i32 {
    level.clamp(OUTPUT_LEVEL_MIN, OUTPUT_LEVEL_MAX)
}

/// Playing map as reported to the host: one bit per sounding voice slot, plus
/// bit `max_voices` while any drum key is down.
pub fn playing_channel_map(voice_map: u32, max_voices: usize, percussion_active: bool) -> i32 {
    let mut map = voice_map;
    if percussion_active {
        map |= 1 << max_voices;
    }
    map as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_ids_cover_all_channels() {
        assert_eq!(PARAM_INSTRUMENT, 0x4600);
        assert_eq!(PARAM_PLAYING_CHANNEL_MAP, 0x4610);

        for ch in 0..16u8 {
            let param = Param::from_id(0x4600 + ch as u16);
            assert_eq!(param, Some(Param::Instrument { channel: ch }));
        }
    }

    #[test]
    fn test_unknown_ids() {
        assert_eq!(Param::from_id(0x45FF), None);
        assert_eq!(Param::from_id(0x4611), None);
        assert_eq!(Param::from_id(0), None);
    }

    #[test]
    fn test_playing_map_is_read_only() {
        assert!(!Param::PlayingChannelMap.is_writable());
        assert!(Param::OutputLevel.is_writable());
        assert!(Param::Instrument { channel: 3 }.is_writable());
    }

    #[test]
    fn test_output_level_clamped() {
        assert_eq!(clamp_output_level(-5000), -1020);
        assert_eq!(clamp_output_level(500), 120);
        assert_eq!(clamp_output_level(-30), -30);
    }

    #[test]
    fn test_percussion_bit_sits_above_voices() {
        assert_eq!(playing_channel_map(0b101, 6, false), 0b101);
        assert_eq!(playing_channel_map(0b101, 6, true), 0b100_0101);
    }
}
