use crate::{filter::Filter, io::midi::MidiEvent, synth::message::SynthMessage};

/// Translate a MIDI event into an engine message.
///
/// Note-on with velocity 0 is a note-off. Program changes select the
/// channel's instrument. Everything else has no meaning for the tone
/// generator and maps to `None`.
pub fn midi_to_synth(midi: MidiEvent) -> Option<SynthMessage> {
    match midi {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity: 0,
        } => Some(SynthMessage::NoteOff {
            note: key,
            velocity: 0,
            channel,
        }),
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } => Some(SynthMessage::NoteOn {
            note: key,
            velocity,
            channel,
        }),
        MidiEvent::NoteOff {
            channel,
            key,
            velocity,
        } => Some(SynthMessage::NoteOff {
            note: key,
            velocity,
            channel,
        }),
        MidiEvent::ProgramChange { channel, program } => Some(SynthMessage::SetInstrument {
            channel,
            instrument: program,
        }),
        MidiEvent::ControlChange { .. } | MidiEvent::PitchBend { .. } => None,
    }
}

/// Forward a MIDI note event straight into a [`Filter`].
///
/// Returns whatever the filter returned, or `false` for events a filter has
/// no entry point for.
pub fn dispatch_midi(midi: MidiEvent, filter: &mut impl Filter) -> bool {
    match midi_to_synth(midi) {
        Some(SynthMessage::NoteOn {
            note,
            velocity,
            channel,
        }) => filter.note_on(note, velocity, channel),
        Some(SynthMessage::NoteOff {
            note,
            velocity,
            channel,
        }) => filter.note_off(note, velocity, channel),
        Some(SynthMessage::SetInstrument { .. }) | None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(bool, u8, u8, u8)>,
    }

    impl Filter for Recorder {
        fn note_on(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
            self.events.push((true, note, velocity, channel));
            true
        }

        fn note_off(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
            self.events.push((false, note, velocity, channel));
            true
        }
    }

    #[test]
    fn test_note_on_keeps_channel() {
        let msg = midi_to_synth(MidiEvent::NoteOn {
            channel: 3,
            key: 60,
            velocity: 90,
        });
        assert_eq!(
            msg,
            Some(SynthMessage::NoteOn {
                note: 60,
                velocity: 90,
                channel: 3
            })
        );
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        let msg = midi_to_synth(MidiEvent::NoteOn {
            channel: 0,
            key: 64,
            velocity: 0,
        });
        assert!(matches!(msg, Some(SynthMessage::NoteOff { note: 64, .. })));
    }

    #[test]
    fn test_program_change_selects_instrument() {
        let msg = midi_to_synth(MidiEvent::ProgramChange {
            channel: 2,
            program: 7,
        });
        assert_eq!(
            msg,
            Some(SynthMessage::SetInstrument {
                channel: 2,
                instrument: 7
            })
        );
    }

    #[test]
    fn test_controllers_are_ignored() {
        assert_eq!(
            midi_to_synth(MidiEvent::PitchBend {
                channel: 0,
                value: 100
            }),
            None
        );
    }

    #[test]
    fn test_dispatch_midi_routes_to_filter() {
        let mut rec = Recorder::default();

        assert!(dispatch_midi(
            MidiEvent::NoteOn {
                channel: 1,
                key: 60,
                velocity: 80
            },
            &mut rec
        ));
        assert!(dispatch_midi(
            MidiEvent::NoteOn {
                channel: 1,
                key: 60,
                velocity: 0
            },
            &mut rec
        ));
        assert!(!dispatch_midi(
            MidiEvent::ControlChange {
                channel: 1,
                controller: 7,
                value: 100
            },
            &mut rec
        ));

        assert_eq!(rec.events, vec![(true, 60, 80, 1), (false, 60, 0, 1)]);
    }
}
