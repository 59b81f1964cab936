use std::{
    thread,
    time::{Duration, Instant},
};

use rtrb::Producer;
use tracing::debug;

use fmtg::SynthMessage;

const LEAD: u8 = 0;
const BASS: u8 = 1;
const DRUMS: u8 = 9;

const ARPEGGIO: [u8; 8] = [60, 63, 67, 72, 70, 67, 63, 58];
const BASSLINE: [u8; 2] = [36, 43];

const KICK: u8 = 36;
const SNARE: u8 = 38;
const HIHAT: u8 = 42;

/// Steps of one bar, sixteenth notes.
const STEPS: usize = 16;

/// Drive a looping arpeggio, bass line and drum beat until `duration` has
/// passed. Messages that do not fit in the ring are dropped.
pub fn play(mut tx: Producer<SynthMessage>, bpm: f32, duration: Duration) {
    let step = Duration::from_secs_f32(60.0 / bpm.max(1.0) / 4.0);
    let start = Instant::now();
    let mut held: Vec<(u8, u8)> = Vec::new();
    let mut n = 0usize;

    // Lead on a brighter instrument than the bass.
    send(
        &mut tx,
        SynthMessage::SetInstrument {
            channel: LEAD,
            instrument: 3,
        },
    );
    send(
        &mut tx,
        SynthMessage::SetInstrument {
            channel: BASS,
            instrument: 15,
        },
    );

    while start.elapsed() < duration {
        for (note, channel) in held.drain(..) {
            send(
                &mut tx,
                SynthMessage::NoteOff {
                    note,
                    velocity: 0,
                    channel,
                },
            );
        }

        let beat = n % STEPS;
        let mut hit = |note: u8, velocity: u8, channel: u8| {
            send(
                &mut tx,
                SynthMessage::NoteOn {
                    note,
                    velocity,
                    channel,
                },
            );
            (note, channel)
        };

        held.push(hit(ARPEGGIO[n % ARPEGGIO.len()], 96, LEAD));
        if beat % 8 == 0 {
            held.push(hit(BASSLINE[(n / 8) % BASSLINE.len()], 110, BASS));
        }
        if beat % 4 == 0 {
            held.push(hit(KICK, 127, DRUMS));
        }
        if beat % 8 == 4 {
            held.push(hit(SNARE, 100, DRUMS));
        }
        if beat % 2 == 0 {
            held.push(hit(HIHAT, 70, DRUMS));
        }

        n += 1;
        thread::sleep(step);
    }

    for (note, channel) in held.drain(..) {
        send(
            &mut tx,
            SynthMessage::NoteOff {
                note,
                velocity: 0,
                channel,
            },
        );
    }
    debug!(steps = n, "pattern finished");
}

fn send(tx: &mut Producer<SynthMessage>, message: SynthMessage) {
    if tx.push(message).is_err() {
        debug!(?message, "message ring full, dropping");
    }
}
