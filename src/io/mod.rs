// Purpose - the engine's edges: MIDI events in, PCM blocks out

pub mod converter;
pub mod midi;
pub mod sink;
