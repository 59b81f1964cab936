//! Where mixed blocks go.
//!
//! The engine only needs two things from the audio output: how much room is
//! left (back-pressure) and a place to put a finished block. The device
//! driver behind it is someone else's problem.

#[cfg(feature = "rtrb")]
use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

/// Lowest accepted output level, in 0.1 dB.
pub const OUTPUT_LEVEL_MIN: i32 = -1020;
/// Highest accepted output level, in 0.1 dB.
pub const OUTPUT_LEVEL_MAX: i32 = 120;

/// Audio output collaborator.
///
/// Blocks are interleaved stereo i16; lengths and capacities count samples.
pub trait OutputSink {
    /// Samples `channel` can accept right now without blocking.
    fn writable_samples(&self, channel: usize) -> usize;

    /// Write `pcm` to `channel`, returning how many samples were accepted.
    fn write(&mut self, channel: usize, pcm: &[i16]) -> usize;

    /// Output attenuation in 0.1 dB, already clamped by the engine.
    ///
    /// Default implementation ignores the level.
    fn set_output_level(&mut self, _level: i32) {}
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn writable_samples(&self, channel: usize) -> usize {
        (**self).writable_samples(channel)
    }

    fn write(&mut self, channel: usize, pcm: &[i16]) -> usize {
        (**self).write(channel, pcm)
    }

    fn set_output_level(&mut self, level: i32) {
        (**self).set_output_level(level)
    }
}

/// Linear gain for an output level in 0.1 dB.
#[inline]
pub fn level_to_gain(level: i32) -> f32 {
    10f32.powf(level as f32 / 200.0)
}

/// Create a lock-free sink/source pair holding `capacity` samples.
///
/// The sink side lives with the engine on the control thread; the source side
/// goes into the audio device callback.
#[cfg(feature = "rtrb")]
pub fn ring_pair(capacity: usize) -> (RingSink, RingSource) {
    let (producer, consumer) = RingBuffer::<i16>::new(capacity);
    let level = Arc::new(AtomicI32::new(0));

    (
        RingSink {
            producer,
            level: level.clone(),
        },
        RingSource {
            consumer,
            level,
            underruns: 0,
        },
    )
}

/// Producer half of [`ring_pair`]. Only channel 0 exists.
#[cfg(feature = "rtrb")]
pub struct RingSink {
    producer: Producer<i16>,
    level: Arc<AtomicI32>,
}

#[cfg(feature = "rtrb")]
impl OutputSink for RingSink {
    fn writable_samples(&self, channel: usize) -> usize {
        if channel == 0 {
            self.producer.slots()
        } else {
            0
        }
    }

    fn write(&mut self, channel: usize, pcm: &[i16]) -> usize {
        if channel != 0 {
            return 0;
        }

        let n = pcm.len().min(self.producer.slots());
        let Ok(chunk) = self.producer.write_chunk_uninit(n) else {
            return 0;
        };
        let written = chunk.fill_from_iter(pcm[..n].iter().copied());
        debug_assert_eq!(written, n);
        written
    }

    fn set_output_level(&mut self, level: i32) {
        self.level.store(level, Ordering::Relaxed);
    }
}

/// Consumer half of [`ring_pair`], for the audio callback.
#[cfg(feature = "rtrb")]
pub struct RingSource {
    consumer: Consumer<i16>,
    level: Arc<AtomicI32>,
    underruns: u64,
}

#[cfg(feature = "rtrb")]
impl RingSource {
    /// Fill an interleaved f32 device buffer with `channels` channels.
    ///
    /// Stereo input frames are spread over the device channels (left to even
    /// channels, right to odd). Missing samples become silence.
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        let gain = level_to_gain(self.level.load(Ordering::Relaxed)) / i16::MAX as f32;
        let channels = channels.max(1);
        let mut starved = false;

        for frame in data.chunks_mut(channels) {
            let left = self.consumer.pop().unwrap_or_else(|_| {
                starved = true;
                0
            });
            let right = self.consumer.pop().unwrap_or(left);

            for (ch, out) in frame.iter_mut().enumerate() {
                let sample = if ch % 2 == 0 { left } else { right };
                *out = sample as f32 * gain;
            }
        }

        if starved {
            self.underruns += 1;
        }
    }

    /// Callbacks that ran out of samples.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_to_gain() {
        assert!((level_to_gain(0) - 1.0).abs() < 1e-6);
        assert!((level_to_gain(-200) - 0.1).abs() < 1e-6);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_ring_sink_back_pressure() {
        let (mut sink, _source) = ring_pair(8);

        assert_eq!(sink.writable_samples(0), 8);
        assert_eq!(sink.writable_samples(1), 0);
        assert_eq!(sink.write(0, &[1, 2, 3, 4, 5, 6]), 6);
        assert_eq!(sink.writable_samples(0), 2);
        assert_eq!(sink.write(0, &[7, 8, 9]), 2);
        assert_eq!(sink.writable_samples(0), 0);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_ring_source_spreads_stereo_and_pads_silence() {
        let (mut sink, mut source) = ring_pair(16);
        sink.write(0, &[i16::MAX, 0, 0, i16::MAX]);

        let mut data = [9.0f32; 6];
        source.fill(&mut data, 2);

        let expected = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        for (got, want) in data.iter().zip(expected) {
            assert!((got - want).abs() < 1e-4, "{data:?}");
        }
        assert_eq!(source.underruns(), 1);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_output_level_reaches_source() {
        let (mut sink, mut source) = ring_pair(4);
        sink.set_output_level(-200);
        sink.write(0, &[i16::MAX, i16::MAX]);

        let mut data = [0.0f32; 2];
        source.fill(&mut data, 2);

        assert!((data[0] - 0.1).abs() < 1e-4);
    }
}
