//! fmtg - play a short scripted arrangement through the tone generator
//!
//! Run with: cargo run --bin fmtg -- --bpm 132

mod pattern;

use std::{
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fmtg::{
    io::sink::ring_pair, EngineConfig, Filter, FmToneGenerator, SquareChip, SynthMessage,
    WorkerLayout,
};
use rtrb::RingBuffer;
use tracing::info;

/// Blocks of headroom in the device ring.
const RING_BLOCKS: usize = 8;

#[derive(Debug, Parser)]
#[command(name = "fmtg", about = "Polyphonic FM tone generator demo")]
struct Args {
    /// Melodic voice pool size
    #[arg(long, default_value_t = 6)]
    voices: usize,

    /// Voice slots per synthesis worker
    #[arg(long, default_value_t = 3)]
    voices_per_worker: usize,

    /// Play channel 10 as melodic notes instead of drums
    #[arg(long)]
    no_percussion: bool,

    /// Tempo of the scripted pattern
    #[arg(long, default_value_t = 120.0)]
    bpm: f32,

    /// How long to play, in seconds
    #[arg(long, default_value_t = 8)]
    seconds: u64,

    /// Output level in 0.1 dB (-1020 to 120)
    #[arg(long, default_value_t = -60, allow_hyphen_values = true)]
    level: i32,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // --- Set up CPAL ---
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    info!(sample_rate, channels, "output device ready");

    // --- Engine ---
    let engine_config = EngineConfig::default()
        .sample_rate(sample_rate)
        .voices(args.voices, args.voices_per_worker)
        .percussion(!args.no_percussion);

    let (sink, mut source) = ring_pair(engine_config.samples_per_block() * RING_BLOCKS);
    let factory = |layout: &WorkerLayout| SquareChip::new(layout);
    let mut synth = FmToneGenerator::new(engine_config, factory, sink)
        .wrap_err("invalid engine configuration")?;

    synth.set_param(fmtg::engine::params::PARAM_OUTPUT_LEVEL, args.level);
    if !synth.begin() {
        return Err(eyre!("failed to start synthesis workers"));
    }

    // --- Audio callback ---
    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| source.fill(data, channels),
            move |err| tracing::error!("stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")?;
    stream.play().wrap_err("failed to start output stream")?;

    // --- Pattern driver ---
    let (tx, mut rx) = RingBuffer::<SynthMessage>::new(64);
    let duration = Duration::from_secs(args.seconds);
    let driver = thread::spawn({
        let bpm = args.bpm;
        move || pattern::play(tx, bpm, duration)
    });

    // --- Control loop ---
    let start = Instant::now();
    while start.elapsed() < duration + Duration::from_millis(500) {
        synth.drain_messages(&mut rx);
        synth.update();
        thread::sleep(Duration::from_millis(1));
    }

    driver
        .join()
        .map_err(|_| eyre!("pattern driver panicked"))?;
    info!(
        ticks = synth.coordinator().map_or(0, |c| c.ticks()),
        "done"
    );
    Ok(())
}
