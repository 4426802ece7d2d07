//! Offline rendering to a WAV file.
//!
//! The render loop is paced against the wall clock so the control thread
//! and the score see the same time the audio does.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use tsynth_backend::Engine;
use tsynth_backend::rt_processing::callback::CHANNELS;

use super::common::{EngineArgs, ScoreArgs, run_seconds};
use crate::script::ScriptedSurface;

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    score: ScoreArgs,

    /// Output WAV file
    #[arg(short, long, default_value = "tsynth.wav")]
    output: PathBuf,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let config = args.engine.load_config()?;
    let surface = ScriptedSurface::new(args.score.load_score()?);
    let seconds = run_seconds(args.score.seconds, surface.duration());

    let mut engine = Engine::build(&config)?;
    let context = Arc::clone(engine.context());

    let spec = WavSpec {
        channels: CHANNELS as u16,
        sample_rate: config.sample_rate as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer =
        WavWriter::create(&args.output, spec).with_context(|| format!("creating {}", args.output.display()))?;

    let control = engine.spawn_control(surface)?;
    let total_frames = (seconds * config.sample_rate as f64).ceil() as u64;
    let mut buffer = vec![0.0f32; config.buffer_frames * CHANNELS];
    let started = Instant::now();

    while context.frames_rendered() < total_frames {
        let ahead = context.stream_time() - started.elapsed().as_secs_f64();
        if ahead > 0.0 {
            thread::sleep(Duration::from_secs_f64(ahead));
        }

        engine.controller_mut().render_next(&mut buffer, &context);
        for sample in &buffer {
            writer.write_sample(*sample)?;
        }
    }

    control.shutdown();
    writer.finalize()?;

    let stats = context.stats();
    let timing = context.timer().snapshot();
    info!(
        path = %args.output.display(),
        seconds = context.stream_time(),
        dropped_notes = stats.dropped_notes,
        queue_overflows = stats.queue_overflows,
        configuration_faults = stats.configuration_faults,
        max_callback_us = timing.max_callback_nanos.unwrap_or(0) / 1_000,
        load_percent = timing.load_percent,
        "render finished"
    );
    Ok(())
}
