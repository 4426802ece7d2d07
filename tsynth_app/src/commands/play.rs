//! Live playback through cpal.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Args;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};
use tracing::{error, info, warn};

use tsynth_backend::Engine;
use tsynth_backend::rt_processing::callback::CHANNELS;
use tsynth_core::SynthConfig;

use super::common::{EngineArgs, ScoreArgs, run_seconds};
use crate::script::ScriptedSurface;

#[derive(Args)]
pub struct PlayArgs {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    score: ScoreArgs,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let name = device.name().unwrap_or_else(|_| "unknown".into());

    let mut config = args.engine.load_config()?;
    let stream_config = negotiate(&device, &config)?;
    if stream_config.sample_rate.0 as f32 != config.sample_rate {
        warn!(
            requested = config.sample_rate,
            actual = stream_config.sample_rate.0,
            "device does not support the configured rate"
        );
        config.sample_rate = stream_config.sample_rate.0 as f32;
    }
    info!(device = %name, rate = stream_config.sample_rate.0, buffer = ?stream_config.buffer_size, "output stream");

    let surface = ScriptedSurface::new(args.score.load_score()?);
    let seconds = run_seconds(args.score.seconds, surface.duration());

    let engine = Engine::build(&config)?;
    let control = engine.spawn_control(surface)?;
    let (mut controller, context, _cache) = engine.into_parts();

    let callback_context = Arc::clone(&context);
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            controller.render_next(data, &callback_context);
        },
        |err| error!(error = %err, "output stream error"),
        None,
    )?;
    stream.play()?;

    let started = Instant::now();
    while started.elapsed().as_secs_f64() < seconds {
        thread::sleep(Duration::from_millis(20));
    }

    drop(stream);
    control.shutdown();

    let stats = context.stats();
    let timing = context.timer().snapshot();
    info!(
        seconds = context.stream_time(),
        dropped_notes = stats.dropped_notes,
        callbacks = timing.callback_count,
        load_percent = timing.load_percent,
        "playback finished"
    );
    Ok(())
}

/// Stereo `f32` at the configured rate if the device offers it, else the
/// device default when that is stereo `f32`.
fn negotiate(device: &cpal::Device, config: &SynthConfig) -> anyhow::Result<StreamConfig> {
    let rate = SampleRate(config.sample_rate as u32);
    let wanted = device.supported_output_configs()?.find(|range| {
        range.channels() as usize == CHANNELS
            && range.sample_format() == SampleFormat::F32
            && range.min_sample_rate() <= rate
            && rate <= range.max_sample_rate()
    });

    let supported = match wanted {
        Some(range) => range.with_sample_rate(rate),
        None => {
            let fallback = device.default_output_config()?;
            if fallback.channels() as usize != CHANNELS || fallback.sample_format() != SampleFormat::F32 {
                bail!(
                    "device offers no stereo f32 output (default is {}ch {:?})",
                    fallback.channels(),
                    fallback.sample_format()
                );
            }
            fallback
        }
    };

    let frames = config.buffer_frames as u32;
    let buffer_size = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&frames) => BufferSize::Fixed(frames),
        _ => BufferSize::Default,
    };

    Ok(StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size,
    })
}
