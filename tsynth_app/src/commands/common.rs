//! Options shared by the subcommands.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use tsynth_core::SynthConfig;

use crate::script::{self, ScriptEvent};

#[derive(Args, Clone)]
pub struct EngineArgs {
    /// Configuration file (JSON). Defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Sound-bank directory, overriding the configuration
    #[arg(long)]
    pub banks: Option<PathBuf>,

    /// Sample rate, overriding the configuration
    #[arg(long)]
    pub sample_rate: Option<f32>,
}

impl EngineArgs {
    pub fn load_config(&self) -> anyhow::Result<SynthConfig> {
        let mut config = match &self.config {
            Some(path) => SynthConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => SynthConfig::default(),
        };
        if let Some(dir) = &self.banks {
            config.sound_bank_dir = Some(dir.clone());
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Clone)]
pub struct ScoreArgs {
    /// Score file; the built-in demo plays when omitted
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Seconds to run. Defaults to the score's `end` plus a short tail
    #[arg(long)]
    pub seconds: Option<f64>,
}

impl ScoreArgs {
    pub fn load_score(&self) -> anyhow::Result<Vec<ScriptEvent>> {
        match &self.script {
            Some(path) => script::load(path),
            None => {
                info!("playing the built-in demo score");
                script::parse(script::DEMO)
            }
        }
    }
}

/// Run length: explicit, else the score's end plus a tail, else ten seconds.
pub fn run_seconds(requested: Option<f64>, score_end: Option<f64>) -> f64 {
    requested.unwrap_or_else(|| score_end.map_or(10.0, |end| end + 0.5))
}
