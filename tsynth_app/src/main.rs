//! tsynth - polyphonic wavetable synth driven by a scripted control surface.

mod commands;
mod script;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tsynth")]
#[command(author, version, about = "Polyphonic wavetable synth", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a score to a WAV file
    Render(commands::render::RenderArgs),

    /// Play a score through the default output device
    #[cfg(feature = "device")]
    Play(commands::play::PlayArgs),

    /// List sound banks and their samples
    Banks(commands::banks::BanksArgs),

    /// Print the effective configuration as JSON
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        #[cfg(feature = "device")]
        Commands::Play(args) => commands::play::run(args),
        Commands::Banks(args) => commands::banks::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
