use anyhow::bail;
use clap::Args;

use tsynth_backend::WaveTableCache;

use super::common::EngineArgs;

#[derive(Args)]
pub struct BanksArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Decode every sample and report the ones that fail
    #[arg(long)]
    check: bool,
}

pub fn run(args: BanksArgs) -> anyhow::Result<()> {
    let config = args.engine.load_config()?;
    if config.sound_bank_dir.is_none() {
        bail!("no sound-bank directory; pass --banks or set sound_bank_dir");
    }

    let cache = WaveTableCache::from_config(&config)?;
    for bank in cache.sound_banks() {
        println!("{bank}");
        for name in cache.sound_names(&bank) {
            println!("  {name}");
        }
    }

    if args.check {
        let total: usize = cache.sound_banks().iter().map(|bank| cache.sound_names(bank).len()).sum();
        let loaded = cache.preload_samples();
        println!("{loaded} of {total} samples decoded");
    }
    Ok(())
}
