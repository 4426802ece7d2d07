use clap::Args;

use super::common::EngineArgs;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    engine: EngineArgs,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let config = args.engine.load_config()?;
    println!("{}", config.to_json()?);
    Ok(())
}
