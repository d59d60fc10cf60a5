use clap::Parser;
use hsi_sr_train::cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    Cli::parse().run()?;
    Ok(())
}
