use anyhow::Context;
use tessera::AppSettings;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let settings = AppSettings::from_env();
    log::info!("Loading assets from {}", settings.asset_dir.display());

    tessera::run(settings).context("renderer failed to start")?;
    Ok(())
}
