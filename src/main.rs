use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = milky_viz::config::Config::parse();
    if cfg.list_devices {
        milky_viz::audio::list_input_devices()?;
        return Ok(());
    }

    milky_viz::app::run(cfg)
}
