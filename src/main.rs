//! xtask - builds and packs the microdragon kernel.
//!
//! - `build` compiles the kernel for the selected bootloader and architecture
//! - `pack` builds, stages `disk/` and creates a hybrid BIOS/UEFI ISO

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use microdragon_xtask::cli;
use microdragon_xtask::config::Config;
use microdragon_xtask::registry::Registries;

fn main() -> Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    let registries = Registries::global()?;
    let matches = cli::command(registries).get_matches();
    let config = Config::load().context("Failed to determine the workspace directory")?;

    cli::dispatch(registries, &matches, config)?;
    Ok(())
}
