//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up memview defaults.

use crate::config::Config;
use crate::parse::parse_address;
use anyhow::{bail, Result};
use memview::Codec;

const MIB: u64 = 1024 * 1024;

/// Handle the configure command
///
/// # Arguments
/// * `codec` - Optional default codec
/// * `base` - Optional default base address
/// * `cache_mb` - Optional page cache budget in MiB
/// * `show` - If true, show current configuration
pub fn handle(
    codec: Option<Codec>,
    base: Option<String>,
    cache_mb: Option<u64>,
    show: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config)?;
        return Ok(());
    }

    if codec.is_none() && base.is_none() && cache_mb.is_none() {
        show_usage();
        return Ok(());
    }

    apply(&mut config, codec, base.as_deref(), cache_mb)?;
    config.save()?;

    println!("Configuration updated");
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

/// Apply the requested changes to `config`
fn apply(
    config: &mut Config,
    codec: Option<Codec>,
    base: Option<&str>,
    cache_mb: Option<u64>,
) -> Result<()> {
    if let Some(codec) = codec {
        config.codec = Some(codec);
    }

    if let Some(base) = base {
        config.set_base_address(parse_address(base)?);
    }

    if let Some(mb) = cache_mb {
        if mb == 0 {
            bail!("Cache budget must be at least 1 MiB");
        }
        config.cache.budget_bytes = mb.saturating_mul(MIB);
    }

    Ok(())
}

/// Display current configuration
fn show_config(config: &Config) -> Result<()> {
    println!("Codec: {}", config.get_codec());

    match config.get_base_address()? {
        Some(base) => println!("Base address: {:#x}", base),
        None => println!("Base address: 0x0 (default)"),
    }

    println!(
        "Cache budget: {} MiB ({} pages)",
        config.cache.budget_bytes / MIB,
        config.cache.page_budget()
    );
    println!(
        "Error log interval: {}s",
        config.cache.error_log_interval_secs
    );

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }

    Ok(())
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: memview configure --codec int32 --base 0x7f0000000000");
    println!("   or: memview configure --cache-mb 128");
    println!("   or: memview configure --show");
}
