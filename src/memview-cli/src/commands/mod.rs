//! Command handlers for memview CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod configure;
pub mod copy;
pub mod view;

use anyhow::{Context, Result};
use memview::{CacheConfig, Codec, DumpFile, MemoryDataModel, MemoryModel};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::config::Config;
use crate::parse::parse_address;

/// Where a dump lives in the address space and how to render it
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub base: u64,
    pub codec: Codec,
    pub cache: CacheConfig,
}

impl ViewSettings {
    /// Command-line values win over the config file
    pub fn resolve(config: &Config, base: Option<&str>, codec: Option<Codec>) -> Result<Self> {
        let base = match base {
            Some(text) => parse_address(text)?,
            None => config.get_base_address()?.unwrap_or(0),
        };
        Ok(Self {
            base,
            codec: codec.unwrap_or_else(|| config.get_codec()),
            cache: config.cache.clone(),
        })
    }
}

/// Open a dump file and wrap it in a renderer
pub fn open_model(dump: &Path, maps: Option<&Path>, settings: &ViewSettings) -> Result<MemoryModel> {
    let source = match maps {
        Some(maps) => DumpFile::open_with_maps(dump, maps, settings.base)?,
        None => DumpFile::open(dump, settings.base)?,
    };
    let window = source
        .window()
        .with_context(|| format!("Dump file {} is empty or overflows the address space", dump.display()))?;

    tracing::debug!(
        "Viewing {} as {} at {:#x}..={:#x}",
        dump.display(),
        settings.codec,
        window.start,
        window.last
    );

    let runtime = Handle::try_current().context("No async runtime available")?;
    let data = MemoryDataModel::with_config(Arc::new(source), window, runtime, &settings.cache);
    Ok(MemoryModel::new(&data, settings.codec))
}
