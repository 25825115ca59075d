//! View command handler
//!
//! Renders rows of a dump to stdout as text or JSON.

use anyhow::{Context, Result};
use memview::{Codec, MemoryModel};
use std::ops::Range;
use std::path::Path;

use super::{open_model, ViewSettings};
use crate::config::Config;
use crate::parse::parse_rows;

/// Rows shown when no range is given
const DEFAULT_ROWS: u64 = 16;

/// Handle the view command
pub async fn handle(
    dump: &Path,
    maps: Option<&Path>,
    base: Option<&str>,
    codec: Option<Codec>,
    rows: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = Config::load()?;
    let settings = ViewSettings::resolve(&config, base, codec)?;
    let model = open_model(dump, maps, &settings)?;

    let rows = match rows {
        Some(text) => parse_rows(text)?,
        None => 0..DEFAULT_ROWS,
    };

    println!("{}", render(&model, rows, json).await?);
    Ok(())
}

/// Render `rows` as plain lines or a JSON array
pub async fn render(model: &MemoryModel, rows: Range<u64>, json: bool) -> Result<String> {
    let lines = model.load_lines(rows.start, rows.end).await;

    if json {
        serde_json::to_string_pretty(&lines).context("Failed to serialize rows")
    } else {
        Ok(lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
