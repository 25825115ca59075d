//! Copy command handler
//!
//! Prints what a drag selection over the rendered rows would put on the
//! clipboard.

use anyhow::{Context, Result};
use memview::{Codec, ColumnKind, MemoryModel, Selection};
use std::path::Path;

use super::{open_model, ViewSettings};
use crate::cli::Group;
use crate::config::Config;
use crate::parse::parse_point;

/// Handle the copy command
pub async fn handle(
    dump: &Path,
    maps: Option<&Path>,
    base: Option<&str>,
    codec: Option<Codec>,
    group: Group,
    from: &str,
    to: &str,
) -> Result<()> {
    let config = Config::load()?;
    let settings = ViewSettings::resolve(&config, base, codec)?;
    let model = open_model(dump, maps, &settings)?;

    let text = copy_text(&model, group.into(), parse_point(from)?, parse_point(to)?).await?;
    println!("{}", text);
    Ok(())
}

/// Clipboard text for the selection between two `(row, col)` points
pub async fn copy_text(
    model: &MemoryModel,
    kind: ColumnKind,
    from: (u64, usize),
    to: (u64, usize),
) -> Result<String> {
    let column = model
        .columns()
        .iter()
        .find(|column| column.kind == kind)
        .copied()
        .with_context(|| format!("The {} codec has no {:?} column", model.codec(), kind))?;

    let selection = Selection::new(column, from, to);
    let payloads = model.get_copy_data(&selection).await;

    Ok(payloads
        .into_iter()
        .map(|payload| payload.text)
        .collect::<Vec<_>>()
        .join("\n"))
}
