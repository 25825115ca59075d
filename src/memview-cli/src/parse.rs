//! Argument parsing helpers

use anyhow::{bail, Context, Result};
use std::ops::Range;

/// Parse a hex (`0x` prefix) or decimal number
pub fn parse_address(text: &str) -> Result<u64> {
    let text = text.trim().replace('_', "");
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).with_context(|| format!("Invalid hex address: {}", text))
    } else {
        text.parse::<u64>()
            .with_context(|| format!("Invalid address: {}", text))
    }
}

/// Parse `START..END` or `START..` into a row range
pub fn parse_rows(text: &str) -> Result<Range<u64>> {
    let (start, end) = text
        .split_once("..")
        .with_context(|| format!("Expected START..END, got {:?}", text))?;

    let start = parse_address(start)?;
    let end = if end.trim().is_empty() {
        u64::MAX
    } else {
        parse_address(end)?
    };

    if end < start {
        bail!("Row range {:?} ends before it starts", text);
    }
    Ok(start..end)
}

/// Parse a `ROW:COL` text position
pub fn parse_point(text: &str) -> Result<(u64, usize)> {
    let (row, col) = text
        .split_once(':')
        .with_context(|| format!("Expected ROW:COL, got {:?}", text))?;

    let row = parse_address(row)?;
    let col = col
        .trim()
        .parse::<usize>()
        .with_context(|| format!("Invalid column: {}", col))?;
    Ok((row, col))
}
