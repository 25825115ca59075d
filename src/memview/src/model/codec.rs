//! Value codecs: how the bytes of one row turn into text.
//!
//! The byte codec renders hex pairs followed by an ASCII column. The
//! numeric codecs render fixed-width little-endian items: integers as
//! zero-padded hex, floats in shortest round-trip decimal, switching to
//! scientific notation outside `[1e-3, 1e7)`.

use super::layout::{ASCII_SEPARATOR, BYTES_PER_ROW};
use crate::segment::MemorySegment;
use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write;
use std::str::FromStr;

const ROW: usize = BYTES_PER_ROW as usize;

/// Glyph for a byte or item whose value was not observed
pub const UNKNOWN_GLYPH: char = '?';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    Bytes,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
}

impl Codec {
    pub const ALL: [Codec; 7] = [
        Codec::Bytes,
        Codec::Int16,
        Codec::Int32,
        Codec::Int64,
        Codec::Float16,
        Codec::Float32,
        Codec::Float64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Codec::Bytes => "bytes",
            Codec::Int16 => "int16",
            Codec::Int32 => "int32",
            Codec::Int64 => "int64",
            Codec::Float16 => "float16",
            Codec::Float32 => "float32",
            Codec::Float64 => "float64",
        }
    }

    /// Bytes per item, also the alignment the codec needs
    pub fn item_size(self) -> usize {
        match self {
            Codec::Bytes => 1,
            Codec::Int16 | Codec::Float16 => 2,
            Codec::Int32 | Codec::Float32 => 4,
            Codec::Int64 | Codec::Float64 => 8,
        }
    }

    /// Text width of one item
    pub fn item_chars(self) -> usize {
        match self {
            Codec::Bytes | Codec::Int16 | Codec::Int32 | Codec::Int64 => 2 * self.item_size(),
            Codec::Float16 | Codec::Float32 => 15,
            Codec::Float64 => 24,
        }
    }

    pub fn items_per_row(self) -> usize {
        ROW / self.item_size()
    }

    /// Append the text of one row (everything after the address) to `out`.
    /// `row` holds at most one row of bytes; missing bytes render blank.
    pub(crate) fn write_row(self, out: &mut String, row: &MemorySegment) {
        if self == Codec::Bytes {
            write_bytes(out, row);
            return;
        }

        let size = self.item_size();
        let width = self.item_chars();
        for item in 0..self.items_per_row() {
            if item > 0 {
                out.push(' ');
            }
            let start = item * size;
            if start >= row.len() {
                pad(out, ' ', width);
            } else if !row.is_range_known(start, size) {
                pad(out, UNKNOWN_GLYPH, width);
            } else {
                let text = self.format_item(row, start);
                let _ = write!(out, "{:>width$}", text, width = width);
            }
        }
    }

    fn format_item(self, row: &MemorySegment, start: usize) -> String {
        match self {
            Codec::Int16 => row.read_u16(start).map(|v| format!("{:04x}", v)),
            Codec::Int32 => row.read_u32(start).map(|v| format!("{:08x}", v)),
            Codec::Int64 => row.read_u64(start).map(|v| format!("{:016x}", v)),
            Codec::Float16 => row
                .read_u16(start)
                .map(|bits| format_f32(f16::from_bits(bits).to_f32())),
            Codec::Float32 => row.read_u32(start).map(|bits| format_f32(f32::from_bits(bits))),
            Codec::Float64 => row.read_u64(start).map(|bits| format_f64(f64::from_bits(bits))),
            Codec::Bytes => row.get(start).map(|b| format!("{:02x}", b.value)),
        }
        .unwrap_or_else(|| UNKNOWN_GLYPH.to_string().repeat(self.item_chars()))
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Codec::ALL
            .into_iter()
            .find(|codec| codec.name() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Codec::ALL.iter().map(|c| c.name()).collect();
                format!("unknown codec '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

fn pad(out: &mut String, c: char, count: usize) {
    out.extend(std::iter::repeat_n(c, count));
}

fn write_bytes(out: &mut String, row: &MemorySegment) {
    for index in 0..ROW {
        match row.get(index) {
            Some(b) if b.known => {
                let _ = write!(out, "{:02x}", b.value);
            }
            Some(_) => pad(out, UNKNOWN_GLYPH, 2),
            None => pad(out, ' ', 2),
        }
        out.push(' ');
    }
    out.push_str(ASCII_SEPARATOR);
    for index in 0..ROW {
        out.push(row.get(index).map_or(' ', |b| ascii_char(b.value)));
    }
}

/// Printable ASCII as itself, everything else as a dot
pub fn ascii_char(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

pub fn format_f32(value: f32) -> String {
    canonical_float(
        f64::from(value),
        || value.to_string(),
        || format!("{:e}", value),
    )
}

pub fn format_f64(value: f64) -> String {
    canonical_float(value, || value.to_string(), || format!("{:e}", value))
}

/// Shortest round-trip decimal with at least one fractional digit.
/// Magnitudes outside `[1e-3, 1e7)` use `d.dddE±n`.
fn canonical_float<P, S>(value: f64, plain: P, scientific: S) -> String
where
    P: FnOnce() -> String,
    S: FnOnce() -> String,
{
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    if (1e-3..1e7).contains(&value.abs()) {
        let text = plain();
        return if text.contains('.') {
            text
        } else {
            text + ".0"
        };
    }

    let text = scientific();
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{}E{}", mantissa, exponent)
    } else {
        format!("{}.0E{}", mantissa, exponent)
    }
}
