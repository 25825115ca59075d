//! Core CLI definitions

use clap::{Parser, Subcommand, ValueEnum};
use memview::{Codec, ColumnKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memview")]
#[command(about = "Memory viewer for raw memory dumps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render rows of a memory dump
    #[command(visible_alias = "v")]
    View {
        /// Path to the raw memory dump
        dump: PathBuf,

        /// Path to maps file for the dump (defaults to <dump>.maps when present)
        #[arg(long)]
        maps: Option<PathBuf>,

        /// Address of the first byte of the dump (hex with 0x, or decimal)
        #[arg(short, long)]
        base: Option<String>,

        /// Value codec (bytes, int16, int32, int64, float16, float32, float64)
        #[arg(short, long)]
        codec: Option<Codec>,

        /// Rows to render, as START..END or START.. (default: the first 16)
        #[arg(short, long)]
        rows: Option<String>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the clipboard text for a selection
    Copy {
        /// Path to the raw memory dump
        dump: PathBuf,

        /// Path to maps file for the dump (defaults to <dump>.maps when present)
        #[arg(long)]
        maps: Option<PathBuf>,

        /// Address of the first byte of the dump (hex with 0x, or decimal)
        #[arg(short, long)]
        base: Option<String>,

        /// Value codec
        #[arg(short, long)]
        codec: Option<Codec>,

        /// Column group to copy from
        #[arg(short, long, value_enum)]
        group: Group,

        /// Selection start as ROW:COL
        #[arg(long)]
        from: String,

        /// Selection end as ROW:COL (column exclusive)
        #[arg(long)]
        to: String,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Set default codec
        #[arg(long)]
        codec: Option<Codec>,

        /// Set default base address
        #[arg(long)]
        base: Option<String>,

        /// Set the page cache budget in MiB
        #[arg(long)]
        cache_mb: Option<u64>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

/// Column group selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Group {
    Address,
    Hex,
    Ascii,
    Values,
}

impl From<Group> for ColumnKind {
    fn from(group: Group) -> Self {
        match group {
            Group::Address => ColumnKind::Address,
            Group::Hex => ColumnKind::Hex,
            Group::Ascii => ColumnKind::Ascii,
            Group::Values => ColumnKind::Values,
        }
    }
}
