//! Dump File Memory Source
//!
//! Memory source backed by a raw memory image on disk, placed at a base
//! virtual address.

use super::{MemorySource, RawMemoryInfo};
use crate::error::{FetchError, FetchResult};
use crate::range::{AddressRange, ByteRange};

use anyhow::{Context, Result};
use futures::future::{self, BoxFuture, FutureExt};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Raw memory dump source
///
/// File offset 0 maps to `base_address`. Observed regions come from an
/// accompanying `.maps` file when one exists; otherwise every byte of the
/// file counts as observed.
pub struct DumpFile {
    /// Memory-mapped dump file
    mmap: Mmap,
    /// Virtual address of the first byte of the file
    base_address: u64,
    /// Regions whose bytes were observed
    observed: Vec<AddressRange>,
    /// Path to the dump file
    pub path: PathBuf,
}

impl DumpFile {
    /// Open a memory dump file at a base address
    ///
    /// Picks up `<dump>.maps` automatically when present.
    pub fn open<P: AsRef<Path>>(path: P, base_address: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let maps_path = path.with_extension("maps");
        if maps_path.exists() {
            return Self::open_with_maps(&path, &maps_path, base_address);
        }

        let mmap = Self::map(&path)?;
        let observed = AddressRange::with_len(base_address, mmap.len() as u64)
            .into_iter()
            .collect();

        tracing::debug!(
            "Opened dump file {:?} ({} bytes) at {:#x}",
            path,
            mmap.len(),
            base_address
        );

        Ok(DumpFile {
            mmap,
            base_address,
            observed,
            path,
        })
    }

    /// Open a dump with an explicit maps file
    pub fn open_with_maps<P: AsRef<Path>, M: AsRef<Path>>(
        dump_path: P,
        maps_path: M,
        base_address: u64,
    ) -> Result<Self> {
        let path = dump_path.as_ref().to_path_buf();
        let mmap = Self::map(&path)?;
        let observed = Self::parse_maps_file(maps_path.as_ref())?;

        tracing::debug!(
            "Opened dump file {:?} ({} bytes) at {:#x} with {} observed regions",
            path,
            mmap.len(),
            base_address,
            observed.len()
        );

        Ok(DumpFile {
            mmap,
            base_address,
            observed,
            path,
        })
    }

    fn map(path: &Path) -> Result<Mmap> {
        let file =
            File::open(path).with_context(|| format!("Failed to open dump file: {:?}", path))?;

        // SAFETY: the map is read-only; the file is expected to stay unchanged
        // while the viewer is open.
        unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to mmap dump file: {:?}", path))
    }

    /// Parse a maps file.
    ///
    /// Accepts `/proc/pid/maps` style lines (`start-end ...`, hex without
    /// prefix) and `0xSTART 0xEND` pairs. Ends are exclusive.
    fn parse_maps_file(path: &Path) -> Result<Vec<AddressRange>> {
        let file =
            File::open(path).with_context(|| format!("Failed to open maps file: {:?}", path))?;

        let reader = BufReader::new(file);
        let mut regions = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let region = Self::parse_maps_line(line)
                .with_context(|| format!("Invalid maps line {}: {:?}", number + 1, line))?;
            regions.extend(region);
        }

        Ok(regions)
    }

    fn parse_maps_line(line: &str) -> Result<Option<AddressRange>> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let (start, end) = if parts[0].starts_with("0x") {
            let end = parts.get(1).context("missing end address")?;
            (parts[0], *end)
        } else {
            parts[0].split_once('-').context("expected start-end")?
        };

        let parse = |s: &str| u64::from_str_radix(s.trim_start_matches("0x"), 16);
        let start = parse(start).context("bad start address")?;
        let end = parse(end).context("bad end address")?;

        Ok(end
            .checked_sub(start)
            .and_then(|len| AddressRange::with_len(start, len)))
    }

    /// The address window covered by the file
    pub fn window(&self) -> Option<AddressRange> {
        AddressRange::with_len(self.base_address, self.mmap.len() as u64)
    }

    pub fn observed_regions(&self) -> &[AddressRange] {
        &self.observed
    }

    fn read(&self, address: u64, count: u32) -> FetchResult<RawMemoryInfo> {
        let request = AddressRange::with_len(address, u64::from(count))
            .ok_or_else(|| FetchError::unavailable(format!("empty request at {:#x}", address)))?;
        let overlap = self
            .window()
            .and_then(|w| w.intersect(&request))
            .ok_or_else(|| {
                FetchError::unavailable(format!(
                    "{:#x}+{:#x} is outside {:?}",
                    address,
                    count,
                    self.path.file_name().unwrap_or_default()
                ))
            })?;

        let mut data = vec![0u8; count as usize];
        let file_start = (overlap.start - self.base_address) as usize;
        let data_start = (overlap.start - address) as usize;
        let len = overlap.last_offset() as usize + 1;
        data[data_start..data_start + len].copy_from_slice(&self.mmap[file_start..file_start + len]);

        let observed = self
            .observed
            .iter()
            .filter_map(|r| r.intersect(&overlap))
            .map(|r| ByteRange::new((r.start - address) as usize, r.last_offset() as usize + 1))
            .collect();

        Ok(RawMemoryInfo {
            data,
            observed,
            reads: Vec::new(),
            writes: Vec::new(),
        })
    }
}

impl MemorySource for DumpFile {
    fn fetch(&self, address: u64, count: u32) -> BoxFuture<'static, FetchResult<RawMemoryInfo>> {
        future::ready(self.read(address, count)).boxed()
    }
}
