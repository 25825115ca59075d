//! # memview
//!
//! Paged memory inspection engine - sparse memory fetch, caching, and
//! fixed-width text rendering.
//!
//! This library provides functionality to:
//! - Fetch arbitrary byte ranges from a slow or remote memory source in
//!   fixed pages, sharing in-flight fetches and caching results
//! - Track which bytes were actually observed, read, or written
//! - Render memory as hex bytes, integers, or floats, 16 bytes per row
//! - Map byte ranges to on-screen selections for highlighting and copy
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use memview::{Codec, DumpFile, MemoryDataModel, MemoryModel};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dump = DumpFile::open("heap.bin", 0x7f00_0000_0000)?;
//! let window = dump.window().ok_or_else(|| anyhow::anyhow!("empty dump"))?;
//!
//! let data = MemoryDataModel::new(Arc::new(dump), window, tokio::runtime::Handle::current());
//! let model = MemoryModel::new(&data, Codec::Int32);
//!
//! for line in model.load_lines(0, 4).await {
//!     println!("{}", line.text);
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod config;
pub mod error;
mod log_limit;
pub mod model;
mod paged;
pub mod range;
pub mod segment;
pub mod source;
pub mod task;

#[doc(inline)]
pub use cache::PAGE_SIZE;
#[doc(inline)]
pub use config::CacheConfig;
#[doc(inline)]
pub use error::{FetchError, FetchResult, FetchState};
#[doc(inline)]
pub use model::{
    Codec, ColumnKind, ColumnRange, LoadMessage, LoadSink, MemoryModel, Selection, TextLine,
    TextPayload, BYTES_PER_ROW,
};
#[doc(inline)]
pub use paged::{MemoryDataModel, Prefetch};
#[doc(inline)]
pub use range::{AddressRange, ByteKnowledge, ByteRange};
#[doc(inline)]
pub use segment::MemorySegment;
#[doc(inline)]
pub use source::{DumpFile, MemorySource, RawMemoryInfo};
#[doc(inline)]
pub use task::FetchTask;
