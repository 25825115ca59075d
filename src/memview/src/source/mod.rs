//! Memory Source Abstraction
//!
//! The fetch contract the engine consumes, plus concrete sources:
//! - Memory-mapped dump files via `DumpFile`
//! - Mock sources for testing

mod dump;
#[cfg(test)]
mod mock;
mod traits;

pub use dump::DumpFile;
pub use traits::{MemorySource, RawMemoryInfo};

#[cfg(test)]
pub use mock::MockMemorySource;
