//! Data models for the versioned file registry.

mod file;
mod storage;

pub use file::*;
pub use storage::*;
