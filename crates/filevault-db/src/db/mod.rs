//! Document repositories for the file registry
//!
//! `file` defines the repository trait the registry depends on; `memory` and
//! `json` are the two stores shipped with filevault.

pub mod file;
pub mod json;
pub mod memory;

pub use file::{create_file_repository, FileRepository};
pub use json::JsonFileRepository;
pub use memory::InMemoryFileRepository;
