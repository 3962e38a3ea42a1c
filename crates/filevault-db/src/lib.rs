//! Filevault DB Library
//!
//! Persistence for `File` documents behind the `FileRepository` trait.

pub mod db;

pub use db::{create_file_repository, FileRepository, InMemoryFileRepository, JsonFileRepository};
