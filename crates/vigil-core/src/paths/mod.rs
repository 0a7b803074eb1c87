//! Path utilities for vigil data files.
//!
//! This module provides the canonical locations of:
//! - The data root directory
//! - The `SQLite` database
//! - The response cache encryption key
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - OS-specific logic is kept private in `platform`
//! - `*_in` variants take an explicit root so several gateway instances
//!   (and tests) never share files

mod error;
mod files;
mod platform;

pub use error::PathError;
pub use files::{cache_key_path, cache_key_path_in, database_path, database_path_in};
pub use platform::{data_root, ensure_directory};
