//! # winux-core
//!
//! Core library for the WINUX updater providing:
//! - Updater configuration types with embedded defaults
//! - Layered configuration loading (embedded, user file, environment)
//! - The shared configuration error type

pub mod config;
pub mod error;
pub mod types;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use types::UpdaterConfig;
