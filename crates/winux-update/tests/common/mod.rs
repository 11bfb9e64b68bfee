//! Common test infrastructure for winux-update tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Versions, file names and binary content
//! - `builders`: Fluent builder for release JSON documents
//! - `mock_server`: Wiremock setup helpers for the release registry
//! - `fixtures`: Temporary install environment wired to a mock server
//! - `observers`: Recording observer and fault-injecting filesystem

// Not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod fixtures;
pub mod mock_server;
pub mod observers;

pub use builders::*;
pub use constants::*;
pub use fixtures::*;
pub use mock_server::*;
pub use observers::*;
