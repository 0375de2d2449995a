//! genanno common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging and checksum utilities for the genanno
//! workspace members.
//!
//! - **Error Handling**: [`AnnoError`] and the [`Result`] alias
//! - **Logging**: console/file `tracing` setup driven by [`logging::LogConfig`]
//! - **Checksums**: SHA-256 fingerprints of pipeline outputs
//!
//! # Example
//!
//! ```no_run
//! use genanno_common::checksum::sha256_file;
//! use genanno_common::Result;
//!
//! fn fingerprint(path: &str) -> Result<()> {
//!     let digest = sha256_file(path)?;
//!     tracing::info!(path, %digest, "output fingerprint");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

pub use error::{AnnoError, Result};
