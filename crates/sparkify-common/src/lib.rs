//! Sparkify Common Library
//!
//! Shared utilities and error handling for the Sparkify ETL workspace.
//!
//! # Overview
//!
//! - **Error Handling**: `CommonError` and the crate `Result` alias
//! - **Logging**: centralized `tracing` subscriber setup
//! - **Files**: discovery of input files below a directory tree
//!
//! # Example
//!
//! ```no_run
//! use sparkify_common::files::discover_files;
//! use sparkify_common::Result;
//!
//! fn count_inputs(root: &str) -> Result<usize> {
//!     let files = discover_files(root, "json")?;
//!     Ok(files.len())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod files;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
