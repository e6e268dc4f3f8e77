//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes article snapshots and run outcomes as dated JSON files

pub mod json;
