//! # krug-common
//!
//! Shared types for the Krug cgroup bring-up tools:
//! - Common error types
//! - Standard cgroup filesystem paths

#![warn(missing_docs)]

pub mod error;
pub mod paths;

pub use error::{KrugError, KrugResult};
pub use paths::CgroupPaths;
