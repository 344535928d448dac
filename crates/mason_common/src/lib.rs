//! Shared foundational types used across the mason project generator.
//!
//! This crate provides content hashing for output change detection, metadata
//! fingerprints for input baselines, canonical and relative path helpers, and
//! the leveled [`Logger`] handle threaded through every public entry point.

#![warn(missing_docs)]

pub mod hash;
pub mod log;
pub mod path;

pub use hash::{ContentHash, Fingerprint};
pub use log::{LogLevel, Logger, MemoryLogger, TracingLogger};
pub use path::{canonical_path, relative_path};
