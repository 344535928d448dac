//! Transactional build cache for incremental project generation.
//!
//! This crate persists generation options and the baselines used to decide
//! whether an input file changed or a generated output needs rewriting. All
//! writes are buffered in an open transaction and reach disk only on
//! [`BuildCache::commit`], which replaces the snapshot file atomically.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod store;
pub mod tables;

pub use cache::BuildCache;
pub use error::CacheError;
pub use store::SnapshotStore;
pub use tables::{CacheTables, InputBaseline};
