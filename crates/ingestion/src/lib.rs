//! Argo profile ingestion pipeline.
//!
//! Resolves a source (single file URL, archive directory URL, or uploaded
//! bytes) into profile datasets, normalizes each contained profile, and
//! persists profile + measurements transactionally with exactly-once
//! semantics per `(platform_number, cycle_number)`.

pub mod config;
mod crawler;
mod ingester;

pub use config::RetryConfig;
pub use crawler::{extract_hrefs, DirectoryWalker, LinkLister};
pub use ingester::{Ingester, ProfileStore};
