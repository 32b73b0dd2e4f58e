//! Core types and shared functionality for quire.
//!
//! This crate provides:
//! - Pluggable cache adapters (process memory, durable directory)
//! - The cache service that owns key derivation and degrades failures to misses
//! - The durable client store (SQLite)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use cache::{CacheAdapter, CacheService, DirectoryAdapter, MemoryAdapter, fingerprint, open_adapter};
pub use config::{AppConfig, CacheBackend, ConfigError};
pub use error::Error;
pub use model::{ActivitySnapshot, CourseSnapshot, CourseSummary, SectionSnapshot};
pub use store::ClientStore;
