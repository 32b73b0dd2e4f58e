//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and clearing the server cache.

pub mod clear;
pub mod status;

pub use clear::{CacheClearParams, clear_impl};
pub use status::{CacheStatusParams, status_impl};
