//! Durable client store.
//!
//! A persistent key/value store owned by the requesting client, holding
//! cleaned activity content and course structures so that repeat visits need
//! no round trip. It uses SQLite with async access via tokio-rusqlite and is
//! keyed by the same fingerprint scheme as the server cache.
//!
//! Server-side tiers never write here; the client fills it opportunistically
//! and is the only party that clears it.

pub mod activities;
pub mod connection;
pub mod courses;
pub mod migrations;

pub use connection::ClientStore;
