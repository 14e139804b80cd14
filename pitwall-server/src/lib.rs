//! Pitwall Server Library
//!
//! Exposes server components for integration testing.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod emitter;
pub mod ingest;
pub mod state;
pub mod store;
