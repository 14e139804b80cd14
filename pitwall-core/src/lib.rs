//! Pitwall Core Library
//!
//! This crate provides the typed telemetry samples, the live session state
//! and the lap store contract shared by the decoder and the server.

pub mod model;
pub mod store;
pub mod units;

pub use model::{
    CompletedLapRecord, FieldMask, Identity, LapDataSample, SessionState, TelemetryEvent,
};
pub use store::{LapStore, StoreError};
