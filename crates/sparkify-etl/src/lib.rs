//! Batch driver that loads Sparkify catalog and session-log files into a
//! [`WarehouseStore`](sparkify_core::store::WarehouseStore).
//!
//! The `sparkify-etl` binary wires this to a SQLite store; the library is
//! generic over any backend.

pub mod config;
pub mod discover;
pub mod error;
pub mod pipeline;

pub use config::{EtlConfig, FailurePolicy};
pub use error::{Error, Result};
pub use pipeline::{FileFailure, PhaseReport, Pipeline, RunPhase, RunReport};
