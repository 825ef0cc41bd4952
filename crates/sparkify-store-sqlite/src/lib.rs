//! SQLite backend for the Sparkify warehouse.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each file's batch is written inside a
//! single transaction by the set-based loader in [`loader`].

mod encode;
mod loader;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use loader::LoadFailure;
pub use store::{SqliteStore, TableCounts};

#[cfg(test)]
mod tests;
