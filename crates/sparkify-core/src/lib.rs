//! Core types and trait definitions for the Sparkify warehouse loader.
//!
//! This crate is deliberately free of filesystem and database dependencies.
//! Records come in from `sparkify-json`, dimension and fact rows go out to a
//! [`store::WarehouseStore`] backend.

pub mod dimension;
pub mod record;
pub mod resolve;
pub mod store;

pub use dimension::{ArtistRow, FactRow, SongRow, TimeBucket, UserKey, UserProfile};
pub use record::{CatalogRecord, GeoPoint, ListeningEvent, Level};
pub use resolve::{CatalogEntry, CatalogIndex, SongMatch};
pub use store::{CatalogBatch, LoadSummary, LogBatch, WarehouseStore};
