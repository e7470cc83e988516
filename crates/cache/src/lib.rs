//! SQLite index of normalized input links.
//!
//! This crate provides the fast, local tier of the two-tier cache. It maps
//! normalized input links onto pointers into the durable record store. The
//! index is not the source of truth (the durable store is): if the database
//! is deleted, the next lookup of each link simply resolves again.
//!
//! # Architecture
//! The index stores two entity types:
//! - **Entries**: one per durable record pointer, carrying `created_at` and
//!   `last_looked_up_at` timestamps. Freshness is a read-time check.
//! - **Input links**: normalized links referencing an entry by foreign key.
//!   Many links may share an entry; a link never belongs to two entries.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::CacheIndexEntry;
pub use crate::repo::Repository;
