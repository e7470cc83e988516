//! Durable record storage.
//!
//! The durable store holds the authoritative, provider-agnostic
//! [`DurableRecord`](crosstune_music::DurableRecord) for each resolved work.
//! It never sees the links users submitted; those stay in the local index.

pub mod backend;
mod codec;
pub mod error;
mod pointer;

pub use crate::backend::DurableStore;
pub use crate::codec::{decode, encode};
pub use crate::pointer::Pointer;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn DurableStore + Send + Sync>;
