//! Music domain models, link classification and cache-key normalization.
//!
//! Everything here is synchronous and side-effect free: resolving inputs
//! against providers and caching the results lives in `crosstune-resolve`.

mod classify;
mod consts;
pub mod error;
pub mod models;
mod normalize;

pub use crate::classify::{Classified, Target, classify, classify_token};
pub use crate::models::{
    DurableRecord, EntityKind, Identifier, IdentifierKind, Market, Provider, ProviderResult, ResolutionResult,
    WorkIdentity,
};
pub use crate::normalize::{identifier_key, normalize, search_key};
