//! Core types and trait definitions for GeoBase.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it. The two ranking algorithms (nearest-neighbour
//! geo search and fuzzy text search) live here because they are pure.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attachment;
pub mod blob;
pub mod company;
pub mod error;
pub mod geo;
pub mod search;
pub mod store;
pub mod storypoint;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
