//! Core types and trait definitions for the Tally vote/rating store.
//!
//! This crate is deliberately free of database dependencies.
//! Storage backends (e.g. `tally-store-sqlite`) depend on it; it depends on
//! nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod owner;
pub mod rating;
pub mod store;
pub mod vote;

pub use error::{Error, Result};
