//! SQLite backend for the Tally vote/rating store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write runs in a single
//! transaction: the previous-value read, the summary adjustment, and the
//! detail-row write commit or roll back together.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
