//! Error type for `tally-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tally_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A `votes.value` column held something other than +1 or −1.
  #[error("stored vote value out of range: {0}")]
  InvalidVoteValue(i64),

  /// A `ratings.value` column held a negative value.
  #[error("stored rating value out of range: {0}")]
  InvalidRatingValue(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
