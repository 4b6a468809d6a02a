//! Error types for `tally-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown owner kind: {0:?}")]
  UnknownOwnerKind(String),

  #[error("owner kind {0:?} is not registered for votes")]
  VotesNotRegistered(String),

  #[error("owner kind {0:?} is not registered for ratings")]
  RatingsNotRegistered(String),

  #[error("owner kind registered twice: {0:?}")]
  DuplicateOwnerKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
