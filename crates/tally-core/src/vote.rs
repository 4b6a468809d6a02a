//! Up/down votes and their per-owner summary.
//!
//! The summary is a denormalized cache. On every write it is adjusted by the
//! difference between the vote's previous and new value instead of being
//! recomputed from all vote rows; a full recount happens only when a summary
//! is first created (backfill) or during a bulk rebuild.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::owner::OwnerRef;

// ─── Vote ────────────────────────────────────────────────────────────────────

/// The two legal vote values, stored as +1 and −1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
  Up,
  Down,
}

impl VoteValue {
  pub fn as_i64(self) -> i64 {
    match self {
      Self::Up => 1,
      Self::Down => -1,
    }
  }
}

/// One voter's current vote on one owner. A (voter, owner) pair holds at most
/// one vote, edited in place when the voter changes their mind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
  pub vote_id:  Uuid,
  pub voter_id: Uuid,
  pub owner:    OwnerRef,
  pub value:    VoteValue,
  /// Set when the vote is first cast; preserved across edits.
  pub cast_at:  DateTime<Utc>,
}

// ─── VoteSummary ─────────────────────────────────────────────────────────────

/// Cached per-owner vote counts. One row per owner, created lazily on first
/// access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteSummary {
  pub owner:      OwnerRef,
  pub up_votes:   u64,
  pub down_votes: u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl VoteSummary {
  pub fn total_votes(&self) -> u64 { self.up_votes + self.down_votes }

  /// Share of up votes, in percent. `None` when no votes have been cast.
  pub fn up_pct(&self) -> Option<f64> {
    match self.total_votes() {
      0 => None,
      total => Some(self.up_votes as f64 * 100.0 / total as f64),
    }
  }

  /// Share of down votes, in percent. `None` when no votes have been cast.
  pub fn down_pct(&self) -> Option<f64> {
    match self.total_votes() {
      0 => None,
      total => Some(self.down_votes as f64 * 100.0 / total as f64),
    }
  }
}

// ─── Incremental update rule ─────────────────────────────────────────────────

/// Counter adjustment produced by one vote write or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteDelta {
  pub up:   i64,
  pub down: i64,
}

/// The incremental update rule for vote counters.
///
/// `previous` and `next` are raw stored values: +1, −1, or 0 for "no row".
/// The previous value is retracted and the next one applied in a single
/// step, so re-casting the same value is a net no-op, and a removal is
/// expressed as `vote_delta(value, 0)`.
pub fn vote_delta(previous: i64, next: i64) -> VoteDelta {
  let mut delta = VoteDelta::default();
  if previous == 1 {
    delta.up -= 1;
  }
  if previous == -1 {
    delta.down -= 1;
  }
  if next == 1 {
    delta.up += 1;
  }
  if next == -1 {
    delta.down += 1;
  }
  delta
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn delta_for_new_votes() {
    assert_eq!(vote_delta(0, 1), VoteDelta { up: 1, down: 0 });
    assert_eq!(vote_delta(0, -1), VoteDelta { up: 0, down: 1 });
  }

  #[test]
  fn delta_for_changed_votes() {
    assert_eq!(vote_delta(1, -1), VoteDelta { up: -1, down: 1 });
    assert_eq!(vote_delta(-1, 1), VoteDelta { up: 1, down: -1 });
  }

  #[test]
  fn delta_for_unchanged_vote_is_zero() {
    assert_eq!(vote_delta(1, 1), VoteDelta::default());
    assert_eq!(vote_delta(-1, -1), VoteDelta::default());
  }

  #[test]
  fn delta_for_removed_votes() {
    assert_eq!(vote_delta(1, 0), VoteDelta { up: -1, down: 0 });
    assert_eq!(vote_delta(-1, 0), VoteDelta { up: 0, down: -1 });
  }

  fn summary(up: u64, down: u64) -> VoteSummary {
    let now = chrono::Utc::now();
    VoteSummary {
      owner:      crate::owner::OwnerRef::new("thread", Uuid::new_v4()),
      up_votes:   up,
      down_votes: down,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn percentages_are_undefined_without_votes() {
    let s = summary(0, 0);
    assert_eq!(s.total_votes(), 0);
    assert_eq!(s.up_pct(), None);
    assert_eq!(s.down_pct(), None);
  }

  #[test]
  fn percentages_split_the_total() {
    let s = summary(2, 1);
    assert_eq!(s.total_votes(), 3);
    assert!((s.up_pct().unwrap() - 200.0 / 3.0).abs() < 1e-9);
    assert!((s.down_pct().unwrap() - 100.0 / 3.0).abs() < 1e-9);
  }
}
