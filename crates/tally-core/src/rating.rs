//! Numeric ratings and their per-owner summary.
//!
//! A rating value of 0 is the "no rating" sentinel: setting an existing
//! rating to 0 cancels it, and a fresh row saved with 0 is an inert
//! placeholder that never touches the summary. Real ratings are positive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::owner::OwnerRef;

// ─── Rating ──────────────────────────────────────────────────────────────────

/// One rater's current rating of one owner. A (rater, owner) pair holds at
/// most one rating, edited in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
  pub rating_id: Uuid,
  pub rater_id:  Uuid,
  pub owner:     OwnerRef,
  /// 0 means "no rating"; values above 0 are real ratings.
  pub value:     u32,
  /// Set when the rating row is first created; preserved across edits.
  pub rated_at:  DateTime<Utc>,
}

// ─── RatingSummary ───────────────────────────────────────────────────────────

/// Cached per-owner rating sum and count. One row per owner, created lazily
/// on first access. Zero-value placeholder rows are not counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSummary {
  pub owner:        OwnerRef,
  pub rating_count: u64,
  pub rating_total: u64,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl RatingSummary {
  /// Average rating, rounded to one decimal place. `0.0` when unrated.
  pub fn average(&self) -> f64 {
    if self.rating_count == 0 {
      return 0.0;
    }
    let raw = self.rating_total as f64 / self.rating_count as f64;
    (raw * 10.0).round() / 10.0
  }
}

// ─── Incremental update rule ─────────────────────────────────────────────────

/// Sum/count adjustment produced by one rating write or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RatingDelta {
  pub total: i64,
  pub count: i64,
}

/// The incremental update rule for rating totals.
///
/// `previous` and `next` are raw stored values; 0 stands for "no rating"
/// (a missing row or the placeholder sentinel). The four cases:
/// cancel (`previous > 0, next == 0`), edit (both positive), first rating
/// (`previous == 0, next > 0`), and placeholder no-op (both 0).
///
/// A removal is expressed as `rating_delta(value, 0)`, which also makes
/// removing a zero-value placeholder leave the summary untouched.
pub fn rating_delta(previous: i64, next: i64) -> RatingDelta {
  if previous > 0 && next == 0 {
    RatingDelta { total: -previous, count: -1 }
  } else if previous > 0 && next > 0 {
    RatingDelta { total: next - previous, count: 0 }
  } else if previous == 0 && next > 0 {
    RatingDelta { total: next, count: 1 }
  } else {
    RatingDelta::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn first_rating_adds_value_and_count() {
    assert_eq!(rating_delta(0, 4), RatingDelta { total: 4, count: 1 });
  }

  #[test]
  fn edit_moves_the_total_only() {
    assert_eq!(rating_delta(4, 5), RatingDelta { total: 1, count: 0 });
    assert_eq!(rating_delta(5, 2), RatingDelta { total: -3, count: 0 });
  }

  #[test]
  fn cancel_subtracts_value_and_count() {
    assert_eq!(rating_delta(4, 0), RatingDelta { total: -4, count: -1 });
  }

  #[test]
  fn placeholder_is_a_noop() {
    assert_eq!(rating_delta(0, 0), RatingDelta::default());
  }

  fn summary(total: u64, count: u64) -> RatingSummary {
    let now = chrono::Utc::now();
    RatingSummary {
      owner:        crate::owner::OwnerRef::new("thread", Uuid::new_v4()),
      rating_count: count,
      rating_total: total,
      created_at:   now,
      updated_at:   now,
    }
  }

  #[test]
  fn average_is_zero_when_unrated() {
    assert_eq!(summary(0, 0).average(), 0.0);
  }

  #[test]
  fn average_rounds_to_one_decimal() {
    assert_eq!(summary(6, 2).average(), 3.0);
    assert_eq!(summary(7, 2).average(), 3.5);
    assert_eq!(summary(4, 3).average(), 1.3);
  }
}
