//! The `TallyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Hosts depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  owner::OwnerRef,
  rating::{Rating, RatingSummary},
  vote::{Vote, VoteSummary, VoteValue},
};

/// Abstraction over a vote/rating store backend.
///
/// Every write keeps the owner's summary consistent with the detail rows by
/// applying the incremental rules in [`crate::vote`] and [`crate::rating`];
/// the summary adjustment and the detail-row write must succeed or fail
/// together.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait TallyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Votes ─────────────────────────────────────────────────────────────

  /// Cast or change `voter_id`'s vote on `owner`.
  ///
  /// At most one vote exists per (voter, owner) pair; casting again edits
  /// the existing vote in place and adjusts the summary by the difference.
  fn cast_vote(
    &self,
    voter_id: Uuid,
    owner: OwnerRef,
    value: VoteValue,
  ) -> impl Future<Output = Result<Vote, Self::Error>> + Send + '_;

  /// Remove `voter_id`'s vote on `owner`, subtracting it from the summary.
  /// Returns the removed vote, or `None` if the voter had not voted.
  fn retract_vote(
    &self,
    voter_id: Uuid,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<Option<Vote>, Self::Error>> + Send + '_;

  /// `voter_id`'s current vote on `owner`, if any.
  fn vote_for(
    &self,
    voter_id: Uuid,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<Option<Vote>, Self::Error>> + Send + '_;

  /// All votes on `owner`, oldest first.
  fn votes_for(
    &self,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<Vec<Vote>, Self::Error>> + Send + '_;

  /// Get the owner's vote summary, lazily creating it on first access.
  ///
  /// A newly created summary is backfilled by counting the owner's existing
  /// +1 and −1 vote rows, so the cache is self-healing on first read.
  fn vote_summary(
    &self,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<VoteSummary, Self::Error>> + Send + '_;

  /// Delete every vote summary for `kind` and re-derive one per owner that
  /// has vote rows, via the backfill path. Returns the number of owners
  /// rebuilt. A no-op on an already-consistent summary table.
  fn rebuild_vote_summaries<'a>(
    &'a self,
    kind: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Ratings ───────────────────────────────────────────────────────────

  /// Set, change, or cancel (value 0) `rater_id`'s rating of `owner`.
  ///
  /// At most one rating exists per (rater, owner) pair. The summary is
  /// adjusted per the cancel/edit/first-rating rule before the rating row
  /// is written.
  fn set_rating(
    &self,
    rater_id: Uuid,
    owner: OwnerRef,
    value: u32,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  /// Delete `rater_id`'s rating row for `owner`, subtracting it from the
  /// summary. Removing a zero-value placeholder leaves the summary
  /// untouched. Returns the removed rating, or `None` if there was none.
  fn remove_rating(
    &self,
    rater_id: Uuid,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + '_;

  /// `rater_id`'s current rating of `owner`, if any.
  fn rating_for(
    &self,
    rater_id: Uuid,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + '_;

  /// All rating rows for `owner` (including placeholders), oldest first.
  fn ratings_for(
    &self,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<Vec<Rating>, Self::Error>> + Send + '_;

  /// Get the owner's rating summary, lazily creating it on first access.
  ///
  /// A newly created summary is backfilled from the owner's non-zero rating
  /// rows.
  fn rating_summary(
    &self,
    owner: OwnerRef,
  ) -> impl Future<Output = Result<RatingSummary, Self::Error>> + Send + '_;

  /// Delete every rating summary for `kind` and re-derive one per owner
  /// that has rating rows, via the backfill path. Returns the number of
  /// owners rebuilt.
  fn rebuild_rating_summaries<'a>(
    &'a self,
    kind: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
