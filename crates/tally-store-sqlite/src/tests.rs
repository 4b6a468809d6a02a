//! Integration tests for `SqliteStore` against an in-memory database.

use tally_core::{
  owner::{OwnerKind, OwnerRef, OwnerRegistry},
  store::TallyStore,
  vote::VoteValue,
};
use uuid::Uuid;

use crate::SqliteStore;

fn registry() -> OwnerRegistry {
  OwnerRegistry::new([
    OwnerKind::new("thread").with_votes().with_ratings(),
    OwnerKind::new("comment").with_votes(),
    OwnerKind::new("product").with_ratings(),
  ])
  .expect("registry")
}

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(registry())
    .await
    .expect("in-memory store")
}

fn thread() -> OwnerRef { OwnerRef::new("thread", Uuid::new_v4()) }

// ─── Votes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cast_vote_creates_and_updates_summary() {
  let s = store().await;
  let owner = thread();

  let vote = s
    .cast_vote(Uuid::new_v4(), owner.clone(), VoteValue::Up)
    .await
    .unwrap();
  assert_eq!(vote.value, VoteValue::Up);
  assert_eq!(vote.owner, owner);

  let summary = s.vote_summary(owner).await.unwrap();
  assert_eq!(summary.up_votes, 1);
  assert_eq!(summary.down_votes, 0);
  assert_eq!(summary.total_votes(), 1);
}

#[tokio::test]
async fn changing_a_vote_moves_the_counters() {
  let s = store().await;
  let owner = thread();
  let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  s.cast_vote(a, owner.clone(), VoteValue::Up).await.unwrap();
  s.cast_vote(b, owner.clone(), VoteValue::Up).await.unwrap();
  s.cast_vote(c, owner.clone(), VoteValue::Down).await.unwrap();

  let summary = s.vote_summary(owner.clone()).await.unwrap();
  assert_eq!((summary.up_votes, summary.down_votes), (2, 1));

  // B changes their mind.
  s.cast_vote(b, owner.clone(), VoteValue::Down).await.unwrap();

  let summary = s.vote_summary(owner).await.unwrap();
  assert_eq!((summary.up_votes, summary.down_votes), (1, 2));
}

#[tokio::test]
async fn recasting_the_same_value_is_a_net_noop() {
  let s = store().await;
  let owner = thread();
  let voter = Uuid::new_v4();

  s.cast_vote(voter, owner.clone(), VoteValue::Up).await.unwrap();
  s.cast_vote(voter, owner.clone(), VoteValue::Up).await.unwrap();

  let summary = s.vote_summary(owner.clone()).await.unwrap();
  assert_eq!((summary.up_votes, summary.down_votes), (1, 0));

  let votes = s.votes_for(owner).await.unwrap();
  assert_eq!(votes.len(), 1);
}

#[tokio::test]
async fn one_vote_row_per_voter_edited_in_place() {
  let s = store().await;
  let owner = thread();
  let voter = Uuid::new_v4();

  let first = s
    .cast_vote(voter, owner.clone(), VoteValue::Up)
    .await
    .unwrap();
  let second = s
    .cast_vote(voter, owner.clone(), VoteValue::Down)
    .await
    .unwrap();

  assert_eq!(second.vote_id, first.vote_id);
  assert_eq!(second.cast_at, first.cast_at);

  let current = s.vote_for(voter, owner.clone()).await.unwrap().unwrap();
  assert_eq!(current.value, VoteValue::Down);

  let votes = s.votes_for(owner).await.unwrap();
  assert_eq!(votes.len(), 1);
}

#[tokio::test]
async fn vote_for_missing_returns_none() {
  let s = store().await;
  let found = s.vote_for(Uuid::new_v4(), thread()).await.unwrap();
  assert!(found.is_none());
}

#[tokio::test]
async fn retract_vote_corrects_the_summary() {
  let s = store().await;
  let owner = thread();
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

  s.cast_vote(a, owner.clone(), VoteValue::Up).await.unwrap();
  s.cast_vote(b, owner.clone(), VoteValue::Down).await.unwrap();

  let removed = s.retract_vote(a, owner.clone()).await.unwrap().unwrap();
  assert_eq!(removed.value, VoteValue::Up);

  let summary = s.vote_summary(owner.clone()).await.unwrap();
  assert_eq!((summary.up_votes, summary.down_votes), (0, 1));

  let votes = s.votes_for(owner.clone()).await.unwrap();
  assert_eq!(votes.len(), 1);

  // Retracting again finds nothing.
  assert!(s.retract_vote(a, owner).await.unwrap().is_none());
}

#[tokio::test]
async fn summary_for_unvoted_owner_is_empty() {
  let s = store().await;

  let summary = s.vote_summary(thread()).await.unwrap();
  assert_eq!(summary.total_votes(), 0);
  assert_eq!(summary.up_pct(), None);
  assert_eq!(summary.down_pct(), None);
}

#[tokio::test]
async fn percentages_reflect_the_counts() {
  let s = store().await;
  let owner = thread();

  s.cast_vote(Uuid::new_v4(), owner.clone(), VoteValue::Up).await.unwrap();
  s.cast_vote(Uuid::new_v4(), owner.clone(), VoteValue::Up).await.unwrap();
  s.cast_vote(Uuid::new_v4(), owner.clone(), VoteValue::Down).await.unwrap();

  let summary = s.vote_summary(owner).await.unwrap();
  assert!((summary.up_pct().unwrap() - 200.0 / 3.0).abs() < 1e-9);
  assert!((summary.down_pct().unwrap() - 100.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn rebuild_vote_summaries_is_idempotent() {
  let s = store().await;
  let first = thread();
  let second = thread();

  s.cast_vote(Uuid::new_v4(), first.clone(), VoteValue::Up).await.unwrap();
  s.cast_vote(Uuid::new_v4(), first.clone(), VoteValue::Down).await.unwrap();
  s.cast_vote(Uuid::new_v4(), second.clone(), VoteValue::Up).await.unwrap();

  let before_first = s.vote_summary(first.clone()).await.unwrap();
  let before_second = s.vote_summary(second.clone()).await.unwrap();

  let rebuilt = s.rebuild_vote_summaries("thread").await.unwrap();
  assert_eq!(rebuilt, 2);

  let after_first = s.vote_summary(first).await.unwrap();
  let after_second = s.vote_summary(second).await.unwrap();

  assert_eq!(after_first.up_votes, before_first.up_votes);
  assert_eq!(after_first.down_votes, before_first.down_votes);
  assert_eq!(after_second.up_votes, before_second.up_votes);
  assert_eq!(after_second.down_votes, before_second.down_votes);
}

#[tokio::test]
async fn rebuild_only_touches_the_requested_kind() {
  let s = store().await;
  let thread_owner = thread();
  let comment_owner = OwnerRef::new("comment", Uuid::new_v4());

  s.cast_vote(Uuid::new_v4(), thread_owner.clone(), VoteValue::Up)
    .await
    .unwrap();
  s.cast_vote(Uuid::new_v4(), comment_owner.clone(), VoteValue::Down)
    .await
    .unwrap();

  let rebuilt = s.rebuild_vote_summaries("comment").await.unwrap();
  assert_eq!(rebuilt, 1);

  let summary = s.vote_summary(comment_owner).await.unwrap();
  assert_eq!((summary.up_votes, summary.down_votes), (0, 1));
}

// ─── Vote registry enforcement ───────────────────────────────────────────────

#[tokio::test]
async fn voting_on_unknown_kind_fails_with_the_name() {
  let s = store().await;
  let owner = OwnerRef::new("widget", Uuid::new_v4());

  let err = s
    .cast_vote(Uuid::new_v4(), owner, VoteValue::Up)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(tally_core::Error::UnknownOwnerKind(ref name)) if name == "widget"
  ));
}

#[tokio::test]
async fn voting_on_rating_only_kind_fails() {
  let s = store().await;
  let owner = OwnerRef::new("product", Uuid::new_v4());

  let err = s
    .cast_vote(Uuid::new_v4(), owner, VoteValue::Down)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(tally_core::Error::VotesNotRegistered(ref name)) if name == "product"
  ));
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rating_set_edit_and_cancel() {
  let s = store().await;
  let owner = thread();
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

  s.set_rating(a, owner.clone(), 4).await.unwrap();
  s.set_rating(b, owner.clone(), 2).await.unwrap();

  let summary = s.rating_summary(owner.clone()).await.unwrap();
  assert_eq!((summary.rating_total, summary.rating_count), (6, 2));
  assert_eq!(summary.average(), 3.0);

  // A revises their rating upward.
  s.set_rating(a, owner.clone(), 5).await.unwrap();
  let summary = s.rating_summary(owner.clone()).await.unwrap();
  assert_eq!((summary.rating_total, summary.rating_count), (7, 2));
  assert_eq!(summary.average(), 3.5);

  // A cancels.
  s.set_rating(a, owner.clone(), 0).await.unwrap();
  let summary = s.rating_summary(owner).await.unwrap();
  assert_eq!((summary.rating_total, summary.rating_count), (2, 1));
  assert_eq!(summary.average(), 2.0);
}

#[tokio::test]
async fn zero_rating_is_an_inert_placeholder() {
  let s = store().await;
  let owner = thread();
  let rater = Uuid::new_v4();

  let rating = s.set_rating(rater, owner.clone(), 0).await.unwrap();
  assert_eq!(rating.value, 0);

  // The row exists but the summary is untouched.
  let rows = s.ratings_for(owner.clone()).await.unwrap();
  assert_eq!(rows.len(), 1);

  let summary = s.rating_summary(owner).await.unwrap();
  assert_eq!((summary.rating_total, summary.rating_count), (0, 0));
  assert_eq!(summary.average(), 0.0);
}

#[tokio::test]
async fn one_rating_row_per_rater_edited_in_place() {
  let s = store().await;
  let owner = thread();
  let rater = Uuid::new_v4();

  let first = s.set_rating(rater, owner.clone(), 3).await.unwrap();
  let second = s.set_rating(rater, owner.clone(), 5).await.unwrap();

  assert_eq!(second.rating_id, first.rating_id);
  assert_eq!(second.rated_at, first.rated_at);

  let current = s.rating_for(rater, owner.clone()).await.unwrap().unwrap();
  assert_eq!(current.value, 5);

  let rows = s.ratings_for(owner).await.unwrap();
  assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn remove_rating_corrects_the_summary() {
  let s = store().await;
  let owner = thread();
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

  s.set_rating(a, owner.clone(), 4).await.unwrap();
  s.set_rating(b, owner.clone(), 2).await.unwrap();

  let removed = s.remove_rating(a, owner.clone()).await.unwrap().unwrap();
  assert_eq!(removed.value, 4);

  let summary = s.rating_summary(owner.clone()).await.unwrap();
  assert_eq!((summary.rating_total, summary.rating_count), (2, 1));

  assert!(s.remove_rating(a, owner).await.unwrap().is_none());
}

#[tokio::test]
async fn removing_a_placeholder_leaves_the_summary_alone() {
  let s = store().await;
  let owner = thread();
  let (rater, other) = (Uuid::new_v4(), Uuid::new_v4());

  s.set_rating(other, owner.clone(), 3).await.unwrap();
  s.set_rating(rater, owner.clone(), 0).await.unwrap();

  let removed = s.remove_rating(rater, owner.clone()).await.unwrap().unwrap();
  assert_eq!(removed.value, 0);

  let summary = s.rating_summary(owner).await.unwrap();
  assert_eq!((summary.rating_total, summary.rating_count), (3, 1));
}

#[tokio::test]
async fn average_rounds_to_one_decimal() {
  let s = store().await;
  let owner = thread();

  s.set_rating(Uuid::new_v4(), owner.clone(), 1).await.unwrap();
  s.set_rating(Uuid::new_v4(), owner.clone(), 1).await.unwrap();
  s.set_rating(Uuid::new_v4(), owner.clone(), 2).await.unwrap();

  let summary = s.rating_summary(owner).await.unwrap();
  assert_eq!((summary.rating_total, summary.rating_count), (4, 3));
  assert_eq!(summary.average(), 1.3);
}

#[tokio::test]
async fn rebuild_rating_summaries_is_idempotent() {
  let s = store().await;
  let owner = thread();
  let other = thread();

  s.set_rating(Uuid::new_v4(), owner.clone(), 4).await.unwrap();
  s.set_rating(Uuid::new_v4(), owner.clone(), 2).await.unwrap();
  s.set_rating(Uuid::new_v4(), other.clone(), 0).await.unwrap();

  let before = s.rating_summary(owner.clone()).await.unwrap();

  let rebuilt = s.rebuild_rating_summaries("thread").await.unwrap();
  assert_eq!(rebuilt, 2);

  let after = s.rating_summary(owner).await.unwrap();
  assert_eq!(after.rating_total, before.rating_total);
  assert_eq!(after.rating_count, before.rating_count);

  // The placeholder-only owner rebuilds to an empty summary.
  let empty = s.rating_summary(other).await.unwrap();
  assert_eq!((empty.rating_total, empty.rating_count), (0, 0));
}

#[tokio::test]
async fn rating_a_vote_only_kind_fails() {
  let s = store().await;
  let owner = OwnerRef::new("comment", Uuid::new_v4());

  let err = s.set_rating(Uuid::new_v4(), owner, 5).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(tally_core::Error::RatingsNotRegistered(ref name)) if name == "comment"
  ));
}

// ─── Persistence across handles ──────────────────────────────────────────────

#[tokio::test]
async fn summaries_survive_reopening_the_file() {
  let dir = std::env::temp_dir().join(format!("tally-test-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("tally.db");

  let owner = thread();
  {
    let s = SqliteStore::open(&path, registry()).await.unwrap();
    s.cast_vote(Uuid::new_v4(), owner.clone(), VoteValue::Up).await.unwrap();
    s.cast_vote(Uuid::new_v4(), owner.clone(), VoteValue::Up).await.unwrap();
  }

  let s = SqliteStore::open(&path, registry()).await.unwrap();
  let summary = s.vote_summary(owner).await.unwrap();
  assert_eq!((summary.up_votes, summary.down_votes), (2, 0));

  std::fs::remove_dir_all(&dir).ok();
}
