//! [`SqliteStore`] — the SQLite implementation of [`TallyStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, Transaction};
use uuid::Uuid;

use tally_core::{
  owner::{OwnerRef, OwnerRegistry},
  rating::{Rating, RatingSummary, rating_delta},
  store::TallyStore,
  vote::{Vote, VoteSummary, VoteValue, vote_delta},
};

use crate::{
  Error, Result,
  encode::{
    RawRating, RawRatingSummary, RawVote, RawVoteSummary, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and the
/// owner-kind registry is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  registry: Arc<OwnerRegistry>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(
    path: impl AsRef<Path>,
    registry: OwnerRegistry,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, registry: Arc::new(registry) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory(registry: OwnerRegistry) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, registry: Arc::new(registry) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The owner kinds this store was opened with.
  pub fn registry(&self) -> &OwnerRegistry { &self.registry }
}

// ─── Transaction helpers ─────────────────────────────────────────────────────
// These run on the connection thread, inside a write transaction.

/// Get-or-create for a vote summary row. A newly created row is backfilled
/// by counting the owner's existing vote rows, so the cache is self-healing.
/// Creation races collapse into the ON CONFLICT no-op instead of a duplicate.
fn ensure_vote_summary(
  tx: &Transaction<'_>,
  owner_kind: &str,
  owner_id: &str,
) -> rusqlite::Result<()> {
  let exists: bool = tx
    .query_row(
      "SELECT 1 FROM vote_summaries WHERE owner_kind = ?1 AND owner_id = ?2",
      rusqlite::params![owner_kind, owner_id],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);

  if exists {
    return Ok(());
  }

  let up: i64 = tx.query_row(
    "SELECT COUNT(*) FROM votes
     WHERE owner_kind = ?1 AND owner_id = ?2 AND value = 1",
    rusqlite::params![owner_kind, owner_id],
    |r| r.get(0),
  )?;
  let down: i64 = tx.query_row(
    "SELECT COUNT(*) FROM votes
     WHERE owner_kind = ?1 AND owner_id = ?2 AND value = -1",
    rusqlite::params![owner_kind, owner_id],
    |r| r.get(0),
  )?;

  let now = encode_dt(Utc::now());
  tx.execute(
    "INSERT INTO vote_summaries
       (owner_kind, owner_id, up_votes, down_votes, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
     ON CONFLICT (owner_kind, owner_id) DO NOTHING",
    rusqlite::params![owner_kind, owner_id, up, down, now],
  )?;
  Ok(())
}

/// Get-or-create for a rating summary row, backfilled from the owner's
/// non-zero rating rows.
fn ensure_rating_summary(
  tx: &Transaction<'_>,
  owner_kind: &str,
  owner_id: &str,
) -> rusqlite::Result<()> {
  let exists: bool = tx
    .query_row(
      "SELECT 1 FROM rating_summaries WHERE owner_kind = ?1 AND owner_id = ?2",
      rusqlite::params![owner_kind, owner_id],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);

  if exists {
    return Ok(());
  }

  let (count, total): (i64, i64) = tx.query_row(
    "SELECT COUNT(*), COALESCE(SUM(value), 0) FROM ratings
     WHERE owner_kind = ?1 AND owner_id = ?2 AND value > 0",
    rusqlite::params![owner_kind, owner_id],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  let now = encode_dt(Utc::now());
  tx.execute(
    "INSERT INTO rating_summaries
       (owner_kind, owner_id, rating_count, rating_total, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
     ON CONFLICT (owner_kind, owner_id) DO NOTHING",
    rusqlite::params![owner_kind, owner_id, count, total, now],
  )?;
  Ok(())
}

/// Apply a vote counter delta in place. The summary row must already exist.
fn apply_vote_delta(
  tx: &Transaction<'_>,
  owner_kind: &str,
  owner_id: &str,
  up: i64,
  down: i64,
) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE vote_summaries
     SET up_votes   = MAX(0, up_votes + ?3),
         down_votes = MAX(0, down_votes + ?4),
         updated_at = ?5
     WHERE owner_kind = ?1 AND owner_id = ?2",
    rusqlite::params![owner_kind, owner_id, up, down, encode_dt(Utc::now())],
  )?;
  Ok(())
}

/// Apply a rating sum/count delta in place. The summary row must already
/// exist.
fn apply_rating_delta(
  tx: &Transaction<'_>,
  owner_kind: &str,
  owner_id: &str,
  total: i64,
  count: i64,
) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE rating_summaries
     SET rating_total = MAX(0, rating_total + ?3),
         rating_count = MAX(0, rating_count + ?4),
         updated_at   = ?5
     WHERE owner_kind = ?1 AND owner_id = ?2",
    rusqlite::params![owner_kind, owner_id, total, count, encode_dt(Utc::now())],
  )?;
  Ok(())
}

fn fetch_vote_summary(
  tx: &Transaction<'_>,
  owner_kind: &str,
  owner_id: &str,
) -> rusqlite::Result<RawVoteSummary> {
  tx.query_row(
    "SELECT owner_kind, owner_id, up_votes, down_votes, created_at, updated_at
     FROM vote_summaries WHERE owner_kind = ?1 AND owner_id = ?2",
    rusqlite::params![owner_kind, owner_id],
    |row| {
      Ok(RawVoteSummary {
        owner_kind: row.get(0)?,
        owner_id:   row.get(1)?,
        up_votes:   row.get(2)?,
        down_votes: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
      })
    },
  )
}

fn fetch_rating_summary(
  tx: &Transaction<'_>,
  owner_kind: &str,
  owner_id: &str,
) -> rusqlite::Result<RawRatingSummary> {
  tx.query_row(
    "SELECT owner_kind, owner_id, rating_count, rating_total, created_at, updated_at
     FROM rating_summaries WHERE owner_kind = ?1 AND owner_id = ?2",
    rusqlite::params![owner_kind, owner_id],
    |row| {
      Ok(RawRatingSummary {
        owner_kind:   row.get(0)?,
        owner_id:     row.get(1)?,
        rating_count: row.get(2)?,
        rating_total: row.get(3)?,
        created_at:   row.get(4)?,
        updated_at:   row.get(5)?,
      })
    },
  )
}

// ─── TallyStore impl ─────────────────────────────────────────────────────────

impl TallyStore for SqliteStore {
  type Error = Error;

  // ── Votes ─────────────────────────────────────────────────────────────────

  async fn cast_vote(
    &self,
    voter_id: Uuid,
    owner: OwnerRef,
    value: VoteValue,
  ) -> Result<Vote> {
    self.registry.vote_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);
    let voter_id_str = encode_uuid(voter_id);
    let new_value    = value.as_i64();
    let new_vote_id  = encode_uuid(Uuid::new_v4());
    let now_str      = encode_dt(Utc::now());

    let raw: RawVote = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        ensure_vote_summary(&tx, &owner_kind, &owner_id_str)?;

        let previous: Option<(String, i64, String)> = tx
          .query_row(
            "SELECT vote_id, value, cast_at FROM votes
             WHERE owner_kind = ?1 AND owner_id = ?2 AND voter_id = ?3",
            rusqlite::params![owner_kind, owner_id_str, voter_id_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;

        let last_value = previous.as_ref().map(|(_, v, _)| *v).unwrap_or(0);

        // Summary first, then the vote row.
        let delta = vote_delta(last_value, new_value);
        apply_vote_delta(&tx, &owner_kind, &owner_id_str, delta.up, delta.down)?;

        let raw = match previous {
          Some((vote_id, _, cast_at)) => {
            tx.execute(
              "UPDATE votes SET value = ?2 WHERE vote_id = ?1",
              rusqlite::params![vote_id, new_value],
            )?;
            RawVote {
              vote_id,
              owner_kind,
              owner_id: owner_id_str,
              voter_id: voter_id_str,
              value: new_value,
              cast_at,
            }
          }
          None => {
            tx.execute(
              "INSERT INTO votes
                 (vote_id, owner_kind, owner_id, voter_id, value, cast_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![
                new_vote_id,
                owner_kind,
                owner_id_str,
                voter_id_str,
                new_value,
                now_str,
              ],
            )?;
            RawVote {
              vote_id: new_vote_id,
              owner_kind,
              owner_id: owner_id_str,
              voter_id: voter_id_str,
              value: new_value,
              cast_at: now_str,
            }
          }
        };

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    tracing::debug!(
      kind = %raw.owner_kind,
      voter = %raw.voter_id,
      value = raw.value,
      "vote cast"
    );
    raw.into_vote()
  }

  async fn retract_vote(
    &self,
    voter_id: Uuid,
    owner: OwnerRef,
  ) -> Result<Option<Vote>> {
    self.registry.vote_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);
    let voter_id_str = encode_uuid(voter_id);

    let raw: Option<RawVote> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<(String, i64, String)> = tx
          .query_row(
            "SELECT vote_id, value, cast_at FROM votes
             WHERE owner_kind = ?1 AND owner_id = ?2 AND voter_id = ?3",
            rusqlite::params![owner_kind, owner_id_str, voter_id_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;

        let raw = match existing {
          Some((vote_id, value, cast_at)) => {
            // Backfill (if any) runs while the row still exists, so the
            // subtraction below leaves the summary consistent either way.
            ensure_vote_summary(&tx, &owner_kind, &owner_id_str)?;
            let delta = vote_delta(value, 0);
            apply_vote_delta(&tx, &owner_kind, &owner_id_str, delta.up, delta.down)?;
            tx.execute(
              "DELETE FROM votes WHERE vote_id = ?1",
              rusqlite::params![vote_id],
            )?;
            Some(RawVote {
              vote_id,
              owner_kind,
              owner_id: owner_id_str,
              voter_id: voter_id_str,
              value,
              cast_at,
            })
          }
          None => None,
        };

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    if let Some(raw) = &raw {
      tracing::debug!(kind = %raw.owner_kind, voter = %raw.voter_id, "vote retracted");
    }
    raw.map(RawVote::into_vote).transpose()
  }

  async fn vote_for(
    &self,
    voter_id: Uuid,
    owner: OwnerRef,
  ) -> Result<Option<Vote>> {
    self.registry.vote_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);
    let voter_id_str = encode_uuid(voter_id);

    let raw: Option<RawVote> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT vote_id, owner_kind, owner_id, voter_id, value, cast_at
               FROM votes
               WHERE owner_kind = ?1 AND owner_id = ?2 AND voter_id = ?3",
              rusqlite::params![owner_kind, owner_id_str, voter_id_str],
              |row| {
                Ok(RawVote {
                  vote_id:    row.get(0)?,
                  owner_kind: row.get(1)?,
                  owner_id:   row.get(2)?,
                  voter_id:   row.get(3)?,
                  value:      row.get(4)?,
                  cast_at:    row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVote::into_vote).transpose()
  }

  async fn votes_for(&self, owner: OwnerRef) -> Result<Vec<Vote>> {
    self.registry.vote_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);

    let raws: Vec<RawVote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT vote_id, owner_kind, owner_id, voter_id, value, cast_at
           FROM votes
           WHERE owner_kind = ?1 AND owner_id = ?2
           ORDER BY cast_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner_kind, owner_id_str], |row| {
            Ok(RawVote {
              vote_id:    row.get(0)?,
              owner_kind: row.get(1)?,
              owner_id:   row.get(2)?,
              voter_id:   row.get(3)?,
              value:      row.get(4)?,
              cast_at:    row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVote::into_vote).collect()
  }

  async fn vote_summary(&self, owner: OwnerRef) -> Result<VoteSummary> {
    self.registry.vote_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);

    let raw: RawVoteSummary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_vote_summary(&tx, &owner_kind, &owner_id_str)?;
        let raw = fetch_vote_summary(&tx, &owner_kind, &owner_id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_summary()
  }

  async fn rebuild_vote_summaries(&self, kind: &str) -> Result<u64> {
    self.registry.vote_kind(kind)?;

    let kind_owned = kind.to_owned();
    let rebuilt: u64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "DELETE FROM vote_summaries WHERE owner_kind = ?1",
          rusqlite::params![kind_owned],
        )?;

        let owners: Vec<String> = {
          let mut stmt = tx.prepare(
            "SELECT DISTINCT owner_id FROM votes WHERE owner_kind = ?1",
          )?;
          stmt
            .query_map(rusqlite::params![kind_owned], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        for owner_id in &owners {
          ensure_vote_summary(&tx, &kind_owned, owner_id)?;
        }

        tx.commit()?;
        Ok(owners.len() as u64)
      })
      .await?;

    tracing::info!(kind, rebuilt, "rebuilt vote summaries");
    Ok(rebuilt)
  }

  // ── Ratings ───────────────────────────────────────────────────────────────

  async fn set_rating(
    &self,
    rater_id: Uuid,
    owner: OwnerRef,
    value: u32,
  ) -> Result<Rating> {
    self.registry.rating_kind(&owner.kind)?;

    let owner_kind    = owner.kind;
    let owner_id_str  = encode_uuid(owner.id);
    let rater_id_str  = encode_uuid(rater_id);
    let new_value     = i64::from(value);
    let new_rating_id = encode_uuid(Uuid::new_v4());
    let now_str       = encode_dt(Utc::now());

    let raw: RawRating = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        ensure_rating_summary(&tx, &owner_kind, &owner_id_str)?;

        let previous: Option<(String, i64, String)> = tx
          .query_row(
            "SELECT rating_id, value, rated_at FROM ratings
             WHERE owner_kind = ?1 AND owner_id = ?2 AND rater_id = ?3",
            rusqlite::params![owner_kind, owner_id_str, rater_id_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;

        let last_value = previous.as_ref().map(|(_, v, _)| *v).unwrap_or(0);

        // Summary first, then the rating row.
        let delta = rating_delta(last_value, new_value);
        apply_rating_delta(&tx, &owner_kind, &owner_id_str, delta.total, delta.count)?;

        let raw = match previous {
          Some((rating_id, _, rated_at)) => {
            tx.execute(
              "UPDATE ratings SET value = ?2 WHERE rating_id = ?1",
              rusqlite::params![rating_id, new_value],
            )?;
            RawRating {
              rating_id,
              owner_kind,
              owner_id: owner_id_str,
              rater_id: rater_id_str,
              value: new_value,
              rated_at,
            }
          }
          None => {
            tx.execute(
              "INSERT INTO ratings
                 (rating_id, owner_kind, owner_id, rater_id, value, rated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![
                new_rating_id,
                owner_kind,
                owner_id_str,
                rater_id_str,
                new_value,
                now_str,
              ],
            )?;
            RawRating {
              rating_id: new_rating_id,
              owner_kind,
              owner_id: owner_id_str,
              rater_id: rater_id_str,
              value: new_value,
              rated_at: now_str,
            }
          }
        };

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    tracing::debug!(
      kind = %raw.owner_kind,
      rater = %raw.rater_id,
      value = raw.value,
      "rating set"
    );
    raw.into_rating()
  }

  async fn remove_rating(
    &self,
    rater_id: Uuid,
    owner: OwnerRef,
  ) -> Result<Option<Rating>> {
    self.registry.rating_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);
    let rater_id_str = encode_uuid(rater_id);

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<(String, i64, String)> = tx
          .query_row(
            "SELECT rating_id, value, rated_at FROM ratings
             WHERE owner_kind = ?1 AND owner_id = ?2 AND rater_id = ?3",
            rusqlite::params![owner_kind, owner_id_str, rater_id_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;

        let raw = match existing {
          Some((rating_id, value, rated_at)) => {
            ensure_rating_summary(&tx, &owner_kind, &owner_id_str)?;
            // A zero-value placeholder never reached the summary, so its
            // removal is a no-op there.
            let delta = rating_delta(value, 0);
            apply_rating_delta(&tx, &owner_kind, &owner_id_str, delta.total, delta.count)?;
            tx.execute(
              "DELETE FROM ratings WHERE rating_id = ?1",
              rusqlite::params![rating_id],
            )?;
            Some(RawRating {
              rating_id,
              owner_kind,
              owner_id: owner_id_str,
              rater_id: rater_id_str,
              value,
              rated_at,
            })
          }
          None => None,
        };

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    if let Some(raw) = &raw {
      tracing::debug!(kind = %raw.owner_kind, rater = %raw.rater_id, "rating removed");
    }
    raw.map(RawRating::into_rating).transpose()
  }

  async fn rating_for(
    &self,
    rater_id: Uuid,
    owner: OwnerRef,
  ) -> Result<Option<Rating>> {
    self.registry.rating_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);
    let rater_id_str = encode_uuid(rater_id);

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT rating_id, owner_kind, owner_id, rater_id, value, rated_at
               FROM ratings
               WHERE owner_kind = ?1 AND owner_id = ?2 AND rater_id = ?3",
              rusqlite::params![owner_kind, owner_id_str, rater_id_str],
              |row| {
                Ok(RawRating {
                  rating_id:  row.get(0)?,
                  owner_kind: row.get(1)?,
                  owner_id:   row.get(2)?,
                  rater_id:   row.get(3)?,
                  value:      row.get(4)?,
                  rated_at:   row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRating::into_rating).transpose()
  }

  async fn ratings_for(&self, owner: OwnerRef) -> Result<Vec<Rating>> {
    self.registry.rating_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);

    let raws: Vec<RawRating> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT rating_id, owner_kind, owner_id, rater_id, value, rated_at
           FROM ratings
           WHERE owner_kind = ?1 AND owner_id = ?2
           ORDER BY rated_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner_kind, owner_id_str], |row| {
            Ok(RawRating {
              rating_id:  row.get(0)?,
              owner_kind: row.get(1)?,
              owner_id:   row.get(2)?,
              rater_id:   row.get(3)?,
              value:      row.get(4)?,
              rated_at:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRating::into_rating).collect()
  }

  async fn rating_summary(&self, owner: OwnerRef) -> Result<RatingSummary> {
    self.registry.rating_kind(&owner.kind)?;

    let owner_kind   = owner.kind;
    let owner_id_str = encode_uuid(owner.id);

    let raw: RawRatingSummary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_rating_summary(&tx, &owner_kind, &owner_id_str)?;
        let raw = fetch_rating_summary(&tx, &owner_kind, &owner_id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_summary()
  }

  async fn rebuild_rating_summaries(&self, kind: &str) -> Result<u64> {
    self.registry.rating_kind(kind)?;

    let kind_owned = kind.to_owned();
    let rebuilt: u64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "DELETE FROM rating_summaries WHERE owner_kind = ?1",
          rusqlite::params![kind_owned],
        )?;

        let owners: Vec<String> = {
          let mut stmt = tx.prepare(
            "SELECT DISTINCT owner_id FROM ratings WHERE owner_kind = ?1",
          )?;
          stmt
            .query_map(rusqlite::params![kind_owned], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        for owner_id in &owners {
          ensure_rating_summary(&tx, &kind_owned, owner_id)?;
        }

        tx.commit()?;
        Ok(owners.len() as u64)
      })
      .await?;

    tracing::info!(kind, rebuilt, "rebuilt rating summaries");
    Ok(rebuilt)
  }
}
