//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, and vote/rating values as plain INTEGERs.

use chrono::{DateTime, Utc};
use tally_core::{
  owner::OwnerRef,
  rating::{Rating, RatingSummary},
  vote::{Vote, VoteSummary, VoteValue},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Stored values ───────────────────────────────────────────────────────────

pub fn decode_vote_value(raw: i64) -> Result<VoteValue> {
  match raw {
    1 => Ok(VoteValue::Up),
    -1 => Ok(VoteValue::Down),
    other => Err(Error::InvalidVoteValue(other)),
  }
}

pub fn decode_rating_value(raw: i64) -> Result<u32> {
  u32::try_from(raw).map_err(|_| Error::InvalidRatingValue(raw))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `votes` row.
pub struct RawVote {
  pub vote_id:    String,
  pub owner_kind: String,
  pub owner_id:   String,
  pub voter_id:   String,
  pub value:      i64,
  pub cast_at:    String,
}

impl RawVote {
  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      vote_id:  decode_uuid(&self.vote_id)?,
      voter_id: decode_uuid(&self.voter_id)?,
      owner:    OwnerRef::new(self.owner_kind, decode_uuid(&self.owner_id)?),
      value:    decode_vote_value(self.value)?,
      cast_at:  decode_dt(&self.cast_at)?,
    })
  }
}

/// Raw values read directly from a `vote_summaries` row.
pub struct RawVoteSummary {
  pub owner_kind: String,
  pub owner_id:   String,
  pub up_votes:   i64,
  pub down_votes: i64,
  pub created_at: String,
  pub updated_at: String,
}

impl RawVoteSummary {
  pub fn into_summary(self) -> Result<VoteSummary> {
    Ok(VoteSummary {
      owner:      OwnerRef::new(self.owner_kind, decode_uuid(&self.owner_id)?),
      up_votes:   self.up_votes.max(0) as u64,
      down_votes: self.down_votes.max(0) as u64,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `ratings` row.
pub struct RawRating {
  pub rating_id:  String,
  pub owner_kind: String,
  pub owner_id:   String,
  pub rater_id:   String,
  pub value:      i64,
  pub rated_at:   String,
}

impl RawRating {
  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      rating_id: decode_uuid(&self.rating_id)?,
      rater_id:  decode_uuid(&self.rater_id)?,
      owner:     OwnerRef::new(self.owner_kind, decode_uuid(&self.owner_id)?),
      value:     decode_rating_value(self.value)?,
      rated_at:  decode_dt(&self.rated_at)?,
    })
  }
}

/// Raw values read directly from a `rating_summaries` row.
pub struct RawRatingSummary {
  pub owner_kind:   String,
  pub owner_id:     String,
  pub rating_count: i64,
  pub rating_total: i64,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawRatingSummary {
  pub fn into_summary(self) -> Result<RatingSummary> {
    Ok(RatingSummary {
      owner:        OwnerRef::new(self.owner_kind, decode_uuid(&self.owner_id)?),
      rating_count: self.rating_count.max(0) as u64,
      rating_total: self.rating_total.max(0) as u64,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}
