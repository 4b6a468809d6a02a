//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per (voter, owner): a vote is edited in place, never duplicated.
CREATE TABLE IF NOT EXISTS votes (
    vote_id     TEXT PRIMARY KEY,
    owner_kind  TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    voter_id    TEXT NOT NULL,
    value       INTEGER NOT NULL CHECK (value IN (1, -1)),
    cast_at     TEXT NOT NULL,   -- ISO 8601 UTC; set on first cast
    UNIQUE (owner_kind, owner_id, voter_id)
);

CREATE TABLE IF NOT EXISTS vote_summaries (
    owner_kind  TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    up_votes    INTEGER NOT NULL DEFAULT 0,
    down_votes  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (owner_kind, owner_id)
);

-- value 0 is the 'no rating' placeholder; real ratings are positive.
CREATE TABLE IF NOT EXISTS ratings (
    rating_id   TEXT PRIMARY KEY,
    owner_kind  TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    rater_id    TEXT NOT NULL,
    value       INTEGER NOT NULL DEFAULT 0 CHECK (value >= 0),
    rated_at    TEXT NOT NULL,
    UNIQUE (owner_kind, owner_id, rater_id)
);

CREATE TABLE IF NOT EXISTS rating_summaries (
    owner_kind   TEXT NOT NULL,
    owner_id     TEXT NOT NULL,
    rating_count INTEGER NOT NULL DEFAULT 0,
    rating_total INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    PRIMARY KEY (owner_kind, owner_id)
);

CREATE INDEX IF NOT EXISTS votes_owner_idx   ON votes(owner_kind, owner_id);
CREATE INDEX IF NOT EXISTS votes_cast_idx    ON votes(cast_at);
CREATE INDEX IF NOT EXISTS ratings_owner_idx ON ratings(owner_kind, owner_id);
CREATE INDEX IF NOT EXISTS ratings_rated_idx ON ratings(rated_at);

PRAGMA user_version = 1;
";
