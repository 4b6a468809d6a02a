//! Owners — the external entities that votes and ratings attach to.
//!
//! Owners are not persisted by this subsystem. A vote or rating references
//! its owner by `(kind, id)`, and the set of valid kinds is fixed at process
//! startup in an [`OwnerRegistry`] that is read-only thereafter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── OwnerRef ────────────────────────────────────────────────────────────────

/// Reference to an entity that opted into voting and/or rating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
  pub kind: String,
  pub id:   Uuid,
}

impl OwnerRef {
  pub fn new(kind: impl Into<String>, id: Uuid) -> Self {
    Self { kind: kind.into(), id }
  }
}

// ─── OwnerKind ───────────────────────────────────────────────────────────────

/// An owner kind and the aggregators it opted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerKind {
  pub name:    String,
  /// Whether this kind accepts up/down votes.
  #[serde(default)]
  pub votes:   bool,
  /// Whether this kind accepts numeric ratings.
  #[serde(default)]
  pub ratings: bool,
}

impl OwnerKind {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:    name.into(),
      votes:   false,
      ratings: false,
    }
  }

  pub fn with_votes(mut self) -> Self {
    self.votes = true;
    self
  }

  pub fn with_ratings(mut self) -> Self {
    self.ratings = true;
    self
  }
}

// ─── OwnerRegistry ───────────────────────────────────────────────────────────

/// The owner kinds known to a store, keyed by name.
///
/// Built once during process initialisation (hosts typically deserialise the
/// kind list from their own configuration) and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRegistry {
  kinds: BTreeMap<String, OwnerKind>,
}

impl OwnerRegistry {
  /// Build a registry from a list of kinds.
  /// Registering the same name twice is an error.
  pub fn new(kinds: impl IntoIterator<Item = OwnerKind>) -> Result<Self> {
    let mut map = BTreeMap::new();
    for kind in kinds {
      if map.contains_key(&kind.name) {
        return Err(Error::DuplicateOwnerKind(kind.name));
      }
      map.insert(kind.name.clone(), kind);
    }
    Ok(Self { kinds: map })
  }

  pub fn get(&self, name: &str) -> Option<&OwnerKind> { self.kinds.get(name) }

  /// Resolve a kind that must accept votes.
  pub fn vote_kind(&self, name: &str) -> Result<&OwnerKind> {
    let kind = self
      .kinds
      .get(name)
      .ok_or_else(|| Error::UnknownOwnerKind(name.to_owned()))?;
    if !kind.votes {
      return Err(Error::VotesNotRegistered(name.to_owned()));
    }
    Ok(kind)
  }

  /// Resolve a kind that must accept ratings.
  pub fn rating_kind(&self, name: &str) -> Result<&OwnerKind> {
    let kind = self
      .kinds
      .get(name)
      .ok_or_else(|| Error::UnknownOwnerKind(name.to_owned()))?;
    if !kind.ratings {
      return Err(Error::RatingsNotRegistered(name.to_owned()));
    }
    Ok(kind)
  }

  /// All registered kinds, in name order.
  pub fn kinds(&self) -> impl Iterator<Item = &OwnerKind> {
    self.kinds.values()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registry() -> OwnerRegistry {
    OwnerRegistry::new([
      OwnerKind::new("thread").with_votes().with_ratings(),
      OwnerKind::new("comment").with_votes(),
    ])
    .unwrap()
  }

  #[test]
  fn duplicate_kind_is_rejected() {
    let err = OwnerRegistry::new([
      OwnerKind::new("thread").with_votes(),
      OwnerKind::new("thread").with_ratings(),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateOwnerKind(name) if name == "thread"));
  }

  #[test]
  fn unknown_kind_error_carries_the_name() {
    let err = registry().vote_kind("widget").unwrap_err();
    assert!(matches!(err, Error::UnknownOwnerKind(name) if name == "widget"));
  }

  #[test]
  fn kind_without_ratings_is_rejected_for_ratings() {
    let reg = registry();
    assert!(reg.vote_kind("comment").is_ok());
    let err = reg.rating_kind("comment").unwrap_err();
    assert!(matches!(err, Error::RatingsNotRegistered(name) if name == "comment"));
  }
}
