//! SOP requirements: the catalog of documents a facility must maintain.
//!
//! Requirements are created by administration and are treated as immutable
//! for the duration of a single evaluation pass.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Priority ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  Medium,
  High,
}

// ─── Cadence ─────────────────────────────────────────────────────────────────

/// The maximum number of days allowed between reviews before an SOP is stale.
///
/// Always at least one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Cadence(u32);

impl Cadence {
  pub fn days(days: u32) -> Result<Self> {
    if days == 0 {
      return Err(Error::validation("review cadence must be at least one day"));
    }
    Ok(Self(days))
  }

  pub fn as_days(self) -> u32 { self.0 }
}

impl TryFrom<u32> for Cadence {
  type Error = Error;

  fn try_from(days: u32) -> Result<Self> { Self::days(days) }
}

impl From<Cadence> for u32 {
  fn from(c: Cadence) -> Self { c.0 }
}

impl fmt::Display for Cadence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}d", self.0)
  }
}

// ─── Applicability ───────────────────────────────────────────────────────────

/// Which facilities a requirement applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "facility_ids", rename_all = "snake_case")]
pub enum Applicability {
  #[default]
  AllFacilities,
  Facilities(Vec<Uuid>),
}

impl Applicability {
  pub fn includes(&self, facility_id: Uuid) -> bool {
    match self {
      Self::AllFacilities => true,
      Self::Facilities(ids) => ids.contains(&facility_id),
    }
  }
}

// ─── Requirement ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopRequirement {
  pub requirement_id: Uuid,
  /// Catalog code, unique across requirements (e.g. `"SOP-07"`).
  pub code:           String,
  pub title:          String,
  pub category:       String,
  pub priority:       Priority,
  #[serde(rename = "cadence_days")]
  pub cadence:        Cadence,
  pub applicability:  Applicability,
  pub created_at:     DateTime<Utc>,
}

impl SopRequirement {
  pub fn applies_to(&self, facility_id: Uuid) -> bool {
    self.applicability.includes(facility_id)
  }
}

/// Input for adding a requirement to the catalog. Also the shape of a
/// `[[catalog]]` entry in the server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequirement {
  pub code:          String,
  pub title:         String,
  pub category:      String,
  pub priority:      Priority,
  #[serde(rename = "cadence_days")]
  pub cadence:       Cadence,
  #[serde(default)]
  pub applicability: Applicability,
}

impl NewRequirement {
  pub fn validate(&self) -> Result<()> {
    if self.code.trim().is_empty() {
      return Err(Error::validation("requirement code must not be empty"));
    }
    if self.title.trim().is_empty() {
      return Err(Error::validation("requirement title must not be empty"));
    }
    if self.category.trim().is_empty() {
      return Err(Error::validation("requirement category must not be empty"));
    }
    if let Applicability::Facilities(ids) = &self.applicability
      && ids.is_empty()
    {
      return Err(Error::validation(
        "facility-scoped requirement must name at least one facility",
      ));
    }
    Ok(())
  }
}
