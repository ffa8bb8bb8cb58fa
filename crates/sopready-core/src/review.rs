//! The review ledger: who reviewed which SOP for which facility, and when.
//!
//! Reviews are append-only. Only the latest review for a (facility,
//! requirement) pair affects classification; older ones remain as audit
//! trail.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
  pub review_id:      Uuid,
  pub facility_id:    Uuid,
  pub requirement_id: Uuid,
  /// Calendar date the review was completed.
  pub reviewed_on:    NaiveDate,
  pub reviewer:       String,
  /// When the review was entered into the ledger; server-assigned.
  pub recorded_at:    DateTime<Utc>,
}

/// Input for recording a completed review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
  pub facility_id:    Uuid,
  pub requirement_id: Uuid,
  pub reviewed_on:    NaiveDate,
  pub reviewer:       String,
}

impl NewReview {
  /// Reject blank reviewers and reviews dated after `today`.
  pub fn validate(&self, today: NaiveDate) -> Result<()> {
    if self.reviewer.trim().is_empty() {
      return Err(Error::validation("reviewer must not be empty"));
    }
    if self.reviewed_on > today {
      return Err(Error::validation(format!(
        "review date {} is in the future",
        self.reviewed_on
      )));
    }
    Ok(())
  }
}
