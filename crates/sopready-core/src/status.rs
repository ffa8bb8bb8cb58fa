//! The status classifier.
//!
//! A requirement's status is never stored. It is derived from the latest
//! review and the evaluation instant on every query, so `current` decays to
//! `needs_update` purely through time passing.

use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, requirement::SopRequirement, review::ReviewRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SopStatus {
  /// Reviewed within its cadence.
  Current,
  /// Reviewed at some point, but the cadence has lapsed.
  NeedsUpdate,
  /// Never reviewed for this facility.
  Missing,
}

/// Classify one requirement for one facility at `now`.
///
/// The cadence boundary is inclusive: a review exactly `cadence` days old is
/// still `Current`. Age is counted in whole calendar days in UTC.
pub fn classify(
  requirement: &SopRequirement,
  review: Option<&ReviewRecord>,
  now: DateTime<Utc>,
) -> SopStatus {
  let Some(review) = review else {
    return SopStatus::Missing;
  };

  let age = now
    .date_naive()
    .signed_duration_since(review.reviewed_on)
    .num_days();

  if age <= i64::from(requirement.cadence.as_days()) {
    SopStatus::Current
  } else {
    SopStatus::NeedsUpdate
  }
}

/// The last day on which `review` still keeps `requirement` current.
pub fn due_on(requirement: &SopRequirement, review: &ReviewRecord) -> Option<NaiveDate> {
  review
    .reviewed_on
    .checked_add_days(Days::new(u64::from(requirement.cadence.as_days())))
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Post-filter over a facility's requirement rows. Never affects counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
  #[default]
  All,
  Current,
  NeedsUpdate,
  Missing,
}

impl StatusFilter {
  pub fn matches(self, status: SopStatus) -> bool {
    match self {
      Self::All => true,
      Self::Current => status == SopStatus::Current,
      Self::NeedsUpdate => status == SopStatus::NeedsUpdate,
      Self::Missing => status == SopStatus::Missing,
    }
  }
}

impl FromStr for StatusFilter {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "all" => Ok(Self::All),
      "current" => Ok(Self::Current),
      "needs_update" => Ok(Self::NeedsUpdate),
      "missing" => Ok(Self::Missing),
      other => Err(Error::validation(format!("unknown status filter: {other:?}"))),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};
  use uuid::Uuid;

  use super::*;
  use crate::requirement::{Applicability, Cadence, Priority};

  fn requirement(cadence_days: u32) -> SopRequirement {
    SopRequirement {
      requirement_id: Uuid::new_v4(),
      code:           "SOP-01".into(),
      title:          "Pest control".into(),
      category:       "Sanitation".into(),
      priority:       Priority::Medium,
      cadence:        Cadence::days(cadence_days).unwrap(),
      applicability:  Applicability::AllFacilities,
      created_at:     Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn reviewed(days_ago: i64, now: DateTime<Utc>) -> ReviewRecord {
    ReviewRecord {
      review_id:      Uuid::new_v4(),
      facility_id:    Uuid::new_v4(),
      requirement_id: Uuid::new_v4(),
      reviewed_on:    (now - TimeDelta::days(days_ago)).date_naive(),
      reviewer:       "qa-lead".into(),
      recorded_at:    now,
    }
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap() }

  #[test]
  fn no_review_is_missing_whatever_the_cadence() {
    for days in [1, 30, 365, 10_000] {
      assert_eq!(classify(&requirement(days), None, now()), SopStatus::Missing);
    }
  }

  #[test]
  fn review_within_cadence_is_current() {
    let r = reviewed(10, now());
    assert_eq!(classify(&requirement(365), Some(&r), now()), SopStatus::Current);
  }

  #[test]
  fn cadence_boundary_is_inclusive() {
    let r = reviewed(90, now());
    assert_eq!(classify(&requirement(90), Some(&r), now()), SopStatus::Current);
  }

  #[test]
  fn one_day_past_cadence_needs_update_not_missing() {
    let r = reviewed(91, now());
    assert_eq!(classify(&requirement(90), Some(&r), now()), SopStatus::NeedsUpdate);

    let long_ago = reviewed(5_000, now());
    assert_eq!(
      classify(&requirement(90), Some(&long_ago), now()),
      SopStatus::NeedsUpdate
    );
  }

  #[test]
  fn time_of_day_does_not_shift_the_boundary() {
    let r = reviewed(30, now());
    let late = Utc.with_ymd_and_hms(2024, 6, 15, 23, 59, 59).unwrap();
    assert_eq!(classify(&requirement(30), Some(&r), late), SopStatus::Current);
  }

  #[test]
  fn future_dated_review_is_current() {
    let r = reviewed(-3, now());
    assert_eq!(classify(&requirement(30), Some(&r), now()), SopStatus::Current);
  }

  #[test]
  fn classification_is_idempotent_for_a_frozen_now() {
    let req = requirement(30);
    let r = reviewed(31, now());
    let first = classify(&req, Some(&r), now());
    for _ in 0..5 {
      assert_eq!(classify(&req, Some(&r), now()), first);
    }
  }

  #[test]
  fn due_on_adds_cadence() {
    let r = reviewed(10, now());
    let due = due_on(&requirement(30), &r).unwrap();
    assert_eq!(due, (now() + TimeDelta::days(20)).date_naive());
  }

  #[test]
  fn filter_parsing_and_matching() {
    assert_eq!("needs_update".parse::<StatusFilter>().unwrap(), StatusFilter::NeedsUpdate);
    assert!("stale".parse::<StatusFilter>().is_err());
    assert!(StatusFilter::All.matches(SopStatus::Missing));
    assert!(StatusFilter::Missing.matches(SopStatus::Missing));
    assert!(!StatusFilter::Current.matches(SopStatus::NeedsUpdate));
  }
}
