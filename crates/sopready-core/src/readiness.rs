//! The readiness aggregator and severity banding.
//!
//! All arithmetic is integral; the percentage is rounded half-up.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::SopStatus;

/// Per-facility counts of classified requirements.
///
/// `current_count + needs_update_count + missing_count == total_required`
/// always holds for values produced by [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityReadiness {
  pub facility_id:        Uuid,
  pub total_required:     u32,
  pub current_count:      u32,
  pub needs_update_count: u32,
  pub missing_count:      u32,
  /// `round(current / total * 100)`, or 0 when nothing is required.
  pub readiness_pct:      u8,
}

impl FacilityReadiness {
  pub fn band(&self) -> Band { Band::from_pct(self.readiness_pct) }

  /// True when the buckets partition the total and the percentage matches
  /// the counts.
  pub fn is_consistent(&self) -> bool {
    let sum = u64::from(self.current_count)
      + u64::from(self.needs_update_count)
      + u64::from(self.missing_count);
    sum == u64::from(self.total_required)
      && self.readiness_pct == readiness_pct(self.current_count, self.total_required)
  }
}

/// Count each status bucket for one facility. Never fails; an empty list
/// yields all zeroes.
pub fn aggregate(facility_id: Uuid, statuses: &[SopStatus]) -> FacilityReadiness {
  let mut current = 0u32;
  let mut needs_update = 0u32;
  let mut missing = 0u32;
  for status in statuses {
    match status {
      SopStatus::Current => current += 1,
      SopStatus::NeedsUpdate => needs_update += 1,
      SopStatus::Missing => missing += 1,
    }
  }
  let total = current + needs_update + missing;

  FacilityReadiness {
    facility_id,
    total_required: total,
    current_count: current,
    needs_update_count: needs_update,
    missing_count: missing,
    readiness_pct: readiness_pct(current, total),
  }
}

/// Percentage of `current` in `total`, rounded half-up. Zero when `total` is
/// zero; clamped to 100 if `current` exceeds `total`.
pub fn readiness_pct(current: u32, total: u32) -> u8 {
  if total == 0 {
    return 0;
  }
  let current = u64::from(current.min(total));
  let total = u64::from(total);
  ((current * 200 + total) / (total * 2)) as u8
}

// ─── Banding ─────────────────────────────────────────────────────────────────

/// Severity band for a readiness percentage. The single source of truth for
/// every view that colours a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
  Critical,
  Warning,
  Healthy,
}

impl Band {
  pub const WARNING_FROM: u8 = 50;
  pub const HEALTHY_FROM: u8 = 80;

  pub fn from_pct(pct: u8) -> Self {
    if pct >= Self::HEALTHY_FROM {
      Self::Healthy
    } else if pct >= Self::WARNING_FROM {
      Self::Warning
    } else {
      Self::Critical
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn one_of_each_is_thirty_three_percent() {
    let r = aggregate(
      Uuid::nil(),
      &[SopStatus::Current, SopStatus::NeedsUpdate, SopStatus::Missing],
    );
    assert_eq!(r.total_required, 3);
    assert_eq!((r.current_count, r.needs_update_count, r.missing_count), (1, 1, 1));
    assert_eq!(r.readiness_pct, 33);
    assert!(r.is_consistent());
  }

  #[test]
  fn empty_requirement_set_is_zero_not_an_error() {
    let r = aggregate(Uuid::nil(), &[]);
    assert_eq!(r.total_required, 0);
    assert_eq!(r.readiness_pct, 0);
    assert_eq!(r.band(), Band::Critical);
    assert!(r.is_consistent());
  }

  #[test]
  fn percentage_rounds_rather_than_truncates() {
    assert_eq!(readiness_pct(2, 3), 67);
    assert_eq!(readiness_pct(1, 3), 33);
    assert_eq!(readiness_pct(1, 6), 17);
  }

  #[test]
  fn ties_round_half_up() {
    // 1/8 = 12.5%, 3/8 = 37.5%, 1/200 = 0.5%
    assert_eq!(readiness_pct(1, 8), 13);
    assert_eq!(readiness_pct(3, 8), 38);
    assert_eq!(readiness_pct(1, 200), 1);
  }

  #[test]
  fn percentage_stays_within_bounds() {
    for total in 0..=40u32 {
      for current in 0..=total {
        let pct = readiness_pct(current, total);
        assert!(pct <= 100);
        if current == total && total > 0 {
          assert_eq!(pct, 100);
        }
      }
    }
    assert_eq!(readiness_pct(7, 5), 100);
  }

  #[test]
  fn counts_always_partition_the_total() {
    let statuses = [
      SopStatus::Current,
      SopStatus::Current,
      SopStatus::Missing,
      SopStatus::NeedsUpdate,
      SopStatus::Current,
    ];
    for n in 0..=statuses.len() {
      let r = aggregate(Uuid::nil(), &statuses[..n]);
      assert_eq!(r.total_required as usize, n);
      assert!(r.is_consistent());
    }
  }

  #[test]
  fn band_thresholds() {
    assert_eq!(Band::from_pct(0), Band::Critical);
    assert_eq!(Band::from_pct(49), Band::Critical);
    assert_eq!(Band::from_pct(50), Band::Warning);
    assert_eq!(Band::from_pct(79), Band::Warning);
    assert_eq!(Band::from_pct(80), Band::Healthy);
    assert_eq!(Band::from_pct(100), Band::Healthy);
  }
}
