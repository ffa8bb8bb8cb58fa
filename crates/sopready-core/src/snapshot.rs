//! Immutable, point-in-time copies of a facility's readiness.
//!
//! A facility's snapshots form its trend series, ordered by `snapshot_date`.
//! They are never recomputed against later catalog or review changes.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, SubsecRound as _, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
  Error, Result,
  facility::Facility,
  readiness::{Band, FacilityReadiness},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub snapshot_id:        Uuid,
  pub facility_id:        Uuid,
  pub snapshot_date:      DateTime<Utc>,
  pub total_required:     u32,
  pub current_count:      u32,
  pub needs_update_count: u32,
  pub missing_count:      u32,
  pub readiness_pct:      u8,
}

impl Snapshot {
  /// Freeze `readiness` for `facility` at `at`.
  ///
  /// Fails with [`Error::Validation`] if the readiness belongs to a different
  /// facility or its counts are not internally consistent; nothing should be
  /// persisted in that case.
  pub fn capture(
    facility: &Facility,
    readiness: &FacilityReadiness,
    at: DateTime<Utc>,
  ) -> Result<Self> {
    if readiness.facility_id != facility.facility_id {
      return Err(Error::validation(format!(
        "readiness for facility {} cannot be captured for facility {}",
        readiness.facility_id, facility.facility_id
      )));
    }
    if !readiness.is_consistent() {
      return Err(Error::validation(format!(
        "inconsistent readiness for facility {}: {} + {} + {} != {} or pct {}",
        facility.facility_id,
        readiness.current_count,
        readiness.needs_update_count,
        readiness.missing_count,
        readiness.total_required,
        readiness.readiness_pct,
      )));
    }

    Ok(Self {
      snapshot_id:        Uuid::new_v4(),
      facility_id:        facility.facility_id,
      snapshot_date:      at,
      total_required:     readiness.total_required,
      current_count:      readiness.current_count,
      needs_update_count: readiness.needs_update_count,
      missing_count:      readiness.missing_count,
      readiness_pct:      readiness.readiness_pct,
    })
  }

  pub fn readiness(&self) -> FacilityReadiness {
    FacilityReadiness {
      facility_id:        self.facility_id,
      total_required:     self.total_required,
      current_count:      self.current_count,
      needs_update_count: self.needs_update_count,
      missing_count:      self.missing_count,
      readiness_pct:      self.readiness_pct,
    }
  }

  pub fn band(&self) -> Band { Band::from_pct(self.readiness_pct) }

  /// Place this snapshot after `latest`, the newest date already in the
  /// facility's series. A date that does not come after it is moved to one
  /// microsecond past it; otherwise the snapshot is unchanged.
  pub fn ordered_after(mut self, latest: Option<DateTime<Utc>>) -> Self {
    if let Some(latest) = latest
      && self.snapshot_date <= latest
    {
      self.snapshot_date = latest + TimeDelta::microseconds(1);
    }
    self
  }
}

// ─── Range ───────────────────────────────────────────────────────────────────

/// Inclusive bounds on `snapshot_date` for history reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRange {
  pub since: Option<DateTime<Utc>>,
  pub until: Option<DateTime<Utc>>,
}

impl SnapshotRange {
  pub fn all() -> Self { Self::default() }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.since.is_none_or(|s| at >= s) && self.until.is_none_or(|u| at <= u)
  }

  /// Snap the bounds to the microsecond precision snapshot dates are stored
  /// at: `since` rounds up, `until` rounds down. The set of stored snapshots
  /// the range contains is unchanged.
  pub fn to_micros(self) -> Self {
    let ceil = |at: DateTime<Utc>| {
      let floor = at.trunc_subsecs(6);
      if floor < at { floor + TimeDelta::microseconds(1) } else { floor }
    };
    Self {
      since: self.since.map(ceil),
      until: self.until.map(|at| at.trunc_subsecs(6)),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if let (Some(since), Some(until)) = (self.since, self.until)
      && since > until
    {
      return Err(Error::validation("`since` must not be after `until`"));
    }
    Ok(())
  }
}

// ─── Write locks ─────────────────────────────────────────────────────────────

/// One async mutex per facility, so at most one snapshot write per facility
/// is in flight. Captures for different facilities do not contend.
#[derive(Debug, Default)]
pub struct SnapshotLocks {
  inflight: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SnapshotLocks {
  pub fn new() -> Self { Self::default() }

  pub async fn acquire(&self, facility_id: Uuid) -> OwnedMutexGuard<()> {
    let lock = {
      let mut inflight = self.inflight.lock().await;
      Arc::clone(
        inflight
          .entry(facility_id)
          .or_insert_with(|| Arc::new(Mutex::new(()))),
      )
    };
    lock.lock_owned().await
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;
  use crate::{readiness::aggregate, status::SopStatus};

  fn facility() -> Facility {
    Facility {
      facility_id: Uuid::new_v4(),
      name:        "North Packhouse".into(),
      code:        "NPH".into(),
      created_at:  Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  #[test]
  fn capture_freezes_counts() {
    let f = facility();
    let r = aggregate(f.facility_id, &[SopStatus::Current, SopStatus::Missing]);
    let at = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();

    let snap = Snapshot::capture(&f, &r, at).unwrap();
    assert_eq!(snap.facility_id, f.facility_id);
    assert_eq!(snap.snapshot_date, at);
    assert_eq!(snap.readiness(), r);
    assert_eq!(snap.readiness_pct, 50);
    assert_eq!(snap.band(), Band::Warning);
  }

  #[test]
  fn capture_rejects_foreign_readiness() {
    let f = facility();
    let r = aggregate(Uuid::new_v4(), &[SopStatus::Current]);
    let err = Snapshot::capture(&f, &r, Utc::now()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn capture_rejects_inconsistent_counts() {
    let f = facility();
    let mut r = aggregate(f.facility_id, &[SopStatus::Current, SopStatus::Current]);
    r.missing_count = 1;
    assert!(matches!(
      Snapshot::capture(&f, &r, Utc::now()),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn each_capture_gets_a_fresh_id() {
    let f = facility();
    let r = aggregate(f.facility_id, &[]);
    let at = Utc::now();
    let a = Snapshot::capture(&f, &r, at).unwrap();
    let b = Snapshot::capture(&f, &r, at).unwrap();
    assert_ne!(a.snapshot_id, b.snapshot_id);
  }

  #[test]
  fn range_bounds_are_inclusive() {
    let t = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let range = SnapshotRange { since: Some(t), until: Some(t + TimeDelta::days(1)) };
    assert!(range.contains(t));
    assert!(range.contains(t + TimeDelta::days(1)));
    assert!(!range.contains(t - TimeDelta::seconds(1)));
    assert!(SnapshotRange::all().contains(t));

    let backwards = SnapshotRange { since: range.until, until: range.since };
    assert!(backwards.validate().is_err());
  }

  #[test]
  fn range_snaps_to_stored_precision() {
    let t = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let nudge = TimeDelta::nanoseconds(1);
    let range = SnapshotRange { since: Some(t + nudge), until: Some(t + nudge) }.to_micros();

    assert_eq!(range.since, Some(t + TimeDelta::microseconds(1)));
    assert_eq!(range.until, Some(t));
    // A snapshot stored at `t` is before `since` either way.
    assert!(!range.contains(t));

    let exact = SnapshotRange { since: Some(t), until: Some(t) }.to_micros();
    assert_eq!(exact, SnapshotRange { since: Some(t), until: Some(t) });
  }

  #[test]
  fn ordered_after_moves_only_stale_dates() {
    let f = facility();
    let t = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
    let snap = Snapshot::capture(&f, &aggregate(f.facility_id, &[]), t).unwrap();

    assert_eq!(snap.clone().ordered_after(None).snapshot_date, t);
    assert_eq!(
      snap.clone().ordered_after(Some(t - TimeDelta::seconds(1))).snapshot_date,
      t
    );
    assert_eq!(
      snap.clone().ordered_after(Some(t)).snapshot_date,
      t + TimeDelta::microseconds(1)
    );
    let ahead = t + TimeDelta::hours(1);
    assert_eq!(
      snap.ordered_after(Some(ahead)).snapshot_date,
      ahead + TimeDelta::microseconds(1)
    );
  }

  #[tokio::test]
  async fn locks_are_per_facility() {
    let locks = SnapshotLocks::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let _held = locks.acquire(a).await;
    // A different facility is not blocked.
    let _other = locks.acquire(b).await;

    let inflight = locks.inflight.lock().await;
    let lock_a = Arc::clone(&inflight[&a]);
    drop(inflight);
    assert!(lock_a.try_lock().is_err());
  }
}
