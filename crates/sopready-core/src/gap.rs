//! The gap analysis service.
//!
//! Orchestrates classification and aggregation over the collaborators in
//! [`crate::store`] to answer the facility summary and facility detail
//! queries, and performs snapshot capture.
//!
//! Both query paths go through [`GapAnalysis::evaluate`], so a facility's
//! statuses are computed identically wherever they are shown. Each pass reads
//! the clock once. Collaborator failures propagate as [`Error::Upstream`];
//! no partial or cached result is ever returned in their place.

use std::{cmp::Ordering, str::FromStr, sync::Arc};

use chrono::{DateTime, NaiveDate, SubsecRound as _, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  clock::{Clock, SystemClock},
  facility::Facility,
  readiness::{Band, FacilityReadiness, aggregate},
  requirement::SopRequirement,
  review::ReviewRecord,
  snapshot::{Snapshot, SnapshotLocks, SnapshotRange},
  status::{SopStatus, StatusFilter, classify, due_on},
  store::{ReadinessSource, StoreError},
};

// ─── Result shapes ───────────────────────────────────────────────────────────

/// One requirement as resolved for one facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementStatus {
  pub requirement: SopRequirement,
  pub status:      SopStatus,
  /// The review the status was derived from, if any.
  pub last_review: Option<ReviewRecord>,
  /// Last day the latest review keeps the requirement current.
  pub due_on:      Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitySummary {
  pub facility:  Facility,
  pub readiness: FacilityReadiness,
  pub band:      Band,
}

/// The multi-facility overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
  /// The single instant every facility was evaluated against.
  pub as_of:      DateTime<Utc>,
  pub facilities: Vec<FacilitySummary>,
}

/// Everything known about one facility's readiness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityDetail {
  pub facility:     Facility,
  pub as_of:        DateTime<Utc>,
  /// Always computed over the unfiltered requirement set.
  pub readiness:    FacilityReadiness,
  pub band:         Band,
  pub filter:       StatusFilter,
  /// Rows matching `filter`, highest priority first, then by code.
  pub requirements: Vec<RequirementStatus>,
  /// Oldest first.
  pub snapshots:    Vec<Snapshot>,
}

/// Ordering of the facility summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryOrder {
  #[default]
  Name,
  Code,
  ReadinessAsc,
  ReadinessDesc,
}

impl SummaryOrder {
  fn compare(self, a: &FacilitySummary, b: &FacilitySummary) -> Ordering {
    let primary = match self {
      Self::Name => Ordering::Equal,
      Self::Code => a.facility.code.cmp(&b.facility.code),
      Self::ReadinessAsc => a.readiness.readiness_pct.cmp(&b.readiness.readiness_pct),
      Self::ReadinessDesc => b.readiness.readiness_pct.cmp(&a.readiness.readiness_pct),
    };
    primary
      .then_with(|| a.facility.name.cmp(&b.facility.name))
      .then_with(|| a.facility.facility_id.cmp(&b.facility.facility_id))
  }
}

impl FromStr for SummaryOrder {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "name" => Ok(Self::Name),
      "code" => Ok(Self::Code),
      "readiness_asc" => Ok(Self::ReadinessAsc),
      "readiness_desc" => Ok(Self::ReadinessDesc),
      other => Err(Error::validation(format!("unknown summary order: {other:?}"))),
    }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct GapAnalysis<S, C = SystemClock> {
  pub(crate) store: Arc<S>,
  pub(crate) clock: C,
  locks:            SnapshotLocks,
}

impl<S> GapAnalysis<S, SystemClock> {
  pub fn with_system_clock(store: Arc<S>) -> Self { Self::new(store, SystemClock) }
}

impl<S, C> GapAnalysis<S, C> {
  pub fn new(store: Arc<S>, clock: C) -> Self {
    Self { store, clock, locks: SnapshotLocks::new() }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn clock(&self) -> &C { &self.clock }
}

impl<S, C> GapAnalysis<S, C>
where
  S: ReadinessSource,
  C: Clock,
{
  /// Readiness for every facility, ordered by `order`.
  pub async fn summary(&self, order: SummaryOrder) -> Result<Summary> {
    let as_of = self.clock.now();
    let facilities = self.store.list_facilities().await.map_err(upstream)?;

    let mut rows = Vec::with_capacity(facilities.len());
    for facility in facilities {
      let statuses = self.evaluate(&facility, as_of).await?;
      let readiness = readiness_of(&facility, &statuses);
      rows.push(FacilitySummary { band: readiness.band(), readiness, facility });
    }
    rows.sort_by(|a, b| order.compare(a, b));

    Ok(Summary { as_of, facilities: rows })
  }

  /// Per-requirement statuses and snapshot history for one facility.
  ///
  /// `filter` narrows the returned rows only; `readiness` always reflects
  /// the full requirement set.
  pub async fn detail(&self, facility_id: Uuid, filter: StatusFilter) -> Result<FacilityDetail> {
    let facility = self.facility(facility_id).await?;
    let as_of = self.clock.now();

    let mut rows = self.evaluate(&facility, as_of).await?;
    let readiness = readiness_of(&facility, &rows);
    let snapshots = self
      .store
      .list_snapshots(facility_id, SnapshotRange::all())
      .await
      .map_err(upstream)?;

    rows.retain(|row| filter.matches(row.status));
    rows.sort_by(|a, b| {
      b.requirement
        .priority
        .cmp(&a.requirement.priority)
        .then_with(|| a.requirement.code.cmp(&b.requirement.code))
    });

    Ok(FacilityDetail {
      band: readiness.band(),
      facility,
      as_of,
      readiness,
      filter,
      requirements: rows,
      snapshots,
    })
  }

  /// The facility's snapshot series within `range`, oldest first.
  pub async fn history(&self, facility_id: Uuid, range: SnapshotRange) -> Result<Vec<Snapshot>> {
    range.validate()?;
    self.facility(facility_id).await?;
    self
      .store
      .list_snapshots(facility_id, range.to_micros())
      .await
      .map_err(upstream)
  }

  /// Recompute the facility's live readiness and persist it as a new
  /// snapshot.
  ///
  /// Captures for one facility are serialised within this service. The
  /// snapshot date is the clock reading (to microsecond precision); the store
  /// moves it just past the previous snapshot if the clock has not advanced,
  /// atomically with the insert, so the series stays strictly increasing
  /// even when another process writes to the same backend.
  pub async fn take_snapshot(&self, facility_id: Uuid) -> Result<Snapshot> {
    let facility = self.facility(facility_id).await?;
    let _guard = self.locks.acquire(facility_id).await;

    let now = self.clock.now().trunc_subsecs(6);
    let statuses = self.evaluate(&facility, now).await?;
    let readiness = readiness_of(&facility, &statuses);

    let captured = Snapshot::capture(&facility, &readiness, now)?;
    let snapshot = self
      .store
      .insert_snapshot(&captured)
      .await
      .map_err(upstream)?;

    tracing::info!(
      facility = %facility.code,
      snapshot = %snapshot.snapshot_id,
      readiness_pct = snapshot.readiness_pct,
      total_required = snapshot.total_required,
      "captured readiness snapshot"
    );
    Ok(snapshot)
  }

  pub(crate) async fn facility(&self, facility_id: Uuid) -> Result<Facility> {
    self
      .store
      .get_facility(facility_id)
      .await
      .map_err(upstream)?
      .ok_or(Error::FacilityNotFound(facility_id))
  }

  /// Classify every applicable requirement for `facility` at `now`.
  async fn evaluate(
    &self,
    facility: &Facility,
    now: DateTime<Utc>,
  ) -> Result<Vec<RequirementStatus>> {
    let requirements = self
      .store
      .list_applicable_requirements(facility.facility_id)
      .await
      .map_err(upstream)?;

    let mut rows = Vec::with_capacity(requirements.len());
    for requirement in requirements {
      // Guard against a backend handing back a requirement scoped elsewhere.
      if !requirement.applies_to(facility.facility_id) {
        continue;
      }
      let last_review = self
        .store
        .latest_review(facility.facility_id, requirement.requirement_id)
        .await
        .map_err(upstream)?;
      let status = classify(&requirement, last_review.as_ref(), now);
      let due = last_review.as_ref().and_then(|r| due_on(&requirement, r));
      rows.push(RequirementStatus {
        requirement,
        status,
        last_review,
        due_on: due,
      });
    }

    tracing::debug!(
      facility = %facility.code,
      requirements = rows.len(),
      "evaluated facility"
    );
    Ok(rows)
  }
}

fn readiness_of(facility: &Facility, rows: &[RequirementStatus]) -> FacilityReadiness {
  let statuses: Vec<SopStatus> = rows.iter().map(|r| r.status).collect();
  aggregate(facility.facility_id, &statuses)
}

pub(crate) fn upstream<E>(err: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tracing::warn!(error = %err, "collaborator failure");
  Error::upstream(err)
}

/// A write lost a race for a unique code: report it as the duplicate it is.
pub(crate) fn duplicate_or_upstream<E>(err: E, what: impl FnOnce() -> String) -> Error
where
  E: StoreError,
{
  if err.is_conflict() {
    tracing::debug!(error = %err, "write refused on a taken code");
    Error::Duplicate(what())
  } else {
    upstream(err)
  }
}
