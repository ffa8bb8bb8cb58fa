//! Collaborator traits consumed by the readiness engine.
//!
//! They are implemented by storage backends (e.g. `sopready-store-sqlite`).
//! Higher layers depend on these abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). Backends surface
//! failures; they never retry.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  facility::{Facility, NewFacility},
  requirement::{NewRequirement, SopRequirement},
  review::{NewReview, ReviewRecord},
  snapshot::{Snapshot, SnapshotRange},
};

/// Errors surfaced by a backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The write was refused because a unique key (facility or requirement
  /// code) is already taken.
  fn is_conflict(&self) -> bool { false }
}

/// The error type shared by every collaborator a backend implements.
pub trait DataSource: Send + Sync {
  type Error: StoreError;
}

pub trait FacilitySource: DataSource {
  /// All facilities, in no particular order.
  fn list_facilities(
    &self,
  ) -> impl Future<Output = Result<Vec<Facility>, Self::Error>> + Send + '_;

  /// Retrieve a facility by id. Returns `None` if not found.
  fn get_facility(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Facility>, Self::Error>> + Send + '_;
}

pub trait RequirementSource: DataSource {
  /// Requirements that apply to `facility_id`.
  fn list_applicable_requirements(
    &self,
    facility_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SopRequirement>, Self::Error>> + Send + '_;

  /// The whole catalog.
  fn list_requirements(
    &self,
  ) -> impl Future<Output = Result<Vec<SopRequirement>, Self::Error>> + Send + '_;
}

pub trait ReviewSource: DataSource {
  /// The review that currently counts for the pair: greatest `reviewed_on`,
  /// ties broken by the most recently recorded.
  fn latest_review(
    &self,
    facility_id: Uuid,
    requirement_id: Uuid,
  ) -> impl Future<Output = Result<Option<ReviewRecord>, Self::Error>> + Send + '_;

  /// Every review for the pair, newest first.
  fn review_history(
    &self,
    facility_id: Uuid,
    requirement_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ReviewRecord>, Self::Error>> + Send + '_;
}

/// Append-only snapshot persistence keyed by facility.
pub trait SnapshotStore: DataSource {
  /// Append `snapshot` to its facility's series and return it as stored.
  ///
  /// Reading the facility's latest `snapshot_date` and inserting happen in
  /// one atomic step: if the new date is not after the latest one, it is
  /// moved one microsecond past it (see [`Snapshot::ordered_after`]). This
  /// keeps the series strictly increasing across every writer sharing the
  /// backend. Never overwrites.
  fn insert_snapshot<'a>(
    &'a self,
    snapshot: &'a Snapshot,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + 'a;

  /// Snapshots for `facility_id` within `range`, oldest first.
  fn list_snapshots(
    &self,
    facility_id: Uuid,
    range: SnapshotRange,
  ) -> impl Future<Output = Result<Vec<Snapshot>, Self::Error>> + Send + '_;

  fn latest_snapshot(
    &self,
    facility_id: Uuid,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_;
}

/// Write side of the facility/catalog/ledger administration surface.
///
/// Inputs arrive already validated by [`crate::gap::GapAnalysis`], stamped
/// with the service clock's `at`. A code that is already taken must come back
/// as an error whose [`StoreError::is_conflict`] is true.
pub trait Registry: DataSource {
  fn add_facility(
    &self,
    input: NewFacility,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Facility, Self::Error>> + Send + '_;

  fn add_requirement(
    &self,
    input: NewRequirement,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<SopRequirement, Self::Error>> + Send + '_;

  /// Append a review to the ledger with `recorded_at = at`.
  fn record_review(
    &self,
    input: NewReview,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<ReviewRecord, Self::Error>> + Send + '_;
}

/// Everything the readiness engine reads.
pub trait ReadinessSource:
  FacilitySource + RequirementSource + ReviewSource + SnapshotStore
{
}

impl<T> ReadinessSource for T where
  T: FacilitySource + RequirementSource + ReviewSource + SnapshotStore
{
}

/// A backend that can serve the whole application.
pub trait ComplianceStore: ReadinessSource + Registry {}

impl<T> ComplianceStore for T where T: ReadinessSource + Registry {}
