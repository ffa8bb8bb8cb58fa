//! [`SqliteStore`]: the SQLite implementation of the readiness collaborators.

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use sopready_core::{
  facility::{Facility, NewFacility},
  requirement::{Applicability, NewRequirement, SopRequirement},
  review::{NewReview, ReviewRecord},
  snapshot::{Snapshot, SnapshotRange},
  store::{
    DataSource, FacilitySource, Registry, RequirementSource, ReviewSource, SnapshotStore,
  },
};

use crate::{
  Error, Result,
  encode::{
    RawFacility, RawRequirement, RawReview, RawSnapshot, decode_dt, encode_date, encode_dt,
    encode_priority, encode_uuid,
  },
  schema::SCHEMA,
};

const FACILITY_COLUMNS: &str = "facility_id, name, code, created_at";

const REQUIREMENT_COLUMNS: &str = "requirement_id, code, title, category, priority, \
                                   cadence_days, applies_to_all, created_at";

const REVIEW_COLUMNS: &str =
  "review_id, facility_id, requirement_id, reviewed_on, reviewer, recorded_at";

const SNAPSHOT_COLUMNS: &str = "snapshot_id, facility_id, snapshot_date, total_required, \
                                current_count, needs_update_count, missing_count, \
                                readiness_pct";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A readiness store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Several
/// stores (or processes) may open the same file: snapshot appends take the
/// database write lock before reading the facility's latest date.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema initialised");
    Ok(())
  }
}

/// Read requirement rows for `sql`, then fill in the facility scope of each
/// facility-scoped requirement.
fn query_requirements(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<RawRequirement>> {
  let mut rows = conn
    .prepare(sql)?
    .query_map(params, RawRequirement::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut scope = conn.prepare(
    "SELECT facility_id FROM requirement_facilities
     WHERE requirement_id = ?1
     ORDER BY facility_id",
  )?;
  for raw in rows.iter_mut().filter(|r| !r.applies_to_all) {
    raw.facility_ids = scope
      .query_map(rusqlite::params![raw.requirement_id], |r| r.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;
  }
  Ok(rows)
}

impl DataSource for SqliteStore {
  type Error = crate::Error;
}

// ─── Facilities ──────────────────────────────────────────────────────────────

impl FacilitySource for SqliteStore {
  async fn list_facilities(&self) -> Result<Vec<Facility>> {
    let raws: Vec<RawFacility> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACILITY_COLUMNS} FROM facilities ORDER BY name, code"
        ))?;
        let rows = stmt
          .query_map([], RawFacility::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFacility::into_facility).collect()
  }

  async fn get_facility(&self, id: Uuid) -> Result<Option<Facility>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFacility> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FACILITY_COLUMNS} FROM facilities WHERE facility_id = ?1"),
            rusqlite::params![id_str],
            RawFacility::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFacility::into_facility).transpose()
  }
}

// ─── Requirements ────────────────────────────────────────────────────────────

impl RequirementSource for SqliteStore {
  async fn list_applicable_requirements(&self, facility_id: Uuid) -> Result<Vec<SopRequirement>> {
    let id_str = encode_uuid(facility_id);

    let raws: Vec<RawRequirement> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {REQUIREMENT_COLUMNS} FROM sop_requirements r
           WHERE r.applies_to_all = 1
              OR EXISTS (
                SELECT 1 FROM requirement_facilities rf
                WHERE rf.requirement_id = r.requirement_id
                  AND rf.facility_id = ?1
              )
           ORDER BY r.code"
        );
        Ok(query_requirements(conn, &sql, rusqlite::params![id_str])?)
      })
      .await?;

    raws.into_iter().map(RawRequirement::into_requirement).collect()
  }

  async fn list_requirements(&self) -> Result<Vec<SopRequirement>> {
    let raws: Vec<RawRequirement> = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {REQUIREMENT_COLUMNS} FROM sop_requirements ORDER BY code");
        Ok(query_requirements(conn, &sql, rusqlite::params![])?)
      })
      .await?;

    raws.into_iter().map(RawRequirement::into_requirement).collect()
  }
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

impl ReviewSource for SqliteStore {
  async fn latest_review(
    &self,
    facility_id:    Uuid,
    requirement_id: Uuid,
  ) -> Result<Option<ReviewRecord>> {
    let facility_str    = encode_uuid(facility_id);
    let requirement_str = encode_uuid(requirement_id);

    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {REVIEW_COLUMNS} FROM reviews
               WHERE facility_id = ?1 AND requirement_id = ?2
               ORDER BY reviewed_on DESC, recorded_at DESC, rowid DESC
               LIMIT 1"
            ),
            rusqlite::params![facility_str, requirement_str],
            RawReview::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReview::into_review).transpose()
  }

  async fn review_history(
    &self,
    facility_id:    Uuid,
    requirement_id: Uuid,
  ) -> Result<Vec<ReviewRecord>> {
    let facility_str    = encode_uuid(facility_id);
    let requirement_str = encode_uuid(requirement_id);

    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_COLUMNS} FROM reviews
           WHERE facility_id = ?1 AND requirement_id = ?2
           ORDER BY reviewed_on DESC, recorded_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![facility_str, requirement_str], RawReview::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_review).collect()
  }
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<Snapshot> {
    let mut captured = snapshot.clone();
    captured.snapshot_date = captured.snapshot_date.trunc_subsecs(6);

    let stored = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so no other connection can
        // append between the read of the latest date and the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let facility_str = encode_uuid(captured.facility_id);

        let latest: Option<String> = tx
          .query_row(
            "SELECT snapshot_date FROM snapshots
             WHERE facility_id = ?1
             ORDER BY snapshot_date DESC, seq DESC
             LIMIT 1",
            rusqlite::params![facility_str],
            |row| row.get(0),
          )
          .optional()?;
        let latest = latest
          .as_deref()
          .map(decode_dt)
          .transpose()
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let stored = captured.ordered_after(latest);

        tx.execute(
          "INSERT INTO snapshots (
             snapshot_id, facility_id, snapshot_date, total_required,
             current_count, needs_update_count, missing_count, readiness_pct
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            encode_uuid(stored.snapshot_id),
            facility_str,
            encode_dt(stored.snapshot_date),
            stored.total_required,
            stored.current_count,
            stored.needs_update_count,
            stored.missing_count,
            stored.readiness_pct,
          ],
        )?;
        tx.commit()?;
        Ok(stored)
      })
      .await?;

    Ok(stored)
  }

  async fn list_snapshots(&self, facility_id: Uuid, range: SnapshotRange) -> Result<Vec<Snapshot>> {
    let range        = range.to_micros();
    let facility_str = encode_uuid(facility_id);
    let since_str    = range.since.map(encode_dt);
    let until_str    = range.until.map(encode_dt);

    let raws: Vec<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
           WHERE facility_id = ?1
             AND (?2 IS NULL OR snapshot_date >= ?2)
             AND (?3 IS NULL OR snapshot_date <= ?3)
           ORDER BY snapshot_date, seq"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![facility_str, since_str, until_str],
            RawSnapshot::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshot::into_snapshot).collect()
  }

  async fn latest_snapshot(&self, facility_id: Uuid) -> Result<Option<Snapshot>> {
    let facility_str = encode_uuid(facility_id);

    let raw: Option<RawSnapshot> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
               WHERE facility_id = ?1
               ORDER BY snapshot_date DESC, seq DESC
               LIMIT 1"
            ),
            rusqlite::params![facility_str],
            RawSnapshot::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSnapshot::into_snapshot).transpose()
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

impl Registry for SqliteStore {
  async fn add_facility(&self, input: NewFacility, at: DateTime<Utc>) -> Result<Facility> {
    let facility = Facility {
      facility_id: Uuid::new_v4(),
      name:        input.name,
      code:        input.code,
      created_at:  at,
    };

    let id_str = encode_uuid(facility.facility_id);
    let name   = facility.name.clone();
    let code   = facility.code.clone();
    let at_str = encode_dt(facility.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO facilities (facility_id, name, code, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, code, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;

    Ok(facility)
  }

  async fn add_requirement(
    &self,
    input: NewRequirement,
    at: DateTime<Utc>,
  ) -> Result<SopRequirement> {
    let requirement = SopRequirement {
      requirement_id: Uuid::new_v4(),
      code:           input.code,
      title:          input.title,
      category:       input.category,
      priority:       input.priority,
      cadence:        input.cadence,
      applicability:  input.applicability,
      created_at:     at,
    };

    let id_str       = encode_uuid(requirement.requirement_id);
    let code         = requirement.code.clone();
    let title        = requirement.title.clone();
    let category     = requirement.category.clone();
    let priority_str = encode_priority(requirement.priority);
    let cadence_days = requirement.cadence.as_days();
    let at_str       = encode_dt(requirement.created_at);
    let scope: Option<Vec<String>> = match &requirement.applicability {
      Applicability::AllFacilities => None,
      Applicability::Facilities(ids) => Some(ids.iter().copied().map(encode_uuid).collect()),
    };

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO sop_requirements (
             requirement_id, code, title, category, priority,
             cadence_days, applies_to_all, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            code,
            title,
            category,
            priority_str,
            cadence_days,
            scope.is_none(),
            at_str,
          ],
        )?;
        for facility_id in scope.iter().flatten() {
          tx.execute(
            "INSERT INTO requirement_facilities (requirement_id, facility_id)
             VALUES (?1, ?2)",
            rusqlite::params![id_str, facility_id],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;

    Ok(requirement)
  }

  async fn record_review(&self, input: NewReview, at: DateTime<Utc>) -> Result<ReviewRecord> {
    let review = ReviewRecord {
      review_id:      Uuid::new_v4(),
      facility_id:    input.facility_id,
      requirement_id: input.requirement_id,
      reviewed_on:    input.reviewed_on,
      reviewer:       input.reviewer,
      recorded_at:    at,
    };

    let id_str          = encode_uuid(review.review_id);
    let facility_str    = encode_uuid(review.facility_id);
    let requirement_str = encode_uuid(review.requirement_id);
    let date_str        = encode_date(review.reviewed_on);
    let reviewer        = review.reviewer.clone();
    let at_str          = encode_dt(review.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reviews (
             review_id, facility_id, requirement_id, reviewed_on, reviewer, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, facility_str, requirement_str, date_str, reviewer, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(review)
  }
}
