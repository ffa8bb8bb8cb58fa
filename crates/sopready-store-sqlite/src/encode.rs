//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision, so lexical order in SQL matches chronological order. Calendar
//! dates are ISO 8601 (`YYYY-MM-DD`). UUIDs are hyphenated lowercase.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sopready_core::{
  facility::Facility,
  requirement::{Applicability, Cadence, Priority, SopRequirement},
  review::ReviewRecord,
  snapshot::Snapshot,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Priority ────────────────────────────────────────────────────────────────

pub fn encode_priority(p: Priority) -> &'static str {
  match p {
    Priority::Low => "low",
    Priority::Medium => "medium",
    Priority::High => "high",
  }
}

pub fn decode_priority(s: &str) -> Result<Priority> {
  match s {
    "low" => Ok(Priority::Low),
    "medium" => Ok(Priority::Medium),
    "high" => Ok(Priority::High),
    other => Err(Error::Decode(format!("unknown priority: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `facilities` row.
pub struct RawFacility {
  pub facility_id: String,
  pub name:        String,
  pub code:        String,
  pub created_at:  String,
}

impl RawFacility {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      facility_id: row.get(0)?,
      name:        row.get(1)?,
      code:        row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_facility(self) -> Result<Facility> {
    Ok(Facility {
      facility_id: decode_uuid(&self.facility_id)?,
      name:        self.name,
      code:        self.code,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values from a `sop_requirements` row, plus the facility ids from
/// `requirement_facilities` when the requirement is facility-scoped.
pub struct RawRequirement {
  pub requirement_id: String,
  pub code:           String,
  pub title:          String,
  pub category:       String,
  pub priority:       String,
  pub cadence_days:   u32,
  pub applies_to_all: bool,
  pub created_at:     String,
  pub facility_ids:   Vec<String>,
}

impl RawRequirement {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      requirement_id: row.get(0)?,
      code:           row.get(1)?,
      title:          row.get(2)?,
      category:       row.get(3)?,
      priority:       row.get(4)?,
      cadence_days:   row.get(5)?,
      applies_to_all: row.get(6)?,
      created_at:     row.get(7)?,
      facility_ids:   Vec::new(),
    })
  }

  pub fn into_requirement(self) -> Result<SopRequirement> {
    let applicability = if self.applies_to_all {
      Applicability::AllFacilities
    } else {
      Applicability::Facilities(
        self
          .facility_ids
          .iter()
          .map(|s| decode_uuid(s))
          .collect::<Result<_>>()?,
      )
    };

    Ok(SopRequirement {
      requirement_id: decode_uuid(&self.requirement_id)?,
      code: self.code,
      title: self.title,
      category: self.category,
      priority: decode_priority(&self.priority)?,
      cadence: Cadence::days(self.cadence_days)
        .map_err(|e| Error::Decode(e.to_string()))?,
      applicability,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `reviews` row.
pub struct RawReview {
  pub review_id:      String,
  pub facility_id:    String,
  pub requirement_id: String,
  pub reviewed_on:    String,
  pub reviewer:       String,
  pub recorded_at:    String,
}

impl RawReview {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:      row.get(0)?,
      facility_id:    row.get(1)?,
      requirement_id: row.get(2)?,
      reviewed_on:    row.get(3)?,
      reviewer:       row.get(4)?,
      recorded_at:    row.get(5)?,
    })
  }

  pub fn into_review(self) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
      review_id:      decode_uuid(&self.review_id)?,
      facility_id:    decode_uuid(&self.facility_id)?,
      requirement_id: decode_uuid(&self.requirement_id)?,
      reviewed_on:    decode_date(&self.reviewed_on)?,
      reviewer:       self.reviewer,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `snapshots` row.
pub struct RawSnapshot {
  pub snapshot_id:        String,
  pub facility_id:        String,
  pub snapshot_date:      String,
  pub total_required:     u32,
  pub current_count:      u32,
  pub needs_update_count: u32,
  pub missing_count:      u32,
  pub readiness_pct:      u8,
}

impl RawSnapshot {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      snapshot_id:        row.get(0)?,
      facility_id:        row.get(1)?,
      snapshot_date:      row.get(2)?,
      total_required:     row.get(3)?,
      current_count:      row.get(4)?,
      needs_update_count: row.get(5)?,
      missing_count:      row.get(6)?,
      readiness_pct:      row.get(7)?,
    })
  }

  pub fn into_snapshot(self) -> Result<Snapshot> {
    Ok(Snapshot {
      snapshot_id:        decode_uuid(&self.snapshot_id)?,
      facility_id:        decode_uuid(&self.facility_id)?,
      snapshot_date:      decode_dt(&self.snapshot_date)?,
      total_required:     self.total_required,
      current_count:      self.current_count,
      needs_update_count: self.needs_update_count,
      missing_count:      self.missing_count,
      readiness_pct:      self.readiness_pct,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let b = a + TimeDelta::microseconds(1);
    let c = a + TimeDelta::seconds(1);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn unknown_priority_is_a_decode_error() {
    assert!(matches!(decode_priority("urgent"), Err(Error::Decode(_))));
  }
}
