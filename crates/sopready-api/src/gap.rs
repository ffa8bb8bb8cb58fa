//! Handlers for `/gap-analysis` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/gap-analysis` | Optional `?order=name\|code\|readiness_asc\|readiness_desc` |
//! | `GET`  | `/gap-analysis/{facility_id}` | Optional `?status=all\|current\|needs_update\|missing` |
//! | `GET`  | `/gap-analysis/{facility_id}/snapshots` | Optional `?since=...&until=...` (RFC 3339) |
//! | `POST` | `/gap-analysis/{facility_id}/snapshots` | Returns 201 + the new snapshot |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sopready_core::{
  clock::Clock,
  gap::{FacilityDetail, GapAnalysis, Summary, SummaryOrder},
  snapshot::{Snapshot, SnapshotRange},
  status::StatusFilter,
  store::ComplianceStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct SummaryParams {
  #[serde(default)]
  pub order: SummaryOrder,
}

/// `GET /gap-analysis[?order=...]`
pub async fn summary<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<Summary>, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  Ok(Json(svc.summary(params.order).await?))
}

// ─── Detail ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct DetailParams {
  #[serde(default)]
  pub status: StatusFilter,
}

/// `GET /gap-analysis/{facility_id}[?status=...]`
pub async fn detail<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Path(facility_id): Path<Uuid>,
  Query(params): Query<DetailParams>,
) -> Result<Json<FacilityDetail>, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  Ok(Json(svc.detail(facility_id, params.status).await?))
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
  pub since: Option<DateTime<Utc>>,
  pub until: Option<DateTime<Utc>>,
}

/// `GET /gap-analysis/{facility_id}/snapshots[?since=...][&until=...]`
pub async fn history<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Path(facility_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Snapshot>>, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  let range = SnapshotRange { since: params.since, until: params.until };
  Ok(Json(svc.history(facility_id, range).await?))
}

/// `POST /gap-analysis/{facility_id}/snapshots`, returns 201 + the snapshot.
pub async fn take_snapshot<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Path(facility_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  let snapshot = svc.take_snapshot(facility_id).await?;
  Ok((StatusCode::CREATED, Json(snapshot)))
}
