//! Handlers for facility, catalog and review-ledger administration.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/facilities` | Ordered by name |
//! | `POST` | `/facilities` | Body: `{"name":"...","code":"..."}` |
//! | `GET`  | `/facilities/{facility_id}` | 404 if not found |
//! | `GET`  | `/requirements` | Whole catalog, ordered by code |
//! | `POST` | `/requirements` | Body: [`NewRequirement`] |
//! | `POST` | `/reviews` | Body: [`NewReview`] |
//! | `GET`  | `/facilities/{facility_id}/requirements/{requirement_id}/reviews` | Newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use sopready_core::{
  clock::Clock,
  facility::{Facility, NewFacility},
  gap::GapAnalysis,
  requirement::{NewRequirement, SopRequirement},
  review::{NewReview, ReviewRecord},
  store::ComplianceStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Facilities ──────────────────────────────────────────────────────────────

/// `GET /facilities`
pub async fn list_facilities<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
) -> Result<Json<Vec<Facility>>, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  Ok(Json(svc.list_facilities().await?))
}

/// `POST /facilities`
pub async fn create_facility<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Json(body): Json<NewFacility>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  let facility = svc.add_facility(body).await?;
  Ok((StatusCode::CREATED, Json(facility)))
}

/// `GET /facilities/{facility_id}`
pub async fn get_facility<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Facility>, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  Ok(Json(svc.get_facility(id).await?))
}

// ─── Requirements ────────────────────────────────────────────────────────────

/// `GET /requirements`
pub async fn list_requirements<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
) -> Result<Json<Vec<SopRequirement>>, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  Ok(Json(svc.list_requirements().await?))
}

/// `POST /requirements`
pub async fn create_requirement<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Json(body): Json<NewRequirement>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  let requirement = svc.add_requirement(body).await?;
  Ok((StatusCode::CREATED, Json(requirement)))
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// `POST /reviews`
pub async fn record_review<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Json(body): Json<NewReview>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  let review = svc.record_review(body).await?;
  Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /facilities/{facility_id}/requirements/{requirement_id}/reviews`
pub async fn review_history<S, C>(
  State(svc): State<Arc<GapAnalysis<S, C>>>,
  Path((facility_id, requirement_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<ReviewRecord>>, ApiError>
where
  S: ComplianceStore,
  C: Clock,
{
  Ok(Json(svc.review_history(facility_id, requirement_id).await?))
}
