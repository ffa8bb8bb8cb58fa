//! JSON REST API for SOP gap analysis.
//!
//! Exposes an axum [`Router`] backed by a [`GapAnalysis`] service over any
//! [`ComplianceStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sopready_api::api_router(service.clone()))
//! ```

pub mod error;
pub mod gap;
pub mod registry;

use std::sync::Arc;

use axum::{Router, routing::get};
use sopready_core::{clock::Clock, gap::GapAnalysis, store::ComplianceStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(service: Arc<GapAnalysis<S, C>>) -> Router<()>
where
  S: ComplianceStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    // Gap analysis
    .route("/gap-analysis", get(gap::summary::<S, C>))
    .route("/gap-analysis/{facility_id}", get(gap::detail::<S, C>))
    .route(
      "/gap-analysis/{facility_id}/snapshots",
      get(gap::history::<S, C>).post(gap::take_snapshot::<S, C>),
    )
    // Registry
    .route(
      "/facilities",
      get(registry::list_facilities::<S, C>).post(registry::create_facility::<S, C>),
    )
    .route("/facilities/{facility_id}", get(registry::get_facility::<S, C>))
    .route(
      "/facilities/{facility_id}/requirements/{requirement_id}/reviews",
      get(registry::review_history::<S, C>),
    )
    .route(
      "/requirements",
      get(registry::list_requirements::<S, C>).post(registry::create_requirement::<S, C>),
    )
    .route("/reviews", axum::routing::post(registry::record_review::<S, C>))
    .with_state(service)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{TimeDelta, TimeZone, Utc};
  use serde_json::{Value, json};
  use sopready_core::clock::FixedClock;
  use sopready_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  type Service = GapAnalysis<SqliteStore, Arc<FixedClock>>;

  fn now() -> chrono::DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap() }

  async fn make_service() -> Arc<Service> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    Arc::new(GapAnalysis::new(Arc::new(store), Arc::new(FixedClock::new(now()))))
  }

  async fn call(
    svc:    &Arc<Service>,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = api_router(Arc::clone(svc))
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn create_facility(svc: &Arc<Service>, name: &str, code: &str) -> String {
    let (status, body) =
      call(svc, "POST", "/facilities", Some(json!({ "name": name, "code": code }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["facility_id"].as_str().unwrap().to_owned()
  }

  async fn create_requirement(svc: &Arc<Service>, code: &str, cadence_days: u32) -> String {
    let (status, body) = call(
      svc,
      "POST",
      "/requirements",
      Some(json!({
        "code": code,
        "title": format!("{code} procedure"),
        "category": "Food Safety",
        "priority": "high",
        "cadence_days": cadence_days,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["requirement_id"].as_str().unwrap().to_owned()
  }

  async fn review(svc: &Arc<Service>, facility: &str, requirement: &str, days_ago: i64) {
    let on = (now() - TimeDelta::days(days_ago)).date_naive();
    let (status, body) = call(
      svc,
      "POST",
      "/reviews",
      Some(json!({
        "facility_id": facility,
        "requirement_id": requirement,
        "reviewed_on": on,
        "reviewer": "qa@example.com",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
  }

  /// A (365d, 10 days ago), B (90d, 120 days ago), C (30d, never).
  async fn scenario() -> (Arc<Service>, String) {
    let svc = make_service().await;
    let f = create_facility(&svc, "Central Kitchen", "CK").await;
    let a = create_requirement(&svc, "SOP-A", 365).await;
    let b = create_requirement(&svc, "SOP-B", 90).await;
    create_requirement(&svc, "SOP-C", 30).await;
    review(&svc, &f, &a, 10).await;
    review(&svc, &f, &b, 120).await;
    (svc, f)
  }

  // ── Summary ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn summary_reports_counts_and_band() {
    let (svc, f) = scenario().await;
    create_facility(&svc, "Annex", "AX").await;

    let (status, body) = call(&svc, "GET", "/gap-analysis", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["facilities"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["facility"]["name"], "Annex");

    let ck = &rows[1];
    assert_eq!(ck["facility"]["facility_id"], f.as_str());
    assert_eq!(ck["readiness"]["total_required"], 3);
    assert_eq!(ck["readiness"]["current_count"], 1);
    assert_eq!(ck["readiness"]["needs_update_count"], 1);
    assert_eq!(ck["readiness"]["missing_count"], 1);
    assert_eq!(ck["readiness"]["readiness_pct"], 33);
    assert_eq!(ck["band"], "critical");
  }

  #[tokio::test]
  async fn summary_rejects_unknown_order() {
    let svc = make_service().await;
    let (status, _) = call(&svc, "GET", "/gap-analysis?order=sideways", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Detail ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn detail_with_status_filter() {
    let (svc, f) = scenario().await;

    let (status, body) =
      call(&svc, "GET", &format!("/gap-analysis/{f}?status=needs_update"), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["requirements"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["requirement"]["code"], "SOP-B");
    assert_eq!(rows[0]["status"], "needs_update");
    assert!(rows[0]["last_review"]["reviewed_on"].is_string());
    // Readiness ignores the filter.
    assert_eq!(body["readiness"]["total_required"], 3);
    assert_eq!(body["filter"], "needs_update");
  }

  #[tokio::test]
  async fn detail_for_unknown_facility_is_404() {
    let svc = make_service().await;
    let (status, body) =
      call(&svc, "GET", &format!("/gap-analysis/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("facility not found"));
  }

  // ── Snapshots ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn snapshot_then_history() {
    let (svc, f) = scenario().await;

    let (status, first) =
      call(&svc, "POST", &format!("/gap-analysis/{f}/snapshots"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["readiness_pct"], 33);

    let (status, second) =
      call(&svc, "POST", &format!("/gap-analysis/{f}/snapshots"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(first["snapshot_id"], second["snapshot_id"]);

    let (status, history) =
      call(&svc, "GET", &format!("/gap-analysis/{f}/snapshots"), None).await;
    assert_eq!(status, StatusCode::OK);
    let series = history.as_array().unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0]["snapshot_id"], first["snapshot_id"]);
    assert_eq!(series[1]["snapshot_id"], second["snapshot_id"]);

    let (_, detail) = call(&svc, "GET", &format!("/gap-analysis/{f}"), None).await;
    assert_eq!(detail["snapshots"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn history_rejects_inverted_range() {
    let (svc, f) = scenario().await;
    let uri = format!(
      "/gap-analysis/{f}/snapshots?since=2024-06-02T00:00:00Z&until=2024-06-01T00:00:00Z"
    );
    let (status, _) = call(&svc, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn snapshot_for_unknown_facility_is_404() {
    let svc = make_service().await;
    let (status, _) =
      call(&svc, "POST", &format!("/gap-analysis/{}/snapshots", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Registry ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn duplicate_facility_code_is_409() {
    let svc = make_service().await;
    create_facility(&svc, "One", "PLT").await;
    let (status, _) =
      call(&svc, "POST", "/facilities", Some(json!({ "name": "Two", "code": "PLT" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn zero_cadence_is_rejected() {
    let svc = make_service().await;
    let (status, _) = call(
      &svc,
      "POST",
      "/requirements",
      Some(json!({
        "code": "SOP-0",
        "title": "Never due",
        "category": "Misc",
        "priority": "low",
        "cadence_days": 0,
      })),
    )
    .await;
    assert!(status.is_client_error());
  }

  #[tokio::test]
  async fn future_review_is_400_and_history_lists_reviews() {
    let svc = make_service().await;
    let f = create_facility(&svc, "Plant", "P").await;
    let r = create_requirement(&svc, "SOP-1", 30).await;

    let tomorrow = (now() + TimeDelta::days(1)).date_naive();
    let (status, _) = call(
      &svc,
      "POST",
      "/reviews",
      Some(json!({
        "facility_id": f,
        "requirement_id": r,
        "reviewed_on": tomorrow,
        "reviewer": "qa",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    review(&svc, &f, &r, 40).await;
    review(&svc, &f, &r, 5).await;
    let (status, body) =
      call(&svc, "GET", &format!("/facilities/{f}/requirements/{r}/reviews"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn facilities_and_requirements_are_listed() {
    let svc = make_service().await;
    let f = create_facility(&svc, "Plant", "P").await;
    create_requirement(&svc, "SOP-2", 30).await;
    create_requirement(&svc, "SOP-1", 30).await;

    let (_, facilities) = call(&svc, "GET", "/facilities", None).await;
    assert_eq!(facilities.as_array().unwrap().len(), 1);

    let (status, one) = call(&svc, "GET", &format!("/facilities/{f}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["code"], "P");

    let (_, reqs) = call(&svc, "GET", "/requirements", None).await;
    let codes: Vec<&str> = reqs
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["code"].as_str().unwrap())
      .collect();
    assert_eq!(codes, vec!["SOP-1", "SOP-2"]);
  }
}
