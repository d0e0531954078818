//! API route definitions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::dashboard::{DashboardError, Verdict};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(dashboard))
        .route("/stats", get(stats))
        .route("/events", get(list_events))
        .route("/anomalies", get(list_anomalies))
        .route("/decisions", get(list_decisions))
        .route("/decisions/{id}/approve", post(approve_decision))
        .route("/decisions/{id}/override", post(override_decision))
}

fn meta() -> Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": meta()
    }))
}

async fn dashboard(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.dashboard.read().await.snapshot();
    Json(json!({ "data": snapshot, "meta": meta() }))
}

async fn stats(State(state): State<AppState>) -> Json<Value> {
    let stats = state.dashboard.read().await.stats();
    Json(json!({ "data": stats, "meta": meta() }))
}

async fn list_events(State(state): State<AppState>) -> Json<Value> {
    let events = state.dashboard.read().await.recent_events();
    Json(json!({ "data": events, "meta": { "total": events.len() } }))
}

async fn list_anomalies(State(state): State<AppState>) -> Json<Value> {
    let anomalies = state.dashboard.read().await.recent_anomalies();
    Json(json!({ "data": anomalies, "meta": { "total": anomalies.len() } }))
}

async fn list_decisions(State(state): State<AppState>) -> Json<Value> {
    let decisions = state.dashboard.read().await.recent_decisions();
    Json(json!({ "data": decisions, "meta": { "total": decisions.len() } }))
}

async fn approve_decision(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<Value>) {
    review(&state, id, Verdict::Approved).await
}

async fn override_decision(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<Value>) {
    review(&state, id, Verdict::Overridden).await
}

async fn review(state: &AppState, id: Uuid, verdict: Verdict) -> (StatusCode, Json<Value>) {
    match state.dashboard.write().await.review(id, verdict) {
        Ok(notice) => (StatusCode::OK, Json(json!({ "data": notice, "meta": meta() }))),
        Err(e @ DashboardError::DecisionNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "data": null, "meta": { "message": e.to_string() } })),
        ),
    }
}
