use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::directory::{merge_listings, DirectoryFilter, LocalDirectory, SortOrder};
use crate::external::types::{Bundle, Listing, Location};
use crate::external::AggregationManager;

pub const DEFAULT_RADIUS_KM: u32 = 25;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AggregationManager>,
    pub directory: Arc<dyn LocalDirectory>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/external/jobs", get(external_jobs))
        .route("/external/services", get(external_services))
        .route("/jobs/nearby", get(jobs_nearby))
        .route("/services/nearby", get(services_nearby))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn default_radius() -> u32 {
    DEFAULT_RADIUS_KM
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    #[serde(default = "default_radius")]
    radius: u32,
    #[serde(default)]
    sort: SortOrder,
}

impl NearbyQuery {
    fn validate(&self) -> Result<(), Response> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "lat must be within [-90, 90] and lng within [-180, 180]" })),
            )
                .into_response())
        }
    }

    fn origin(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    fn filter(&self) -> DirectoryFilter {
        DirectoryFilter::near(self.origin(), self.radius as f64)
    }
}

#[derive(Debug, Serialize)]
struct NearbyResp<T> {
    message: String,
    location: Location,
    source: &'static str,
    records: Vec<T>,
}

fn upstream_error(e: anyhow::Error) -> Response {
    tracing::error!(target: "api", error = ?e, "aggregation failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": "external aggregation unavailable" })),
    )
        .into_response()
}

async fn external_jobs(State(state): State<AppState>, Query(q): Query<NearbyQuery>) -> Response {
    if let Err(resp) = q.validate() {
        return resp;
    }
    match state.manager.fetch_external_jobs(q.lat, q.lng, q.radius).await {
        Ok(bundle) => Json(bundle).into_response(),
        Err(e) => upstream_error(e),
    }
}

async fn external_services(
    State(state): State<AppState>,
    Query(q): Query<NearbyQuery>,
) -> Response {
    if let Err(resp) = q.validate() {
        return resp;
    }
    match state.manager.fetch_social_services(q.lat, q.lng, q.radius).await {
        Ok(bundle) => Json(bundle).into_response(),
        Err(e) => upstream_error(e),
    }
}

/// Merge local + external; a failed aggregation leaves local results only.
async fn assemble<T: Listing + Serialize>(
    state: &AppState,
    q: &NearbyQuery,
    kind: &str,
    local: anyhow::Result<Vec<T>>,
    external: anyhow::Result<Bundle<T>>,
) -> NearbyResp<T> {
    let local = local.unwrap_or_else(|e| {
        tracing::warn!(target: "api", error = ?e, kind, "local directory read failed");
        Vec::new()
    });
    let (location, external, source) = match external {
        Ok(bundle) => (bundle.location, bundle.records, "mixed"),
        Err(e) => {
            tracing::warn!(
                target: "api",
                error = ?e,
                kind,
                "external aggregation failed; local only"
            );
            let location = state.manager.resolve_location(q.lat, q.lng).await;
            (location, Vec::new(), "database")
        }
    };
    let records = merge_listings(local, external, Some(q.origin()), q.sort);
    NearbyResp {
        message: format!("Found {} {kind} near {}", records.len(), location.label()),
        location,
        source,
        records,
    }
}

async fn jobs_nearby(State(state): State<AppState>, Query(q): Query<NearbyQuery>) -> Response {
    if let Err(resp) = q.validate() {
        return resp;
    }
    let local = state.directory.jobs(&q.filter()).await;
    let external = state.manager.fetch_external_jobs(q.lat, q.lng, q.radius).await;
    Json(assemble(&state, &q, "jobs", local, external).await).into_response()
}

async fn services_nearby(State(state): State<AppState>, Query(q): Query<NearbyQuery>) -> Response {
    if let Err(resp) = q.validate() {
        return resp;
    }
    let local = state.directory.services(&q.filter()).await;
    let external = state
        .manager
        .fetch_social_services(q.lat, q.lng, q.radius)
        .await;
    Json(assemble(&state, &q, "services", local, external).await).into_response()
}
