use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::aggregator::{resolve_limit, AggregateQuery, Aggregator};

const NO_STORE: &str = "no-store, max-age=0";

pub struct AppState {
    pub aggregator: Aggregator,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/events", get(events))
        .route("/api/sources", get(sources))
        .route("/api/regions", get(regions))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsParams {
    pub query: Option<String>,
    pub region: Option<String>,
    /// Kept as text so non-numeric values fall back to the default
    pub limit: Option<String>,
}

impl From<EventsParams> for AggregateQuery {
    fn from(params: EventsParams) -> Self {
        AggregateQuery {
            limit: resolve_limit(params.limit.as_deref()),
            query: params.query,
            region: params.region,
        }
    }
}

pub async fn events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsParams>,
) -> impl IntoResponse {
    let aggregation = state.aggregator.aggregate(&params.into()).await;
    ([(header::CACHE_CONTROL, NO_STORE)], Json(aggregation))
}

#[derive(Debug, Deserialize)]
pub struct RegionParams {
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceListing {
    pub id: String,
    pub name: String,
    pub homepage: String,
    pub regions: Vec<String>,
}

pub async fn sources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionParams>,
) -> impl IntoResponse {
    let listing: Vec<SourceListing> = state
        .aggregator
        .registry()
        .select(params.region.as_deref())
        .into_iter()
        .map(|s| SourceListing {
            id: s.id.clone(),
            name: s.name.clone(),
            homepage: s.homepage.clone(),
            regions: s.regions.clone(),
        })
        .collect();

    Json(listing)
}

pub async fn regions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.registry().regions())
}

pub async fn health() -> impl IntoResponse {
    "OK"
}
