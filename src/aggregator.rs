//! Fan-out fetch across the registry and merge into one ranked event list.
//!
//! Each source is fetched in its own task. Any failure in that task (transport
//! error, timeout, panic) is logged and turned into an empty result, so a bad
//! source only ever costs its own events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::SourceDescriptor;
use crate::fetcher::{FeedTransport, FetchError};
use crate::models::{CanonicalEvent, SourceSummary};
use crate::normalizer::normalize;
use crate::registry::SourceRegistry;

pub const DEFAULT_LIMIT: usize = 60;
pub const MIN_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    pub query: Option<String>,
    pub region: Option<String>,
    pub limit: usize,
}

impl Default for AggregateQuery {
    fn default() -> Self {
        Self {
            query: None,
            region: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub fetched_at: DateTime<Utc>,
    pub events: Vec<CanonicalEvent>,
    pub sources: Vec<SourceSummary>,
}

/// Resolve a caller-supplied limit: absent or non-numeric means the default,
/// anything below the floor is raised to it.
pub fn resolve_limit(raw: Option<&str>) -> usize {
    let parsed = raw
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite());

    match parsed {
        Some(v) if v < MIN_LIMIT as f64 => MIN_LIMIT,
        Some(v) => v.trunc().min(usize::MAX as f64) as usize,
        None => DEFAULT_LIMIT,
    }
}

pub struct Aggregator {
    transport: Arc<dyn FeedTransport>,
    registry: Arc<SourceRegistry>,
    fetch_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        registry: Arc<SourceRegistry>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            registry,
            fetch_timeout,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub async fn aggregate(&self, query: &AggregateQuery) -> Aggregation {
        let fetched_at = Utc::now();
        let selected = self.registry.select(query.region.as_deref());

        let handles = selected.iter().map(|source| {
            tokio::spawn(fetch_source(
                self.transport.clone(),
                (*source).clone(),
                self.fetch_timeout,
            ))
        });
        let results = join_all(handles).await;

        let per_source = selected.iter().zip(results).map(|(source, result)| {
            result.unwrap_or_else(|e| {
                error!("Fetch task for source '{}' failed: {}", source.id, e);
                Vec::new()
            })
        });

        let merged = dedupe_by_url(per_source.flatten());
        let total = merged.len();
        let mut events = filter_by_text(merged, query.query.as_deref());
        sort_by_recency(&mut events);
        events.truncate(query.limit);

        info!(
            "Aggregated {} events ({} unique before filtering) from {} sources",
            events.len(),
            total,
            selected.len()
        );

        Aggregation {
            fetched_at,
            events,
            sources: selected.into_iter().map(SourceSummary::from).collect(),
        }
    }
}

/// Fetch and normalize one source; every failure becomes an empty list.
async fn fetch_source(
    transport: Arc<dyn FeedTransport>,
    source: SourceDescriptor,
    timeout: Duration,
) -> Vec<CanonicalEvent> {
    let result = tokio::time::timeout(timeout, transport.fetch(&source.feed_url))
        .await
        .unwrap_or(Err(FetchError::Timeout(timeout)));

    match result {
        Ok(items) => {
            let events: Vec<_> = items
                .iter()
                .filter_map(|raw| normalize(&source, raw))
                .collect();
            debug!(
                "Source '{}' yielded {} events from {} items",
                source.id,
                events.len(),
                items.len()
            );
            events
        }
        Err(e) => {
            warn!(
                "Failed to fetch source '{}' ({}): {}",
                source.id, source.feed_url, e
            );
            Vec::new()
        }
    }
}

/// Keep the first event seen for each URL.
pub fn dedupe_by_url(events: impl IntoIterator<Item = CanonicalEvent>) -> Vec<CanonicalEvent> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert(e.url.clone()))
        .collect()
}

/// Case-insensitive substring match against title and summary.
pub fn filter_by_text(events: Vec<CanonicalEvent>, query: Option<&str>) -> Vec<CanonicalEvent> {
    let needle = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => q.to_lowercase(),
        None => return events,
    };

    events
        .into_iter()
        .filter(|e| {
            format!("{} {}", e.title, e.summary)
                .to_lowercase()
                .contains(&needle)
        })
        .collect()
}

/// Newest first; ties keep their merged order.
pub fn sort_by_recency(events: &mut [CanonicalEvent]) {
    events.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
