use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SourceDescriptor;

/// A feed item as parsed from the syndication document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedItem {
    pub link: Option<String>,
    pub title: Option<String>,
    /// Publish date already in RFC 3339 form
    pub iso_date: Option<String>,
    /// Publish date as written in the document, e.g. RFC 2822
    pub pub_date: Option<String>,
    pub content_snippet: Option<String>,
    pub content: Option<String>,
    pub enclosure: Option<Enclosure>,
    pub media: Vec<MediaEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: Option<String>,
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaEntry {
    pub url: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEvent {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source_id: String,
    pub source_name: String,
    pub source_homepage: String,
    pub published_at: DateTime<Utc>,
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Attribution entry for a source that was in scope for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub id: String,
    pub name: String,
    pub homepage: String,
}

impl From<&SourceDescriptor> for SourceSummary {
    fn from(source: &SourceDescriptor) -> Self {
        Self {
            id: source.id.clone(),
            name: source.name.clone(),
            homepage: source.homepage.clone(),
        }
    }
}
