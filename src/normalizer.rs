//! Maps raw feed items onto [`CanonicalEvent`]s.
//!
//! Items missing a title, link or parseable publish date are dropped. Every
//! optional field degrades to omission rather than failing the item.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SourceDescriptor;
use crate::models::{CanonicalEvent, RawFeedItem};

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://\S+$").expect("valid http url pattern"));

/// Naive formats seen in the wild, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A way of finding an illustrative image on a raw item.
pub trait ImageSource: Sync {
    fn image_url(&self, raw: &RawFeedItem) -> Option<String>;
}

/// The item's enclosure, when it points at an http(s) URL.
pub struct EnclosureImage;

impl ImageSource for EnclosureImage {
    fn image_url(&self, raw: &RawFeedItem) -> Option<String> {
        raw.enclosure
            .as_ref()
            .and_then(|e| e.url.as_deref())
            .and_then(http_url)
    }
}

/// First media-content entry exposing an http(s) URL.
pub struct MediaContentImage;

impl ImageSource for MediaContentImage {
    fn image_url(&self, raw: &RawFeedItem) -> Option<String> {
        raw.media
            .iter()
            .filter_map(|m| m.url.as_deref())
            .find_map(http_url)
    }
}

/// Tried in order; the first hit wins.
pub static IMAGE_SOURCES: &[&dyn ImageSource] = &[&EnclosureImage, &MediaContentImage];

pub fn normalize(source: &SourceDescriptor, raw: &RawFeedItem) -> Option<CanonicalEvent> {
    let url = non_empty(raw.link.as_deref())?;
    let title = non_empty(raw.title.as_deref())?;
    let published_at = resolve_published_at(raw)?;

    let summary = raw
        .content_snippet
        .as_deref()
        .or(raw.content.as_deref())
        .map(collapse_whitespace)
        .unwrap_or_default();

    Some(CanonicalEvent {
        id: event_id(&source.id, url),
        title: title.to_string(),
        summary,
        url: url.to_string(),
        source_id: source.id.clone(),
        source_name: source.name.clone(),
        source_homepage: source.homepage.clone(),
        published_at,
        regions: source.regions.clone(),
        image: resolve_image(raw),
    })
}

/// Stable identifier for an event: the source id plus the percent-encoded URL.
pub fn event_id(source_id: &str, url: &str) -> String {
    format!("{}:{}", source_id, urlencoding::encode(url))
}

pub fn resolve_image(raw: &RawFeedItem) -> Option<String> {
    IMAGE_SOURCES.iter().find_map(|s| s.image_url(raw))
}

pub fn resolve_published_at(raw: &RawFeedItem) -> Option<DateTime<Utc>> {
    raw.iso_date
        .as_deref()
        .and_then(parse_iso_date)
        .or_else(|| raw.pub_date.as_deref().and_then(parse_human_date))
}

pub fn parse_iso_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a publish date as feeds commonly write it.
pub fn parse_human_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_iso_date(value) {
        return Some(dt);
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn http_url(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    HTTP_URL.is_match(candidate).then(|| candidate.to_string())
}
