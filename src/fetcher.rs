use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::item_extras::{scan_item_extras, ItemExtras};
use crate::models::{Enclosure, MediaEntry, RawFeedItem};

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("valid markup pattern"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("malformed feed document: {0}")]
    Parse(#[from] parser::ParseFeedError),
}

/// Retrieves a syndication document and turns it into raw items.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn fetch(&self, feed_url: &str) -> Result<Vec<RawFeedItem>, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(config.fetch_timeout(), &config.user_agent)
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(e)
        }
    }

    /// Parse a feed document into raw items, in document order.
    pub fn parse_document(bytes: &[u8]) -> Result<Vec<RawFeedItem>, FetchError> {
        let parsed = parser::parse(bytes)?;
        let extras = Self::item_extras(bytes, parsed.entries.len());

        let items = parsed
            .entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let link = Self::primary_link(&entry);
                Self::raw_item_from_entry(entry, link, extras.get(i))
            })
            .collect();

        Ok(items)
    }

    /// The article link: the first `alternate` (or rel-less) link, else the first link.
    pub fn primary_link(entry: &Entry) -> Option<String> {
        entry
            .links
            .iter()
            .find(|l| {
                l.rel
                    .as_deref()
                    .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
            })
            .or_else(|| entry.links.first())
            .map(|l| l.href.trim().to_string())
    }

    pub fn raw_item_from_entry(
        entry: Entry,
        link: Option<String>,
        extras: Option<&ItemExtras>,
    ) -> RawFeedItem {
        let iso_date = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc3339());

        let enclosure = extras
            .and_then(|x| x.enclosure.clone())
            .or_else(|| {
                entry
                    .links
                    .iter()
                    .find(|l| {
                        l.rel
                            .as_deref()
                            .is_some_and(|rel| rel.eq_ignore_ascii_case("enclosure"))
                    })
                    .map(|l| Enclosure {
                        url: Some(l.href.clone()),
                        media_type: l.media_type.clone(),
                    })
            });

        let media = entry
            .media
            .iter()
            .flat_map(|object| {
                let contents = object.content.iter().map(|c| MediaEntry {
                    url: c.url.as_ref().map(|u| u.to_string()),
                    medium: c.content_type.as_ref().map(|m| m.to_string()),
                });
                let thumbnails = object.thumbnails.iter().map(|t| MediaEntry {
                    url: Some(t.image.uri.clone()),
                    medium: Some("image".to_string()),
                });
                contents.chain(thumbnails)
            })
            .collect();

        RawFeedItem {
            link,
            title: entry.title.map(|t| t.content),
            iso_date,
            pub_date: extras.and_then(|x| x.pub_date.clone()),
            content_snippet: entry.summary.map(|s| strip_markup(&s.content)),
            content: entry.content.and_then(|c| c.body),
            enclosure,
            media,
        }
    }

    /// Raw extras for each entry, or none when they cannot be paired up by position.
    fn item_extras(bytes: &[u8], entry_count: usize) -> Vec<ItemExtras> {
        match scan_item_extras(bytes) {
            Ok(extras) if extras.len() == entry_count => extras,
            Ok(extras) => {
                debug!(
                    "Found {} items in raw XML but {} parsed entries; ignoring raw extras",
                    extras.len(),
                    entry_count
                );
                Vec::new()
            }
            Err(e) => {
                debug!("Could not scan raw XML for item extras: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl FeedTransport for HttpFetcher {
    async fn fetch(&self, feed_url: &str) -> Result<Vec<RawFeedItem>, FetchError> {
        debug!("Fetching feed {}", feed_url);

        let response = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await.map_err(|e| self.request_error(e))?;
        let items = Self::parse_document(&bytes)?;

        debug!("Parsed {} items from {}", items.len(), feed_url);
        Ok(items)
    }
}

/// Drop markup tags and decode HTML entities, leaving plain text.
pub fn strip_markup(html: &str) -> String {
    let text = MARKUP_TAG.replace_all(html, " ");
    html_escape::decode_html_entities(&text).into_owned()
}
