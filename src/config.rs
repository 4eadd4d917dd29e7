use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Per-source fetch timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub sources: Vec<SourceDescriptor>,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    "NewsPulse/1.0 (Feed Aggregator)".to_string()
}

/// One entry of the feed source registry.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub homepage: String,
    pub feed_url: String,
    pub regions: Vec<String>,
}

impl SourceDescriptor {
    pub fn covers_region(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r.eq_ignore_ascii_case(region))
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be positive");
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                bail!("source '{}' has an empty id", source.name);
            }
            if source.name.trim().is_empty() {
                bail!("source '{}' has an empty name", source.id);
            }
            if source.feed_url.trim().is_empty() {
                bail!("source '{}' has an empty feed_url", source.id);
            }
            if source.regions.is_empty() {
                bail!("source '{}' must declare at least one region", source.id);
            }
            if !seen.insert(source.id.as_str()) {
                bail!("duplicate source id '{}'", source.id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_fetch_timeout_secs(), 15);
        assert_eq!(default_bind_address(), "0.0.0.0:3000");
        assert!(default_user_agent().starts_with("NewsPulse/"));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            fetch_timeout_secs = 10
            user_agent = "TestAgent/0.1"

            [[sources]]
            id = "bbc"
            name = "BBC World"
            homepage = "https://www.bbc.com/news/world"
            feed_url = "https://feeds.bbci.co.uk/news/world/rss.xml"
            regions = ["europe"]

            [[sources]]
            id = "nhk"
            name = "NHK World"
            feed_url = "https://www3.nhk.or.jp/rss/news/cat0.xml"
            regions = ["asia", "pacific"]
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.user_agent, "TestAgent/0.1");
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].id, "bbc");
        assert_eq!(config.sources[0].homepage, "https://www.bbc.com/news/world");
        assert_eq!(config.sources[1].homepage, "");
        assert_eq!(config.sources[1].regions, vec!["asia", "pacific"]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/sources.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"this is not valid toml {{{").unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_feed_url_is_rejected() {
        let content = r#"
            [[sources]]
            id = "x"
            name = "X"
            regions = ["europe"]
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let content = r#"
            [[sources]]
            id = "dup"
            name = "One"
            feed_url = "https://one.example/rss"
            regions = ["europe"]

            [[sources]]
            id = "dup"
            name = "Two"
            feed_url = "https://two.example/rss"
            regions = ["asia"]
        "#;

        let err = Config::from_str(content).unwrap_err();
        assert!(err.to_string().contains("duplicate source id"));
    }

    #[test]
    fn test_empty_regions_are_rejected() {
        let content = r#"
            [[sources]]
            id = "x"
            name = "X"
            feed_url = "https://x.example/rss"
            regions = []
        "#;

        let err = Config::from_str(content).unwrap_err();
        assert!(err.to_string().contains("at least one region"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let content = r#"
            fetch_timeout_secs = 0
            sources = []
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_empty_sources_list() {
        let config = Config::from_str("sources = []").unwrap();
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_covers_region_ignores_case() {
        let source = SourceDescriptor {
            id: "dw".to_string(),
            name: "DW".to_string(),
            homepage: String::new(),
            feed_url: "https://rss.dw.com/rdf/rss-en-all".to_string(),
            regions: vec!["Europe".to_string()],
        };

        assert!(source.covers_region("europe"));
        assert!(source.covers_region("EUROPE"));
        assert!(!source.covers_region("asia"));
    }
}
