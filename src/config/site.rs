//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::PrismicConfig;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub post_dir: String,

    // Pagination
    pub page_size: usize,

    // Post page
    #[serde(default)]
    pub reading_time: ReadingTimeConfig,

    // Content API
    #[serde(default)]
    pub prismic: PrismicConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            post_dir: "post".to_string(),

            page_size: 20,

            reading_time: ReadingTimeConfig::default(),
            prismic: PrismicConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the configured timezone, falling back to UTC
    pub fn tz(&self) -> chrono_tz::Tz {
        if self.timezone.is_empty() {
            return chrono_tz::UTC;
        }
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                chrono_tz::UTC
            }
        }
    }
}

/// Reading time estimate shown on post pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingTimeConfig {
    pub words_per_minute: usize,
    /// Show this value instead of estimating from the post body
    pub fixed_minutes: Option<u32>,
}

impl Default for ReadingTimeConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
            fixed_minutes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.post_dir, "post");
        assert_eq!(config.reading_time.words_per_minute, 200);
        assert!(config.prismic.api_endpoint.is_none());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
timezone: America/Sao_Paulo
page_size: 5
reading_time:
  fixed_minutes: 4
prismic:
  api_endpoint: https://spacetraveling.cdn.prismic.io/api/v2
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.reading_time.fixed_minutes, Some(4));
        assert_eq!(config.reading_time.words_per_minute, 200);
        assert_eq!(config.tz(), chrono_tz::America::Sao_Paulo);
        assert_eq!(
            config.prismic.api_endpoint.as_deref(),
            Some("https://spacetraveling.cdn.prismic.io/api/v2")
        );
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let config = SiteConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tz(), chrono_tz::UTC);
    }
}
