//! spacetraveling: a statically generated blog backed by a Prismic repository
//!
//! Posts are fetched from the Prismic REST API at build time and rendered
//! with embedded Tera templates. The bundled server adds "load more"
//! pagination and generates posts published after the build on demand.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod pages;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new Blog from a directory, reading `_config.yml` and the
    /// Prismic environment variables
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.prismic = config.prismic.with_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Blog with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            public_dir,
        }
    }

    /// Client for the configured Prismic repository
    pub fn client(&self) -> Result<content::PrismicClient> {
        content::PrismicClient::new(&self.config.prismic)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
