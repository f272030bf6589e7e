//! Content API connection settings

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Environment variable holding the API endpoint
pub const ENDPOINT_VAR: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable holding an optional access token
pub const TOKEN_VAR: &str = "PRISMIC_ACCESS_TOKEN";

/// Prismic repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API root, e.g. `https://<repo>.cdn.prismic.io/api/v2`
    pub api_endpoint: Option<String>,
    pub access_token: Option<String>,
    /// Custom type holding blog posts
    pub document_type: String,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            access_token: None,
            document_type: "posts".to_string(),
        }
    }
}

impl PrismicConfig {
    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` on top of the file values
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var(ENDPOINT_VAR).ok(),
            std::env::var(TOKEN_VAR).ok(),
        )
    }

    fn with_overrides(mut self, endpoint: Option<String>, token: Option<String>) -> Self {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.api_endpoint = Some(endpoint);
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(token);
        }
        self
    }

    /// The configured endpoint without a trailing slash
    pub fn endpoint(&self) -> Result<&str> {
        match self.api_endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint.trim_end_matches('/')),
            _ => bail!(
                "No content API endpoint configured (set {} or prismic.api_endpoint)",
                ENDPOINT_VAR
            ),
        }
    }
}
