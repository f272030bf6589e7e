//! Content API client
//!
//! [`ContentApi`] is the seam between page generation and the headless CMS.
//! [`PrismicClient`] implements it against the Prismic REST v2 API; tests
//! substitute their own implementations.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

use super::post::{Post, PostPagination, SearchResponse};
use crate::config::PrismicConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Content API errors
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("No {document_type} document with uid {uid:?}")]
    NotFound { document_type: String, uid: String },

    /// The request URL is stripped, its query may carry the access token
    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("Content API returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Content API has no master ref")]
    NoMasterRef,
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        ContentError::Network(err.without_url())
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        ContentError::MalformedResponse(err.to_string())
    }
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }
}

// ============================================================================
// Queries
// ============================================================================

/// A query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals value
    At { path: String, value: String },
}

impl Predicate {
    /// All documents of a custom type
    pub fn document_type(document_type: &str) -> Self {
        Predicate::At {
            path: "document.type".to_string(),
            value: document_type.to_string(),
        }
    }

    /// The document of a custom type with the given uid
    pub fn uid(document_type: &str, uid: &str) -> Self {
        Predicate::At {
            path: format!("my.{}.uid", document_type),
            value: uid.to_string(),
        }
    }

    /// Render in the API's query syntax, e.g. `[[at(document.type,"posts")]]`
    pub fn to_query(&self) -> String {
        match self {
            Predicate::At { path, value } => {
                let value = value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("[[at({},\"{}\")]]", path, value)
            }
        }
    }
}

/// Projection and paging options of a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Fields to return, e.g. `posts.title`; empty returns everything
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// Operations page generation needs from the content API
pub trait ContentApi: Send + Sync {
    /// Run a filtered, paged query
    fn query(
        &self,
        predicate: &Predicate,
        options: &QueryOptions,
    ) -> impl Future<Output = Result<PostPagination, ContentError>> + Send;

    /// Fetch exactly one document by uid
    fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
    ) -> impl Future<Output = Result<Post, ContentError>> + Send;

    /// Fetch a `next_page` URL verbatim
    fn fetch_page(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<PostPagination, ContentError>> + Send;
}

/// Prismic REST v2 client
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

impl PrismicClient {
    /// Create a client for the configured repository
    pub fn new(config: &PrismicConfig) -> anyhow::Result<Self> {
        Self::with_http(config, reqwest::Client::new())
    }

    /// Create a client reusing an existing HTTP client
    pub fn with_http(config: &PrismicConfig, http: reqwest::Client) -> anyhow::Result<Self> {
        let endpoint = config.endpoint()?;
        reqwest::Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid content API endpoint {:?}: {}", endpoint, e))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve the ref searches run against
    async fn master_ref(&self) -> Result<String, ContentError> {
        let info: ApiInfo = self.get_json(self.with_token(self.http.get(&self.endpoint))).await?;
        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(ContentError::NoMasterRef)
    }

    async fn search(
        &self,
        predicate: &Predicate,
        options: &QueryOptions,
    ) -> Result<PostPagination, ContentError> {
        let master_ref = self.master_ref().await?;
        let url = format!("{}/documents/search", self.endpoint);

        let mut params = vec![
            ("ref", master_ref),
            ("q", predicate.to_query()),
        ];
        if !options.fetch.is_empty() {
            params.push(("fetch", options.fetch.join(",")));
        }
        if let Some(size) = options.page_size {
            params.push(("pageSize", size.to_string()));
        }

        tracing::debug!("Querying {}", predicate.to_query());
        let request = self.with_token(self.http.get(url).query(&params));
        let response: SearchResponse = self.get_json(request).await?;
        response.into_pagination()
    }

    fn with_token(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.query(&[("access_token", token)]),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ContentError> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            // Drop the query string, it may carry the access token
            let mut url = response.url().clone();
            url.set_query(None);
            return Err(ContentError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl ContentApi for PrismicClient {
    async fn query(
        &self,
        predicate: &Predicate,
        options: &QueryOptions,
    ) -> Result<PostPagination, ContentError> {
        self.search(predicate, options).await
    }

    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Post, ContentError> {
        let options = QueryOptions::new().page_size(1);
        let page = self
            .search(&Predicate::uid(document_type, uid), &options)
            .await?;

        page.results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::NotFound {
                document_type: document_type.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn fetch_page(&self, url: &str) -> Result<PostPagination, ContentError> {
        let response: SearchResponse = self.get_json(self.http.get(url)).await?;
        response.into_pagination()
    }
}
