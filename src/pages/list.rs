//! Post list page state
//!
//! The list starts from the first page fetched at build time and grows by
//! "load more": each load GETs the current `next_page` URL, appends its
//! results in order and replaces the pointer. At most one load runs at a
//! time.

use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::content::{ContentApi, ContentError, Post, PostPagination, Predicate, QueryOptions};
use crate::helpers::{date_xml, parse_publication_date, post_url, publication_date};

/// Fields the list view projects from each post
pub fn list_fields(document_type: &str) -> Vec<String> {
    ["title", "subtitle", "author"]
        .iter()
        .map(|field| format!("{}.{}", document_type, field))
        .collect()
}

/// Fetch the first page of the list
pub async fn first_page<C: ContentApi>(
    api: &C,
    config: &SiteConfig,
) -> Result<PostPagination, ContentError> {
    let document_type = &config.prismic.document_type;
    let options = QueryOptions::new()
        .fetch(list_fields(document_type))
        .page_size(config.page_size);
    api.query(&Predicate::document_type(document_type), &options)
        .await
}

/// Where the list is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    /// Seeded from the first page only
    Initial,
    /// At least one "load more" has completed
    Loaded,
}

/// A load that has been started and not yet finished
#[derive(Debug)]
#[must_use]
pub struct PendingLoad {
    url: String,
}

impl PendingLoad {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// The paginated post list
#[derive(Debug, Clone)]
pub struct PostList {
    posts: Vec<Post>,
    next_page: Option<String>,
    state: ListState,
    in_flight: bool,
}

impl PostList {
    pub fn new(initial: PostPagination) -> Self {
        Self {
            posts: initial.results,
            next_page: initial.next_page,
            state: ListState::Initial,
            in_flight: false,
        }
    }

    pub fn state(&self) -> ListState {
        self.state
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether the "load more" control is shown
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Start a load, unless the list is exhausted or a load is pending
    pub fn begin_load(&mut self) -> Option<PendingLoad> {
        if self.in_flight {
            return None;
        }
        let url = self.next_page.clone()?;
        self.in_flight = true;
        Some(PendingLoad { url })
    }

    /// Append a fetched page and advance the pointer
    pub fn finish_load(&mut self, _load: PendingLoad, page: PostPagination) -> usize {
        let added = page.results.len();
        self.posts.extend(page.results);
        self.next_page = page.next_page;
        self.state = ListState::Loaded;
        self.in_flight = false;
        added
    }

    /// Give up on a load, leaving the list as it was
    pub fn abort_load(&mut self, _load: PendingLoad) {
        self.in_flight = false;
    }

    /// Fetch and append the next page; returns the number of posts added
    pub async fn load_more<C: ContentApi>(&mut self, api: &C) -> Result<usize, ContentError> {
        let Some(load) = self.begin_load() else {
            return Ok(0);
        };

        match api.fetch_page(load.url()).await {
            Ok(page) => {
                let added = self.finish_load(load, page);
                tracing::debug!("Loaded {} more posts", added);
                Ok(added)
            }
            Err(e) => {
                self.abort_load(load);
                Err(e)
            }
        }
    }

    /// Follow `next_page` until the list is exhausted
    pub async fn load_all<C: ContentApi>(&mut self, api: &C) -> Result<(), ContentError> {
        while self.has_more() {
            self.load_more(api).await?;
        }
        Ok(())
    }

    /// View models for every post, in list order
    pub fn summaries(&self, config: &SiteConfig) -> Vec<PostSummary> {
        self.posts
            .iter()
            .map(|p| PostSummary::from_post(p, config))
            .collect()
    }
}

/// A list item as rendered
///
/// Both the first render and "load more" go through [`PostSummary::from_post`],
/// so dates are always formatted the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// `dd MMM yyyy`, pt-BR
    pub date: Option<String>,
    /// Machine-readable date for `<time datetime>`
    pub datetime: Option<String>,
    pub href: String,
}

impl PostSummary {
    pub fn from_post(post: &Post, config: &SiteConfig) -> Self {
        let raw_date = post.first_publication_date.as_deref();
        Self {
            uid: post.uid.clone(),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            date: publication_date(raw_date, config.tz()),
            datetime: raw_date
                .and_then(parse_publication_date)
                .map(|d| date_xml(&d)),
            href: post_url(config, &post.uid),
        }
    }
}
