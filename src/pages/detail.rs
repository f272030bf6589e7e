//! Post detail page
//!
//! A post route is either pre-generated at build time from the enumerated
//! slugs, or resolved on demand the first time it is requested.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;

use super::list::PostList;
use crate::config::{ReadingTimeConfig, SiteConfig};
use crate::content::rich_text::as_text;
use crate::content::{
    ContentApi, ContentError, Post, PostPagination, Predicate, QueryOptions, RichTextRenderer,
    TrustedHtml,
};
use crate::helpers::{count_words, date_xml, parse_publication_date, publication_date};

/// Page size used when enumerating slugs
const PATHS_PAGE_SIZE: usize = 100;

/// Render state of a post route
#[derive(Debug, Clone, PartialEq)]
pub enum PostView {
    /// Route matched, content not resolved yet
    Fallback,
    /// Content resolved
    Ready(Box<PostPage>),
}

/// A post as rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPage {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
    /// Minutes
    pub reading_time: u32,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub heading: String,
    pub body: TrustedHtml,
}

impl PostPage {
    pub fn from_post(post: &Post, config: &SiteConfig, renderer: &RichTextRenderer) -> Self {
        let raw_date = post.first_publication_date.as_deref();
        Self {
            uid: post.uid.clone(),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            banner_url: post.data.banner.url.clone(),
            date: publication_date(raw_date, config.tz()),
            datetime: raw_date
                .and_then(parse_publication_date)
                .map(|d| date_xml(&d)),
            reading_time: reading_time(post, &config.reading_time),
            sections: post
                .data
                .content
                .iter()
                .map(|section| SectionView {
                    heading: section.heading.clone(),
                    body: renderer.render(&section.body),
                })
                .collect(),
        }
    }
}

impl PostView {
    pub fn ready(post: &Post, config: &SiteConfig, renderer: &RichTextRenderer) -> Self {
        PostView::Ready(Box::new(PostPage::from_post(post, config, renderer)))
    }
}

/// Estimated minutes to read a post's headings and bodies
pub fn reading_time(post: &Post, config: &ReadingTimeConfig) -> u32 {
    if let Some(minutes) = config.fixed_minutes {
        return minutes;
    }

    let words: usize = post
        .data
        .content
        .iter()
        .map(|section| count_words(&section.heading) + count_words(&as_text(&section.body)))
        .sum();
    let per_minute = config.words_per_minute.max(1);

    words.div_ceil(per_minute).max(1) as u32
}

/// Resolve a post by slug
pub async fn resolve<C: ContentApi>(
    api: &C,
    config: &SiteConfig,
    slug: &str,
) -> Result<Post, ContentError> {
    api.get_by_uid(&config.prismic.document_type, slug).await
}

/// Enumerate every known post slug, following pagination to the end
pub async fn static_paths<C: ContentApi>(
    api: &C,
    config: &SiteConfig,
) -> Result<Vec<String>, ContentError> {
    let document_type = &config.prismic.document_type;
    let options = QueryOptions::new()
        .fetch([format!("{}.slug", document_type)])
        .page_size(PATHS_PAGE_SIZE);
    let first: PostPagination = api
        .query(&Predicate::document_type(document_type), &options)
        .await?;

    let mut list = PostList::new(first);
    list.load_all(api).await?;

    let mut seen = HashSet::new();
    Ok(list
        .into_posts()
        .into_iter()
        .map(|p| p.uid)
        .filter(|uid| seen.insert(uid.clone()))
        .collect())
}

/// Slugs currently being generated on demand
///
/// Concurrent requests for the same slug get the fallback page instead of
/// triggering a second fetch.
#[derive(Debug, Default)]
pub struct OnDemand {
    pending: Mutex<HashSet<String>>,
}

/// Held while a slug is being generated; releases it on drop
#[derive(Debug)]
pub struct Claim<'a> {
    registry: &'a OnDemand,
    slug: String,
}

impl OnDemand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a slug, or `None` when another request is already on it
    pub fn claim(&self, slug: &str) -> Option<Claim<'_>> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if !pending.insert(slug.to_string()) {
            return None;
        }
        Some(Claim {
            registry: self,
            slug: slug.to_string(),
        })
    }

    pub fn is_pending(&self, slug: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(slug)
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.registry
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.slug);
    }
}
