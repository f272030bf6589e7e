//! Content module - content API client, post models and rich text

pub mod client;
mod post;
pub mod rich_text;

pub use client::{ContentApi, ContentError, PrismicClient, Predicate, QueryOptions};
pub use post::{Banner, ContentSection, Post, PostData, PostPagination};
pub use rich_text::{RichTextBlock, RichTextRenderer, TrustedHtml};
