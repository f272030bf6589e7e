//! Post models and their mapping from raw content API documents

use serde::{Deserialize, Serialize};

use super::rich_text::{self, RichTextBlock};
use super::ContentError;

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Stable public identifier, used in routes and as list key
    pub uid: String,

    /// ISO-8601 publication timestamp as returned by the API
    pub first_publication_date: Option<String>,

    pub data: PostData,
}

/// Post fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,
    /// Only populated when the full document is fetched
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
}

/// A heading followed by rich text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPagination<T = Post> {
    /// Fetchable URL of the next page, `None` once exhausted
    pub next_page: Option<String>,
    pub results: Vec<T>,
}

impl<T> Default for PostPagination<T> {
    fn default() -> Self {
        Self {
            next_page: None,
            results: Vec::new(),
        }
    }
}

/// Search response as returned by the API
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub next_page: Option<String>,
    pub results: Vec<Document>,
}

impl SearchResponse {
    /// Validate every result; one bad document fails the whole page
    pub fn into_pagination(self) -> Result<PostPagination, ContentError> {
        let results = self
            .results
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PostPagination {
            next_page: self.next_page.filter(|url| !url.is_empty()),
            results,
        })
    }
}

/// A raw API document
#[derive(Debug, Deserialize)]
pub(crate) struct Document {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub data: Option<RawPostData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawPostData {
    title: Option<TextField>,
    subtitle: Option<TextField>,
    author: Option<TextField>,
    banner: Option<RawImage>,
    content: Option<Vec<RawSection>>,
}

/// Key text or rich text; both flatten to a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextField {
    Plain(String),
    Rich(Vec<RichTextBlock>),
}

impl TextField {
    fn into_text(field: Option<TextField>) -> String {
        match field {
            Some(TextField::Plain(text)) => text,
            Some(TextField::Rich(blocks)) => rich_text::as_text(&blocks),
            None => String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImage {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSection {
    heading: Option<TextField>,
    body: Option<Vec<RichTextBlock>>,
}

impl TryFrom<Document> for Post {
    type Error = ContentError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let uid = match doc.uid {
            Some(uid) if !uid.is_empty() => uid,
            _ => {
                return Err(ContentError::MalformedResponse(format!(
                    "document {} has no uid",
                    doc.id.as_deref().unwrap_or("<unknown>")
                )))
            }
        };

        let raw = doc.data.unwrap_or_default();
        let data = PostData {
            title: TextField::into_text(raw.title),
            subtitle: TextField::into_text(raw.subtitle),
            author: TextField::into_text(raw.author),
            banner: Banner {
                url: raw.banner.and_then(|b| b.url).unwrap_or_default(),
            },
            content: raw
                .content
                .unwrap_or_default()
                .into_iter()
                .map(|section| ContentSection {
                    heading: TextField::into_text(section.heading),
                    body: section.body.unwrap_or_default(),
                })
                .collect(),
        };

        Ok(Post {
            uid,
            first_publication_date: doc.first_publication_date,
            data,
        })
    }
}
