//! Data models for discovered links and parsed articles.
//!
//! - [`DiscoveredLink`]: an article URL with the identifier assigned at discovery
//! - [`Article`]: the structured record extracted from one article page
//! - [`ArticleMeta`]: the metadata half of an article as it is persisted

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use url::Url;

/// Placeholder stored when an article page names no author.
pub const UNKNOWN_AUTHOR: &str = "NOT FOUND";

/// Placeholder stored when an article page has no recognisable title.
pub const UNKNOWN_TITLE: &str = "NOT FOUND";

/// Layout of the canonical timestamp in persisted metadata.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An article URL found during discovery.
///
/// `id` is assigned in discovery order starting at 1 and never changes, even
/// if earlier articles are later dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub id: usize,
    pub url: Url,
}

/// A fully parsed article.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Identifier assigned at discovery.
    pub id: usize,
    /// The URL the article was fetched from.
    pub url: Url,
    pub title: String,
    /// Body text, paragraphs separated by newlines. Never empty.
    pub text: String,
    /// Author names, or a single [`UNKNOWN_AUTHOR`] entry.
    pub authors: Vec<String>,
    pub topics: Vec<String>,
    /// Publication time in the site's wall-clock time.
    pub published: NaiveDateTime,
}

impl Article {
    /// Metadata record written next to the raw text.
    pub fn meta(&self) -> ArticleMeta {
        ArticleMeta {
            id: self.id,
            url: self.url.to_string(),
            title: self.title.clone(),
            author: self.authors.clone(),
            date: self.published.format(CANONICAL_DATE_FORMAT).to_string(),
            topics: self.topics.clone(),
        }
    }
}

/// Serialised article metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleMeta {
    pub id: usize,
    pub url: String,
    pub title: String,
    pub author: Vec<String>,
    pub date: String,
    pub topics: Vec<String>,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub parsed: usize,
    pub dropped: usize,
    pub persisted: usize,
}
