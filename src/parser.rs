//! Article page parsing.
//!
//! Each [`DiscoveredLink`] is fetched and turned into an [`Article`]. Missing
//! authors and topics are tolerated (sentinel author, empty topics). A page
//! that cannot be fetched, has no body text, or has a missing or unparseable
//! publication date is dropped without affecting the rest of the run.
//!
//! Articles are independent once discovery is over, so [`HtmlParser::parse_all`]
//! can fetch several at a time. Identifiers were fixed at discovery, so output
//! order does not depend on completion order.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use encoding_rs::Encoding;
use futures::stream::{self, StreamExt};
use scraper::Html;
use tracing::{debug, info, instrument, warn};

use crate::config::RunConfig;
use crate::error::{DateParseFailure, ParseFailure};
use crate::fetcher::Fetch;
use crate::models::{Article, DiscoveredLink, UNKNOWN_AUTHOR, UNKNOWN_TITLE};
use crate::scrapers::PageSchema;
use crate::utils::truncate_for_log;

/// Upper bound on concurrent article fetches.
pub const MAX_WORKERS: usize = 8;

/// Result of parsing every discovered link.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Parsed articles keyed by identifier.
    pub articles: BTreeMap<usize, Article>,
    /// Identifiers that were dropped, with the reason.
    pub dropped: Vec<(usize, ParseFailure)>,
}

pub struct HtmlParser<'a, F> {
    fetcher: &'a F,
    schema: &'a dyn PageSchema,
    encoding: &'static Encoding,
}

impl<'a, F> HtmlParser<'a, F>
where
    F: Fetch,
{
    pub fn new(config: &RunConfig, fetcher: &'a F, schema: &'a dyn PageSchema) -> Self {
        Self {
            fetcher,
            schema,
            encoding: config.encoding(),
        }
    }

    /// Fetch one article page and extract its record.
    #[instrument(level = "info", skip_all, fields(id = link.id, url = %link.url))]
    pub async fn parse(&self, link: &DiscoveredLink) -> Result<Article, ParseFailure> {
        let page = self.fetcher.fetch(&link.url).await?;
        debug!(status = page.status, bytes = page.body.len(), "Fetched article page");
        let html = page.text(self.encoding);
        self.extract(link, &html, Local::now().naive_local())
    }

    /// Extract an article from already-fetched markup.
    ///
    /// `now` anchors relative dates such as `3 hours ago`.
    pub fn extract(
        &self,
        link: &DiscoveredLink,
        html: &str,
        now: NaiveDateTime,
    ) -> Result<Article, ParseFailure> {
        let document = Html::parse_document(html);

        let text = self.schema.text(&document);
        if text.trim().is_empty() {
            return Err(ParseFailure::EmptyText);
        }

        let raw_date = self
            .schema
            .date_text(&document)
            .ok_or(DateParseFailure::Missing)?;
        let published = self.schema.unify_date_format(&raw_date, now)?;

        let title = self.schema.title(&document).unwrap_or_else(|| {
            debug!("No title found; using sentinel");
            UNKNOWN_TITLE.to_string()
        });

        let mut authors = self.schema.authors(&document);
        if authors.is_empty() {
            debug!("No author found; using sentinel");
            authors.push(UNKNOWN_AUTHOR.to_string());
        }
        let topics = self.schema.topics(&document);

        info!(
            title = %truncate_for_log(&title, 80),
            bytes = text.len(),
            authors = authors.len(),
            topics = topics.len(),
            %published,
            "Parsed article"
        );
        Ok(Article {
            id: link.id,
            url: link.url.clone(),
            title,
            text,
            authors,
            topics,
            published,
        })
    }

    /// Parse every link with at most `workers` fetches in flight.
    ///
    /// # Arguments
    ///
    /// * `links` - Discovered links, identifiers already assigned
    /// * `workers` - Concurrent fetches, clamped to `1..=MAX_WORKERS`
    ///
    /// # Returns
    ///
    /// A [`ParseOutcome`] with articles keyed by identifier. Failures are
    /// logged and recorded in [`ParseOutcome::dropped`], sorted by identifier.
    #[instrument(level = "info", skip_all, fields(links = links.len(), workers = workers))]
    pub async fn parse_all(&self, links: &[DiscoveredLink], workers: usize) -> ParseOutcome {
        let workers = workers.clamp(1, MAX_WORKERS);
        let results: Vec<(&DiscoveredLink, Result<Article, ParseFailure>)> = stream::iter(links)
            .map(|link| async move { (link, self.parse(link).await) })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut outcome = ParseOutcome::default();
        for (link, result) in results {
            match result {
                Ok(article) => {
                    outcome.articles.insert(article.id, article);
                }
                Err(failure) => {
                    warn!(id = link.id, url = %link.url, error = %failure, "Dropping article");
                    outcome.dropped.push((link.id, failure));
                }
            }
        }
        outcome.dropped.sort_by_key(|(id, _)| *id);

        info!(
            parsed = outcome.articles.len(),
            dropped = outcome.dropped.len(),
            "Parsed discovered articles"
        );
        outcome
    }
}
