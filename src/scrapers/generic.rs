//! Extraction rules for sites that publish standard article metadata.
//!
//! Most news sites expose OpenGraph / `article:*` meta tags and a JSON-LD
//! `NewsArticle` block, so this schema reads those first and falls back to
//! plain markup (`h1`, `<time>`, bylines). Listing pages are expected to link
//! articles from `<article>` cards or headings and to mark the next listing
//! page with `rel="next"` or a `.pagination` block.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use super::utils::{content_blocks, first_text, meta_content, meta_contents, resolve_links, texts};
use super::{PageSchema, dates, jsonld};
use crate::error::DateParseFailure;
use crate::utils::unique_non_empty;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static ARTICLE_LINKS: Lazy<Selector> = Lazy::new(|| {
    selector("article a[href], h2 a[href], h3 a[href], a[rel~='bookmark'][href]")
});
static PAGINATION: Lazy<Selector> = Lazy::new(|| {
    selector("a[rel~='next'][href], link[rel~='next'][href], .pagination a[href], .pager a[href]")
});
static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector("meta[property='og:title']"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META_AUTHOR: Lazy<Selector> = Lazy::new(|| selector("meta[name='author']"));
static BYLINE: Lazy<Selector> =
    Lazy::new(|| selector("[rel~='author'], [itemprop='author'] [itemprop='name'], .byline a, .author-name"));
static ARTICLE_TAGS: Lazy<Selector> = Lazy::new(|| selector("meta[property='article:tag']"));
static META_KEYWORDS: Lazy<Selector> = Lazy::new(|| selector("meta[name='keywords']"));
static PUBLISHED_META: Lazy<Selector> = Lazy::new(|| {
    selector("meta[property='article:published_time'], meta[itemprop='datePublished'], meta[name='pubdate']")
});
static TIME_DATETIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time"));

/// Body containers, most specific first.
static BODY_BLOCKS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "[itemprop='articleBody'] p",
        "article p",
        "main p",
        "p",
    ]
    .iter()
    .map(|css| selector(css))
    .collect()
});

/// Absolute layout this schema renders dates in.
pub const DATE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSchema;

impl PageSchema for GenericSchema {
    fn site(&self) -> &'static str {
        "generic"
    }

    fn article_links(&self, document: &Html, page_url: &Url) -> Vec<Url> {
        resolve_links(document, &ARTICLE_LINKS, page_url)
            .into_iter()
            .filter(|url| url != page_url)
            .collect()
    }

    fn pagination_links(&self, document: &Html, page_url: &Url) -> Vec<Url> {
        resolve_links(document, &PAGINATION, page_url)
            .into_iter()
            .filter(|url| url != page_url)
            .collect()
    }

    fn title(&self, document: &Html) -> Option<String> {
        meta_content(document, &OG_TITLE)
            .or_else(|| first_text(document, &H1))
            .or_else(|| first_text(document, &TITLE))
    }

    fn text(&self, document: &Html) -> String {
        BODY_BLOCKS
            .iter()
            .map(|sel| content_blocks(document, sel))
            .find(|blocks| !blocks.is_empty())
            .unwrap_or_default()
            .join("\n")
    }

    fn authors(&self, document: &Html) -> Vec<String> {
        let from_ld = unique_non_empty(jsonld::authors(document));
        if !from_ld.is_empty() {
            return from_ld;
        }
        let from_meta = unique_non_empty(meta_contents(document, &META_AUTHOR));
        if !from_meta.is_empty() {
            return from_meta;
        }
        unique_non_empty(texts(document, &BYLINE))
    }

    fn topics(&self, document: &Html) -> Vec<String> {
        let tags = meta_contents(document, &ARTICLE_TAGS);
        let keywords = meta_content(document, &META_KEYWORDS)
            .map(|k| k.split(',').map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default();
        unique_non_empty(tags.into_iter().chain(jsonld::keywords(document)).chain(keywords))
    }

    fn date_text(&self, document: &Html) -> Option<String> {
        meta_content(document, &PUBLISHED_META)
            .or_else(|| jsonld::date_published(document))
            .or_else(|| {
                document
                    .select(&TIME_DATETIME)
                    .filter_map(|el| el.value().attr("datetime"))
                    .map(str::trim)
                    .find(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .or_else(|| first_text(document, &TIME))
    }

    fn unify_date_format(
        &self,
        raw: &str,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, DateParseFailure> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DateParseFailure::Missing);
        }
        dates::parse_relative(raw, now)
            .or_else(|| dates::parse_absolute(raw, dates::DATETIME_FORMATS, dates::DATE_FORMATS))
            .ok_or_else(|| DateParseFailure::Unparseable {
                raw: raw.to_string(),
            })
    }

    fn render_date(&self, date: NaiveDateTime) -> String {
        date.format(DATE_LAYOUT).to_string()
    }
}
