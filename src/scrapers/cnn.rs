//! CNN article extraction rules.
//!
//! Section fronts on `www.cnn.com` link stories through `a.container__link`
//! cards whose paths start with the publication date, e.g.
//! `https://www.cnn.com/2025/05/06/politics/article-slug`. Fronts do not
//! paginate.
//!
//! # Date Layout
//!
//! Story pages carry a `.timestamp` block such as
//! `Updated 4:12 PM EDT, Tue May 6, 2025`. The verb and zone abbreviation are
//! dropped and the wall-clock time is kept, so the canonical layout is
//! `4:12 PM, Tue May 6, 2025`.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::generic::GenericSchema;
use super::utils::{content_blocks, first_text, meta_content, resolve_links, texts};
use super::{PageSchema, dates};
use crate::error::DateParseFailure;
use crate::utils::{collapse_whitespace, unique_non_empty};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static STORY_LINKS: Lazy<Selector> =
    Lazy::new(|| selector("a.container__link[href], a[data-link-type='article'][href]"));
static HEADLINE: Lazy<Selector> = Lazy::new(|| selector("h1.headline__text, .headline h1"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector(".article__content p.paragraph"));
static ANY_PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector(".article__content p"));
static BYLINE_NAMES: Lazy<Selector> = Lazy::new(|| selector(".byline__name"));
static SECTION: Lazy<Selector> = Lazy::new(|| selector("meta[name='meta-section']"));
static TIMESTAMP: Lazy<Selector> = Lazy::new(|| selector(".timestamp"));

static DATED_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/\d{4}/\d{2}/\d{2}/").expect("static regex"));
static VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(updated|published)\s+").expect("static regex"));
static ZONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[ECMP][SD]T|ET|UTC|GMT|BST)\b").expect("static regex")
});

/// Layout used for parsing; hours and days may be one or two digits.
const PARSE_LAYOUT: &str = "%I:%M %p, %a %b %d, %Y";
/// Layout the site prints, without zero padding.
const RENDER_LAYOUT: &str = "%-I:%M %p, %a %b %-d, %Y";

#[derive(Debug, Clone, Copy, Default)]
pub struct CnnSchema {
    fallback: GenericSchema,
}

impl CnnSchema {
    /// Strip the leading verb and zone abbreviation from timestamp text.
    fn normalize_timestamp(raw: &str) -> String {
        let text = collapse_whitespace(raw);
        let text = VERB.replace(&text, "");
        let text = ZONE.replace_all(&text, "");
        collapse_whitespace(&text).replace(" ,", ",")
    }
}

impl PageSchema for CnnSchema {
    fn site(&self) -> &'static str {
        "cnn"
    }

    fn article_links(&self, document: &Html, page_url: &Url) -> Vec<Url> {
        resolve_links(document, &STORY_LINKS, page_url)
            .into_iter()
            .filter(|url| DATED_PATH.is_match(url.path()))
            .collect()
    }

    fn pagination_links(&self, _document: &Html, _page_url: &Url) -> Vec<Url> {
        Vec::new()
    }

    fn title(&self, document: &Html) -> Option<String> {
        first_text(document, &HEADLINE).or_else(|| self.fallback.title(document))
    }

    fn text(&self, document: &Html) -> String {
        let mut blocks = content_blocks(document, &PARAGRAPHS);
        if blocks.is_empty() {
            blocks = content_blocks(document, &ANY_PARAGRAPH);
        }
        if blocks.is_empty() {
            return self.fallback.text(document);
        }
        blocks.join("\n")
    }

    fn authors(&self, document: &Html) -> Vec<String> {
        let names = unique_non_empty(texts(document, &BYLINE_NAMES));
        if names.is_empty() {
            self.fallback.authors(document)
        } else {
            names
        }
    }

    fn topics(&self, document: &Html) -> Vec<String> {
        let section = meta_content(document, &SECTION);
        unique_non_empty(section.into_iter().chain(self.fallback.topics(document)))
    }

    fn date_text(&self, document: &Html) -> Option<String> {
        first_text(document, &TIMESTAMP).or_else(|| self.fallback.date_text(document))
    }

    fn unify_date_format(
        &self,
        raw: &str,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, DateParseFailure> {
        let normalized = Self::normalize_timestamp(raw);
        if normalized.is_empty() {
            return Err(DateParseFailure::Missing);
        }
        NaiveDateTime::parse_from_str(&normalized, PARSE_LAYOUT)
            .ok()
            .or_else(|| dates::parse_relative(&normalized, now))
            .map(Ok)
            .unwrap_or_else(|| self.fallback.unify_date_format(raw, now))
    }

    fn render_date(&self, date: NaiveDateTime) -> String {
        date.format(RENDER_LAYOUT).to_string()
    }
}
