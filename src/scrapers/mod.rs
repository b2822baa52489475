//! Site-specific extraction rules.
//!
//! Discovery and parsing never hard-code selectors. They are handed a
//! [`PageSchema`] chosen by site id, which knows where one markup dialect keeps
//! article links, pagination, body text, bylines, topics and dates, and how
//! that site writes its publication dates.
//!
//! # Supported Sites
//!
//! | Site id | Module | Notes |
//! |---------|--------|-------|
//! | `generic` | [`generic`] | OpenGraph / `article:*` meta, JSON-LD, `rel=next` pagination |
//! | `cnn` | [`cnn`] | `www.cnn.com` containers, bylines and `.timestamp` text |

use chrono::NaiveDateTime;
use scraper::Html;
use url::Url;

use crate::error::DateParseFailure;

pub mod cnn;
pub mod dates;
pub mod generic;
pub mod jsonld;

/// Site ids accepted by [`schema_for`].
pub const SITES: &[&str] = &["generic", "cnn"];

/// Extraction rules for one markup dialect.
pub trait PageSchema: Send + Sync {
    /// Site id this schema is registered under.
    fn site(&self) -> &'static str;

    /// Absolute candidate article URLs on a listing page, in document order.
    fn article_links(&self, document: &Html, page_url: &Url) -> Vec<Url>;

    /// Further listing pages linked from a listing page.
    fn pagination_links(&self, document: &Html, page_url: &Url) -> Vec<Url>;

    fn title(&self, document: &Html) -> Option<String>;

    /// Body text blocks in document order with boilerplate removed, one per line.
    fn text(&self, document: &Html) -> String;

    fn authors(&self, document: &Html) -> Vec<String>;

    fn topics(&self, document: &Html) -> Vec<String>;

    /// Raw publication date text as the page presents it.
    fn date_text(&self, document: &Html) -> Option<String>;

    /// Turn the site's date text into a canonical timestamp.
    ///
    /// Relative dates are resolved against `now`.
    fn unify_date_format(
        &self,
        raw: &str,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, DateParseFailure>;

    /// Render a timestamp in the site's own absolute date layout.
    fn render_date(&self, date: NaiveDateTime) -> String;
}

/// Look up the extraction rules registered under `site`.
pub fn schema_for(site: &str) -> Option<Box<dyn PageSchema>> {
    match site.trim().to_ascii_lowercase().as_str() {
        "generic" => Some(Box::new(generic::GenericSchema)),
        "cnn" => Some(Box::new(cnn::CnnSchema::default())),
        _ => None,
    }
}

/// Markup helpers shared by the schemas.
pub(crate) mod utils {
    use crate::utils::collapse_whitespace;
    use scraper::{ElementRef, Html, Selector};
    use url::Url;

    /// Tags whose content is never article text.
    const BOILERPLATE_TAGS: &[&str] = &[
        "nav", "header", "footer", "aside", "figure", "figcaption", "script", "style",
        "noscript", "form", "button",
    ];

    /// Class/id words that mark navigation, ads and widgets.
    ///
    /// A token matches when it is one of these words or starts with one followed
    /// by `-` or `_` (`ad-slot`, `share_tools`). Taxonomy classes such as
    /// `tag-social-media` only contain a word and do not match.
    const BOILERPLATE_WORDS: &[&str] = &[
        "ad", "ads", "advert", "advertisement", "promo", "sponsored", "related", "share",
        "social", "subscribe", "newsletter", "cookie", "breadcrumb", "menu", "comments",
    ];

    /// Containers article text is anchored in. Their classes are never read.
    const CONTENT_ROOTS: &[&str] = &["html", "body", "main", "article"];

    /// Resolve every `href` matched by `selector` against `base`.
    ///
    /// Fragments are dropped and only http(s) URLs are kept.
    pub fn resolve_links(document: &Html, selector: &Selector, base: &Url) -> Vec<Url> {
        document
            .select(selector)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| base.join(href.trim()).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(|mut url| {
                url.set_fragment(None);
                url
            })
            .collect()
    }

    /// `content` attribute of the first element matching `selector`.
    pub fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|content| !content.is_empty())
    }

    /// `content` attributes of every element matching `selector`.
    pub fn meta_contents(document: &Html, selector: &Selector) -> Vec<String> {
        document
            .select(selector)
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .filter(|content| !content.is_empty())
            .collect()
    }

    /// Normalised text of the first non-empty match.
    pub fn first_text(document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    }

    /// Normalised text of every non-empty match.
    pub fn texts(document: &Html, selector: &Selector) -> Vec<String> {
        document
            .select(selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// Text blocks matched by `selector`, skipping any inside boilerplate.
    pub fn content_blocks(document: &Html, selector: &Selector) -> Vec<String> {
        document
            .select(selector)
            .filter(|el| !is_boilerplate(*el))
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    pub fn element_text(element: ElementRef<'_>) -> String {
        collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
    }

    /// Whether the element or any ancestor is navigation, an ad or a widget.
    pub fn is_boilerplate(element: ElementRef<'_>) -> bool {
        std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .any(|el| {
                let value = el.value();
                if BOILERPLATE_TAGS.contains(&value.name()) {
                    return true;
                }
                if is_content_root(el) {
                    return false;
                }
                value.classes().any(is_boilerplate_token)
                    || value.id().is_some_and(is_boilerplate_token)
            })
    }

    fn is_content_root(element: ElementRef<'_>) -> bool {
        let value = element.value();
        CONTENT_ROOTS.contains(&value.name()) || value.attr("itemprop") == Some("articleBody")
    }

    fn is_boilerplate_token(token: &str) -> bool {
        let token = token.to_ascii_lowercase();
        BOILERPLATE_WORDS.iter().any(|word| {
            token
                .strip_prefix(word)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['-', '_']))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_schema_registry() {
        for site in SITES {
            let schema = schema_for(site).unwrap();
            assert_eq!(schema.site(), *site);
        }
        assert_eq!(schema_for(" CNN ").unwrap().site(), "cnn");
        assert!(schema_for("unknown-site").is_none());
    }

    #[test]
    fn test_resolve_links() {
        let html = r##"
            <a href="/news/one#comments">One</a>
            <a href="https://www.example.com/news/two">Two</a>
            <a href="mailto:desk@example.com">Mail</a>
            <a href="javascript:void(0)">Nothing</a>
        "##;
        let document = Html::parse_document(html);
        let base = Url::parse("https://www.example.com/news/").unwrap();
        let links = utils::resolve_links(&document, &Selector::parse("a[href]").unwrap(), &base);
        let links: Vec<_> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://www.example.com/news/one",
                "https://www.example.com/news/two"
            ]
        );
    }

    #[test]
    fn test_content_blocks_skip_boilerplate() {
        let html = r#"
            <article>
              <p>First   paragraph.</p>
              <div class="ad-slot"><p>Buy now</p></div>
              <aside><p>Read more</p></aside>
              <div class="article-body"><p>Second paragraph.</p></div>
              <div id="share_tools"><p>Share this</p></div>
              <p>   </p>
            </article>
        "#;
        let document = Html::parse_document(html);
        let blocks = utils::content_blocks(&document, &Selector::parse("article p").unwrap());
        assert_eq!(blocks, vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn test_taxonomy_classes_on_article_are_kept() {
        let html = r#"
            <main>
              <article class="post type-post category-related-news tag-social-media">
                <p>Real paragraph one.</p>
                <div class="share-buttons"><p>Share</p></div>
                <div class="entry-content tag-ads-policy"><p>Real paragraph two.</p></div>
              </article>
            </main>
        "#;
        let document = Html::parse_document(html);
        let blocks = utils::content_blocks(&document, &Selector::parse("article p").unwrap());
        assert_eq!(blocks, vec!["Real paragraph one.", "Real paragraph two."]);
    }

    #[test]
    fn test_header_class_is_not_mistaken_for_ad() {
        let html = r#"<div class="heading loaded"><p>Kept</p></div>"#;
        let document = Html::parse_document(html);
        let blocks = utils::content_blocks(&document, &Selector::parse("p").unwrap());
        assert_eq!(blocks, vec!["Kept"]);
    }
}
