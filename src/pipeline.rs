//! One crawl run from a validated configuration to files on disk.
//!
//! 1. **Environment**: reset the assets directory
//! 2. **Discovery**: walk the seed pages for article links
//! 3. **Parsing**: fetch and extract each discovered article
//! 4. **Output**: persist every parsed article by identifier
//!
//! Only an unusable output directory aborts the run. Pages that fail to fetch
//! or parse just shrink the output.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::config::RunConfig;
use crate::crawler::Crawler;
use crate::environment::prepare;
use crate::error::EnvironmentError;
use crate::fetcher::Fetch;
use crate::models::RunSummary;
use crate::outputs::persist;
use crate::parser::HtmlParser;
use crate::scrapers::PageSchema;

/// Process-level knobs that are not part of the run configuration file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub assets_dir: PathBuf,
    /// Concurrent article fetches; 1 keeps the run fully sequential.
    pub workers: usize,
    /// Stop discovery after this long.
    pub deadline: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("tmp/articles"),
            workers: 1,
            deadline: None,
        }
    }
}

/// Execute one full crawl.
///
/// # Arguments
///
/// * `config` - Validated run parameters
/// * `fetcher` - Transport for listing and article pages
/// * `schema` - Extraction rules for the target site
/// * `options` - Output location, worker count and discovery deadline
///
/// # Returns
///
/// Counts of discovered, parsed, dropped and persisted articles. Only a
/// failure to prepare the assets directory is returned as an error.
#[instrument(level = "info", skip_all, fields(site = schema.site(), assets_dir = %options.assets_dir.display()))]
pub async fn run<F: Fetch>(
    config: &RunConfig,
    fetcher: &F,
    schema: &dyn PageSchema,
    options: &RunOptions,
) -> Result<RunSummary, EnvironmentError> {
    prepare(&options.assets_dir).await?;

    if config.headless_mode() {
        warn!("Headless rendering is not available; fetching static markup");
    }

    let mut crawler = Crawler::new(config, fetcher, schema);
    if let Some(limit) = options.deadline {
        crawler = crawler.with_deadline(Instant::now() + limit);
    }
    crawler.find_articles().await;
    let links = crawler.into_links();

    let parser = HtmlParser::new(config, fetcher, schema);
    let outcome = parser.parse_all(&links, options.workers).await;

    let mut summary = RunSummary {
        discovered: links.len(),
        parsed: outcome.articles.len(),
        dropped: outcome.dropped.len(),
        persisted: 0,
    };
    for article in outcome.articles.values() {
        match persist(article, &options.assets_dir).await {
            Ok(()) => summary.persisted += 1,
            Err(e) => error!(id = article.id, error = %e, "Failed to persist article"),
        }
    }

    info!(
        discovered = summary.discovered,
        parsed = summary.parsed,
        dropped = summary.dropped,
        persisted = summary.persisted,
        "Run complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailure;
    use crate::fetcher::HttpFetcher;
    use crate::models::ArticleMeta;
    use crate::scrapers::generic::GenericSchema;
    use crate::testing::{StaticFetcher, config_for};
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEED: &str = "https://www.example.com/news";

    const LISTING: &str = r#"<html><body>
        <article><h2><a href="/news/one">One</a></h2></article>
        <article><h2><a href="/news/two">Two</a></h2></article>
        <article><h2><a href="/news/three">Three</a></h2></article>
    </body></html>"#;

    fn story(title: &str) -> String {
        format!(
            r#"<html><head>
                <meta property="og:title" content="{title}">
                <meta property="article:published_time" content="2025-05-06T09:00:00+00:00">
              </head><body><article><p>{title} body.</p></article></body></html>"#
        )
    }

    fn options(dir: &Path) -> RunOptions {
        RunOptions {
            assets_dir: dir.join("articles"),
            ..RunOptions::default()
        }
    }

    fn ids_on_disk(dir: &Path) -> Vec<usize> {
        let mut ids: Vec<usize> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| {
                let name = e.unwrap().file_name().into_string().unwrap();
                name.strip_suffix("_meta.json").map(|id| id.parse().unwrap())
            })
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_three_articles_in_page_order() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new()
            .with_page(SEED, LISTING)
            .with_page("https://www.example.com/news/one", &story("One"))
            .with_page("https://www.example.com/news/two", &story("Two"))
            .with_page("https://www.example.com/news/three", &story("Three"));
        let config = config_for(&[SEED], 3);
        let opts = options(tmp.path());

        let summary = run(&config, &fetcher, &GenericSchema, &opts).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                discovered: 3,
                parsed: 3,
                dropped: 0,
                persisted: 3
            }
        );
        assert_eq!(ids_on_disk(&opts.assets_dir), vec![1, 2, 3]);

        let meta: ArticleMeta = serde_json::from_str(
            &std::fs::read_to_string(opts.assets_dir.join("2_meta.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(meta.title, "Two");
        assert_eq!(meta.url, "https://www.example.com/news/two");
    }

    #[tokio::test]
    async fn test_failed_article_keeps_identifiers() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new()
            .with_page(SEED, LISTING)
            .with_page("https://www.example.com/news/one", &story("One"))
            .with_failure("https://www.example.com/news/two", FetchFailure::Timeout)
            .with_page("https://www.example.com/news/three", &story("Three"));
        let config = config_for(&[SEED], 3);
        let opts = RunOptions {
            workers: 3,
            ..options(tmp.path())
        };

        let summary = run(&config, &fetcher, &GenericSchema, &opts).await.unwrap();
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.dropped, 1);
        assert_eq!(ids_on_disk(&opts.assets_dir), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_previous_output_is_cleared() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(tmp.path());
        std::fs::create_dir_all(&opts.assets_dir).unwrap();
        std::fs::write(opts.assets_dir.join("9_meta.json"), "{}").unwrap();

        let fetcher = StaticFetcher::new().with_failure(SEED, FetchFailure::Status(503));
        let config = config_for(&[SEED], 3);
        let summary = run(&config, &fetcher, &GenericSchema, &opts).await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(ids_on_disk(&opts.assets_dir).is_empty());
    }

    #[tokio::test]
    async fn test_unusable_output_location_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(tmp.path());
        std::fs::write(&opts.assets_dir, "file in the way").unwrap();

        let fetcher = StaticFetcher::new();
        let config = config_for(&[SEED], 3);
        let result = run(&config, &fetcher, &GenericSchema, &opts).await;

        assert!(matches!(result, Err(EnvironmentError::NotADirectory(_))));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        const HOST: &str = "www.example.test";
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/one"))
            .respond_with(ResponseTemplate::new(200).set_body_string(story("One")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/two"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/three"))
            .respond_with(ResponseTemplate::new(200).set_body_string(story("Three")))
            .mount(&server)
            .await;

        let seed = format!("http://{HOST}:{}/news", server.address().port());
        let config = config_for(&[seed.as_str()], 3);
        let fetcher = HttpFetcher::from_builder(
            HttpFetcher::client_builder(&config).resolve(HOST, *server.address()),
        )
        .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let opts = options(tmp.path());
        let summary = run(&config, &fetcher, &GenericSchema, &opts).await.unwrap();

        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.persisted, 2);
        assert_eq!(ids_on_disk(&opts.assets_dir), vec![1, 3]);
        let text = std::fs::read_to_string(opts.assets_dir.join("3_raw.txt")).unwrap();
        assert_eq!(text, "Three body.");
    }
}
