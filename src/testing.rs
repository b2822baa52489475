//! Test helpers shared across modules.

use crate::config::RunConfig;
use crate::error::FetchFailure;
use crate::fetcher::{Fetch, FetchResult, FetchedPage};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// A valid config with a one-second timeout and a test user agent.
pub fn config_for(seeds: &[&str], total_articles: usize) -> RunConfig {
    RunConfig::from_value(&json!({
        "seed_urls": seeds,
        "total_articles_to_find_and_parse": total_articles,
        "headers": {"User-Agent": "article-crawler-test"},
        "encoding": "utf-8",
        "timeout": 1,
        "should_verify_certificate": true,
        "headless_mode": false
    }))
    .unwrap()
}

pub fn page(url: &str, html: &str) -> FetchedPage {
    FetchedPage {
        url: Url::parse(url).unwrap(),
        status: 200,
        body: html.as_bytes().to_vec(),
        charset: Some("utf-8".to_string()),
    }
}

/// In-memory fetcher serving canned pages. Unknown URLs answer 404.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchResult>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        let fetched = page(url, html);
        self.pages.insert(fetched.url.to_string(), Ok(fetched));
        self
    }

    /// Serve `html` for `url` as if the server redirected to `final_url`.
    pub fn with_redirect(mut self, url: &str, final_url: &str, html: &str) -> Self {
        let fetched = page(final_url, html);
        self.pages.insert(Url::parse(url).unwrap().to_string(), Ok(fetched));
        self
    }

    pub fn with_failure(mut self, url: &str, failure: FetchFailure) -> Self {
        self.pages.insert(Url::parse(url).unwrap().to_string(), Err(failure));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url.as_str())
            .cloned()
            .unwrap_or(Err(FetchFailure::Status(404)))
    }
}
