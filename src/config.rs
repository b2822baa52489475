//! Run configuration loading and validation.
//!
//! The config document is read into an untyped [`serde_json::Value`] first so
//! every rule can be checked against the raw structure, including type errors
//! that typed deserialisation would collapse into a single syntax failure.
//!
//! ```json
//! {
//!   "seed_urls": ["https://www.example.com/news"],
//!   "total_articles_to_find_and_parse": 10,
//!   "headers": {"user-agent": "Mozilla/5.0"},
//!   "encoding": "utf-8",
//!   "timeout": 10,
//!   "should_verify_certificate": true,
//!   "headless_mode": false
//! }
//! ```
//!
//! A `.yaml` or `.yml` file with the same keys is accepted as well.

use crate::error::ConfigError;
use encoding_rs::Encoding;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

pub const MIN_ARTICLES: i64 = 1;
pub const MAX_ARTICLES: i64 = 150;
pub const MIN_TIMEOUT_SECS: i64 = 1;
pub const MAX_TIMEOUT_SECS: i64 = 60;

/// Validated, immutable parameters for one crawl run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    seed_urls: Vec<Url>,
    total_articles: usize,
    headers: BTreeMap<String, String>,
    encoding: &'static Encoding,
    timeout: Duration,
    verify_certificate: bool,
    headless_mode: bool,
}

impl RunConfig {
    /// Listing pages discovery starts from.
    pub fn seed_urls(&self) -> &[Url] {
        &self.seed_urls
    }

    /// Number of articles to discover and parse.
    pub fn total_articles(&self) -> usize {
        self.total_articles
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Fallback encoding for bodies that do not declare a charset.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verify_certificate(&self) -> bool {
        self.verify_certificate
    }

    pub fn headless_mode(&self) -> bool {
        self.headless_mode
    }

    /// Validate a raw config document and build a [`RunConfig`] from it.
    ///
    /// Every rule is evaluated. If any fail, each violation is logged and the
    /// first one in rule order is returned; nothing is constructed.
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let Some(doc) = raw.as_object() else {
            return Err(ConfigError::Malformed(
                "top level must be an object".to_string(),
            ));
        };

        let mut violations = Vec::new();
        let mut check = |result: Result<_, ConfigError>| result.map_err(|e| violations.push(e)).ok();
        let seed_urls = check(validate_seed_urls(doc.get("seed_urls")).map(Rule::Seeds));
        let total_articles = check(
            validate_article_count(doc.get("total_articles_to_find_and_parse")).map(Rule::Count),
        );
        let headers = check(validate_headers(doc.get("headers")).map(Rule::Headers));
        let encoding = check(validate_encoding(doc.get("encoding")).map(Rule::Encoding));
        let timeout = check(validate_timeout(doc.get("timeout")).map(Rule::Timeout));
        let verify_certificate = check(
            validate_flag(doc.get("should_verify_certificate"), "should_verify_certificate")
                .map(Rule::Flag),
        );
        let headless_mode = check(validate_flag(doc.get("headless_mode"), "headless_mode").map(Rule::Flag));

        let mut violations = violations.into_iter();
        if let Some(first) = violations.next() {
            for other in violations {
                warn!(error = %other, "Additional config violation");
            }
            return Err(first);
        }

        match (
            seed_urls,
            total_articles,
            headers,
            encoding,
            timeout,
            verify_certificate,
            headless_mode,
        ) {
            (
                Some(Rule::Seeds(seed_urls)),
                Some(Rule::Count(total_articles)),
                Some(Rule::Headers(headers)),
                Some(Rule::Encoding(encoding)),
                Some(Rule::Timeout(timeout)),
                Some(Rule::Flag(verify_certificate)),
                Some(Rule::Flag(headless_mode)),
            ) => Ok(Self {
                seed_urls,
                total_articles,
                headers,
                encoding,
                timeout,
                verify_certificate,
                headless_mode,
            }),
            _ => Err(ConfigError::Malformed("validation incomplete".to_string())),
        }
    }
}

/// Outcome of a single validation rule.
enum Rule {
    Seeds(Vec<Url>),
    Count(usize),
    Headers(BTreeMap<String, String>),
    Encoding(&'static Encoding),
    Timeout(Duration),
    Flag(bool),
}

/// Read, validate and build the run configuration stored at `path`.
///
/// # Arguments
///
/// * `path` - Config file; `.yaml`/`.yml` is read as YAML, anything else as JSON
///
/// # Returns
///
/// A fully validated [`RunConfig`], or the first violated rule as a
/// [`ConfigError`]. Unreadable files and syntax errors are reported as
/// `Unreadable` and `Malformed`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load(path: &Path) -> Result<RunConfig, ConfigError> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let raw: Value = if is_yaml {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Malformed(e.to_string()))?
    } else {
        serde_json::from_str(&contents).map_err(|e| ConfigError::Malformed(e.to_string()))?
    };

    let config = RunConfig::from_value(&raw)?;
    info!(
        seeds = config.seed_urls.len(),
        total_articles = config.total_articles,
        encoding = config.encoding.name(),
        timeout_secs = config.timeout.as_secs(),
        verify_certificate = config.verify_certificate,
        headless_mode = config.headless_mode,
        "Loaded run configuration"
    );
    Ok(config)
}

fn validate_seed_urls(value: Option<&Value>) -> Result<Vec<Url>, ConfigError> {
    let seeds = value
        .and_then(Value::as_array)
        .ok_or_else(|| ConfigError::InvalidSeedUrl("seed_urls must be a list".to_string()))?;
    if seeds.is_empty() {
        return Err(ConfigError::InvalidSeedUrl("seed_urls is empty".to_string()));
    }

    let mut urls = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let seed = seed
            .as_str()
            .ok_or_else(|| ConfigError::InvalidSeedUrl(seed.to_string()))?;
        if !(seed.starts_with("https://www.") || seed.starts_with("http://www.")) {
            return Err(ConfigError::InvalidSeedUrl(seed.to_string()));
        }
        let url = Url::parse(seed).map_err(|e| ConfigError::InvalidSeedUrl(format!("{seed}: {e}")))?;
        urls.push(url);
    }

    let host = urls[0].host_str().map(str::to_owned);
    if let Some(stray) = urls.iter().find(|url| url.host_str().map(str::to_owned) != host) {
        return Err(ConfigError::InvalidSeedUrl(format!(
            "{stray} is not on the same site as {}",
            urls[0]
        )));
    }
    Ok(urls)
}

fn validate_article_count(value: Option<&Value>) -> Result<usize, ConfigError> {
    let count = value
        .and_then(Value::as_i64)
        .ok_or_else(|| ConfigError::ArticleCountOutOfRange(describe(value)))?;
    if !(MIN_ARTICLES..=MAX_ARTICLES).contains(&count) {
        return Err(ConfigError::ArticleCountOutOfRange(count.to_string()));
    }
    Ok(count as usize)
}

fn validate_headers(value: Option<&Value>) -> Result<BTreeMap<String, String>, ConfigError> {
    let map = value
        .and_then(Value::as_object)
        .ok_or_else(|| ConfigError::InvalidHeaders(describe(value)))?;

    let mut headers = BTreeMap::new();
    for (name, value) in map {
        let value = value
            .as_str()
            .ok_or_else(|| ConfigError::InvalidHeaders(format!("{name} is not a string")))?;
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeaders(format!("bad header name {name:?}")))?;
        HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeaders(format!("bad value for {name}")))?;
        headers.insert(name.clone(), value.to_string());
    }
    Ok(headers)
}

fn validate_encoding(value: Option<&Value>) -> Result<&'static Encoding, ConfigError> {
    let label = value
        .and_then(Value::as_str)
        .ok_or_else(|| ConfigError::InvalidEncoding(describe(value)))?;
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ConfigError::InvalidEncoding(label.to_string()))
}

fn validate_timeout(value: Option<&Value>) -> Result<Duration, ConfigError> {
    let secs = value
        .and_then(Value::as_i64)
        .ok_or_else(|| ConfigError::InvalidTimeout(describe(value)))?;
    if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&secs) {
        return Err(ConfigError::InvalidTimeout(secs.to_string()));
    }
    Ok(Duration::from_secs(secs as u64))
}

fn validate_flag(value: Option<&Value>, key: &str) -> Result<bool, ConfigError> {
    value
        .and_then(Value::as_bool)
        .ok_or_else(|| ConfigError::InvalidFlag(format!("{key} = {}", describe(value))))
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "missing".to_string(),
    }
}
