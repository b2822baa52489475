//! Outbound HTTP with per-run policy and optional retry.
//!
//! # Architecture
//!
//! - [`Fetch`]: core trait, one request per call, failures classified not raised
//! - [`HttpFetcher`]: `reqwest` client carrying the run's headers, timeout and
//!   certificate policy for every request
//! - [`RetryFetch`]: decorator that retries transient failures with
//!   exponential backoff and jitter
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! Only [`FetchFailure::is_retryable`] failures are retried. A budget of zero
//! makes the decorator a pass-through.

use crate::config::RunConfig;
use crate::error::{FetchFailure, SetupError};
use encoding_rs::Encoding;
use rand::{Rng, rng};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// A successful response: raw body plus the charset the server declared.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub body: Vec<u8>,
    /// `charset` parameter of the `Content-Type` header, if any.
    pub charset: Option<String>,
}

impl FetchedPage {
    /// Decode the body, preferring the declared charset over `fallback`.
    pub fn text(&self, fallback: &'static Encoding) -> String {
        let encoding = self
            .charset
            .as_deref()
            .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
            .unwrap_or(fallback);
        let (text, used, had_errors) = encoding.decode(&self.body);
        if had_errors {
            debug!(url = %self.url, encoding = used.name(), "Body contained malformed sequences");
        }
        text.into_owned()
    }
}

pub type FetchResult = Result<FetchedPage, FetchFailure>;

/// Issue a single GET request.
pub trait Fetch {
    async fn fetch(&self, url: &Url) -> FetchResult;
}

/// `reqwest`-backed fetcher. Headers, timeout and certificate policy come from
/// the [`RunConfig`] and cannot be overridden per call.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &RunConfig) -> Result<Self, SetupError> {
        Self::from_builder(Self::client_builder(config))
    }

    /// Client builder with the run's request policy applied.
    pub fn client_builder(config: &RunConfig) -> ClientBuilder {
        let mut headers = HeaderMap::new();
        for (name, value) in config.headers() {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "Skipping header that is not a valid HTTP token"),
            }
        }

        Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_certificate())
    }

    pub fn from_builder(builder: ClientBuilder) -> Result<Self, SetupError> {
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> FetchResult {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Non-success status");
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type);
        let final_url = response.url().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Timeout
            } else {
                FetchFailure::Body(error_chain(&e))
            }
        })?;

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body: body.to_vec(),
            charset,
        })
    }
}

/// Extract the `charset` parameter from a `Content-Type` value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

fn classify(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        return FetchFailure::Timeout;
    }
    let chain = error_chain(&err);
    let lowered = chain.to_ascii_lowercase();
    if lowered.contains("certificate") || lowered.contains("invalidcert") {
        FetchFailure::Certificate(chain)
    } else {
        FetchFailure::Connection(chain)
    }
}

fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`] implementation.
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = RetryFetch::new(HttpFetcher::new(&config)?, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> FetchResult {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(failure) if !failure.is_retryable() => return Err(failure),
                Err(failure) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                                error = %failure,
                                "fetch exhausted retries"
                            );
                        }
                        return Err(failure);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %failure,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
