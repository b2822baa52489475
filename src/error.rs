//! Error taxonomy for a crawl run.
//!
//! Configuration, setup and environment errors are fatal and abort the run.
//! [`FetchFailure`], [`DateParseFailure`] and [`ParseFailure`] are scoped to a
//! single page or article: callers log them and move on.

use std::path::PathBuf;
use thiserror::Error;

/// The rule a rejected configuration violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    InvalidSeedUrl,
    ArticleCountOutOfRange,
    InvalidHeaders,
    InvalidEncoding,
    InvalidTimeout,
    InvalidFlag,
    Unreadable,
    Malformed,
}

/// Reasons a run configuration is rejected before any network activity.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid seed URL: {0}")]
    InvalidSeedUrl(String),

    #[error("number of articles out of range [1, 150]: {0}")]
    ArticleCountOutOfRange(String),

    #[error("invalid headers: {0}")]
    InvalidHeaders(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("timeout out of range [1, 60]: {0}")]
    InvalidTimeout(String),

    #[error("invalid flag: {0}")]
    InvalidFlag(String),

    #[error("cannot read config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config document: {0}")]
    Malformed(String),
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::InvalidSeedUrl(_) => ConfigErrorKind::InvalidSeedUrl,
            ConfigError::ArticleCountOutOfRange(_) => ConfigErrorKind::ArticleCountOutOfRange,
            ConfigError::InvalidHeaders(_) => ConfigErrorKind::InvalidHeaders,
            ConfigError::InvalidEncoding(_) => ConfigErrorKind::InvalidEncoding,
            ConfigError::InvalidTimeout(_) => ConfigErrorKind::InvalidTimeout,
            ConfigError::InvalidFlag(_) => ConfigErrorKind::InvalidFlag,
            ConfigError::Unreadable { .. } => ConfigErrorKind::Unreadable,
            ConfigError::Malformed(_) => ConfigErrorKind::Malformed,
        }
    }
}

/// Classified failure of a single outbound request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("certificate verification failed: {0}")]
    Certificate(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl FetchFailure {
    /// Whether another attempt at the same URL could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchFailure::Timeout | FetchFailure::Connection(_) => true,
            FetchFailure::Status(code) => *code >= 500 || *code == 429,
            FetchFailure::Certificate(_) | FetchFailure::Body(_) => false,
        }
    }
}

/// A publication date that could not be turned into a canonical timestamp.
///
/// A missing date and an unparseable one are both fatal for the article.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseFailure {
    #[error("no publication date found")]
    Missing,

    #[error("unrecognised date text: {raw:?}")]
    Unparseable { raw: String },
}

/// Why a discovered article was dropped from the run's output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error(transparent)]
    Date(#[from] DateParseFailure),

    #[error("article has no body text")]
    EmptyText,
}

/// The output location could not be reset to an empty, writable directory.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("{0} exists and is not a directory")]
    NotADirectory(PathBuf),

    #[error("cannot remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not writable: {source}")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The HTTP client could not be built from a validated configuration.
#[derive(Error, Debug)]
#[error("failed to build HTTP client: {0}")]
pub struct SetupError(#[from] pub reqwest::Error);
