use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::article::ArticleId;

/// Retrieving an article page failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("server answered {0}")]
    Status(StatusCode),
    #[error("invalid article url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to parse link selector: {0}")]
    Selector(String),
}

impl FetchError {
    /// Timeouts, connection failures and 5xx answers are worth another attempt.
    /// A 4xx means the article does not exist and will not start existing.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout => true,
            FetchError::Request(e) => e.is_connect() || e.is_request() || e.is_body(),
            FetchError::Status(status) => status.is_server_error(),
            FetchError::InvalidUrl(_) | FetchError::Selector(_) => false,
        }
    }
}

/// Longest pause between two attempts of the same request
pub const MAX_BACKOFF_MS: u64 = 10_000;

/// Pause before retry number `attempt`: 100 ms doubling per attempt, capped.
pub fn backoff_delay(attempt: usize) -> Duration {
    let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
    let ms = 100u64.saturating_mul(2u64.saturating_pow(exponent));
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e)
        }
    }
}

/// The similarity model could not score a pair of texts
#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("no token of `{0}` is in the model vocabulary")]
    OutOfVocabulary(String),
    #[error("model produced non-finite score {score} for `{candidate}`")]
    NonFinite { candidate: String, score: f64 },
    #[error("embedding request timed out")]
    Timeout,
    #[error("embedding request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("embedding service returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to load similarity model: {0}")]
    ModelLoad(String),
}

impl From<reqwest::Error> for SimilarityError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SimilarityError::Timeout
        } else {
            SimilarityError::Request(e)
        }
    }
}

/// Why a walk ended without reaching the target.
///
/// Every variant carries the number of clicks made so far and the article the
/// walk was standing on.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("failed to fetch `{article}` after {hops} clicks: {source}")]
    Fetch {
        article: ArticleId,
        hops: usize,
        #[source]
        source: FetchError,
    },
    #[error("stuck at `{article}` after {hops} clicks: every link was already visited (no path found via greedy search)")]
    NoViableLink { article: ArticleId, hops: usize },
    #[error("similarity failed while expanding `{article}` after {hops} clicks: {source}")]
    Similarity {
        article: ArticleId,
        hops: usize,
        #[source]
        source: SimilarityError,
    },
}

impl WalkError {
    pub fn article(&self) -> &ArticleId {
        match self {
            WalkError::Fetch { article, .. }
            | WalkError::NoViableLink { article, .. }
            | WalkError::Similarity { article, .. } => article,
        }
    }

    pub fn hops(&self) -> usize {
        match self {
            WalkError::Fetch { hops, .. }
            | WalkError::NoViableLink { hops, .. }
            | WalkError::Similarity { hops, .. } => *hops,
        }
    }
}
