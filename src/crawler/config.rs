use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::article::ArticleId;
use crate::pathfinder::Perturbation;

/// Default timeout for link requests in seconds
pub const LINK_REQUEST_TIMEOUT_SEC: u64 = 10;

/// Encyclopedia the walk happens in unless told otherwise
pub const DEFAULT_WIKI_URL: &str = "https://en.wikipedia.org";

/// What to do when every link on the current page was already visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum StuckPolicy {
    /// Stop and report the dead end
    #[default]
    Abort,
    /// Step back to the previous article and pick another link there
    Backtrack,
}

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub base_url: Url,
    pub start: ArticleId,
    pub target: ArticleId,
    pub exclude_namespaces: bool,
    pub request_delay_ms: u64,
    pub max_retries: usize,
    pub request_timeout: Duration,
    pub perturbation: Perturbation,
    pub on_stuck: StuckPolicy,
}

impl CrawlerConfig {
    pub fn new(base_url: Url, start: ArticleId, target: ArticleId) -> Self {
        Self {
            base_url,
            start,
            target,
            exclude_namespaces: false,
            request_delay_ms: 0,
            max_retries: 3,
            request_timeout: Duration::from_secs(LINK_REQUEST_TIMEOUT_SEC),
            perturbation: Perturbation::default(),
            on_stuck: StuckPolicy::Abort,
        }
    }

    pub fn with_exclude_namespaces(mut self, exclude: bool) -> Self {
        self.exclude_namespaces = exclude;
        self
    }

    pub fn with_request_delay(mut self, delay_ms: u64) -> Self {
        self.request_delay_ms = delay_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_perturbation(mut self, perturbation: Perturbation) -> Self {
        self.perturbation = perturbation;
        self
    }

    pub fn with_stuck_policy(mut self, policy: StuckPolicy) -> Self {
        self.on_stuck = policy;
        self
    }
}

pub type CrawlerConfigRef = Arc<CrawlerConfig>;
