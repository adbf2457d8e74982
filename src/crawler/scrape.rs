use async_trait::async_trait;
use log2::{debug, info, warn};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tokio::time::{sleep, Duration};

use super::config::CrawlerConfigRef;
use crate::article::ArticleId;
use crate::error::{backoff_delay, FetchError};
use crate::USER_AGENT;

/// Links inside the article's own paragraphs. Navigation boxes, infoboxes
/// and reference lists live outside `p` elements and are skipped.
pub const BODY_LINK_SELECTOR: &str = "#mw-content-text > div > p > a";

/// Anything that can list the outgoing article links of an article
#[async_trait]
pub trait LinkSource: Send + Sync {
    async fn links(&self, article: &ArticleId) -> Result<BTreeSet<ArticleId>, FetchError>;
}

/// Distinct article identifiers linked from the body paragraphs of `html`.
/// Namespace-prefixed targets (`Category:..`, `File:..`) are dropped only
/// when `exclude_namespaces` is set.
pub fn extract_links(html: &str, exclude_namespaces: bool) -> Result<BTreeSet<ArticleId>, FetchError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(BODY_LINK_SELECTOR)
        .map_err(|e| FetchError::Selector(e.to_string()))?;

    let mut found = BTreeSet::new();
    for element in document.select(&selector) {
        let Some(article) = element.value().attr("href").and_then(ArticleId::from_href) else {
            continue;
        };
        if exclude_namespaces && article.namespace().is_some() {
            debug!("Skipped namespaced link: {}", article);
            continue;
        }
        found.insert(article);
    }
    Ok(found)
}

/// Fetches rendered article pages over HTTP
pub struct WikiClient {
    client: Client,
    config: CrawlerConfigRef,
}

impl WikiClient {
    pub fn new(config: CrawlerConfigRef) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, config })
    }

    /// Raw markup of `article`, retrying transient failures with exponential backoff.
    pub async fn fetch_page(&self, article: &ArticleId) -> Result<String, FetchError> {
        let url = article.url(&self.config.base_url)?;
        let mut attempt = 0;
        loop {
            match self.fetch_once(&url).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt < self.config.max_retries && e.is_retryable() => {
                    attempt += 1;
                    warn!(
                        "Fetching {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.config.max_retries + 1,
                        e
                    );
                    sleep(backoff_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &url::Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl LinkSource for WikiClient {
    async fn links(&self, article: &ArticleId) -> Result<BTreeSet<ArticleId>, FetchError> {
        let html = self.fetch_page(article).await?;
        let found = extract_links(&html, self.config.exclude_namespaces)?;
        info!("Found {} links on page {}", found.len(), article);

        if self.config.request_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }
        Ok(found)
    }
}
