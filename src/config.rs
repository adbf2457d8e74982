use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::article::ArticleId;
use crate::crawler::{CrawlerConfig, StuckPolicy, DEFAULT_WIKI_URL, LINK_REQUEST_TIMEOUT_SEC};
use crate::pathfinder::{Perturbation, DEFAULT_NOISE_DAMPING};
use crate::similarity::SimilarityBackend;

/// Log levels as defined in log2 crate
#[derive(Debug, Serialize, Deserialize, Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// This struct is supposed to receive all program arguments while CrawlerConfig
/// describes only the walk itself
#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(author, version, about = "Plays the wiki game by following the most promising link", long_about = None)]
pub struct Config {
    /// Starting article (slug, title or URL)
    #[arg(short, long)]
    pub start: String,
    /// Target article (slug, title or URL)
    #[arg(short, long)]
    pub target: String,
    /// Root URL of the encyclopedia
    #[arg(long, default_value = DEFAULT_WIKI_URL)]
    pub base_url: String,
    /// Word vectors file (word2vec/GloVe text format)
    #[arg(long, conflicts_with = "embedding_url")]
    pub vectors: Option<PathBuf>,
    /// OpenAI-compatible embedding service, e.g. https://api.openai.com/v1
    #[arg(long)]
    pub embedding_url: Option<String>,
    /// Model name sent to the embedding service
    #[arg(long, default_value = "text-embedding-3-small")]
    pub embedding_model: String,
    /// Bearer token for the embedding service
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub embedding_api_key: Option<String>,
    /// Seed for the score noise; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
    /// Scale of the Gaussian noise added to scores, 0 disables it
    #[arg(long, default_value_t = DEFAULT_NOISE_DAMPING)]
    pub noise_damping: f64,
    /// Timeout for every HTTP request in seconds
    #[arg(long, default_value_t = LINK_REQUEST_TIMEOUT_SEC)]
    pub request_timeout: u64,
    /// Retries for failed page fetches
    #[arg(long, default_value = "3")]
    pub max_retries: usize,
    /// Delay between requests in milliseconds
    #[arg(short, long, default_value = "0")]
    pub request_delay: u64,
    /// Ignore links into namespaces such as Category: or Help:
    #[arg(long)]
    pub exclude_namespaces: bool,
    /// What to do when every link on a page was already visited
    #[arg(long, default_value = "abort", value_enum)]
    pub on_stuck: StuckPolicy,
    /// Write the walked path as JSON to this file
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", value_enum)]
    pub log_level: LogLevel,
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.vectors.is_none() && self.embedding_url.is_none() {
            anyhow::bail!("a similarity model is required: pass --vectors or --embedding-url");
        }
        if !self.noise_damping.is_finite() || self.noise_damping < 0.0 {
            anyhow::bail!("noise_damping must be a non-negative number");
        }
        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }
        ArticleId::parse(&self.start)?;
        ArticleId::parse(&self.target)?;
        Url::parse(&self.base_url)?;
        if let Some(url) = &self.embedding_url {
            Url::parse(url)?;
        }
        Ok(())
    }

    pub fn crawler_config(&self) -> anyhow::Result<CrawlerConfig> {
        let config = CrawlerConfig::new(
            Url::parse(&self.base_url)?,
            ArticleId::parse(&self.start)?,
            ArticleId::parse(&self.target)?,
        )
        .with_exclude_namespaces(self.exclude_namespaces)
        .with_request_delay(self.request_delay)
        .with_max_retries(self.max_retries)
        .with_request_timeout(Duration::from_secs(self.request_timeout))
        .with_perturbation(Perturbation::new(self.noise_damping))
        .with_stuck_policy(self.on_stuck);
        Ok(config)
    }

    pub fn similarity_backend(&self) -> anyhow::Result<SimilarityBackend> {
        if let Some(path) = &self.vectors {
            return Ok(SimilarityBackend::WordVectors { path: path.clone() });
        }
        match &self.embedding_url {
            Some(url) => Ok(SimilarityBackend::Embedding {
                base_url: Url::parse(url)?,
                model: self.embedding_model.clone(),
                api_key: self.embedding_api_key.clone(),
                request_timeout: Duration::from_secs(self.request_timeout),
                max_retries: self.max_retries,
            }),
            None => anyhow::bail!("no similarity model configured"),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{}", s)
    }
}
