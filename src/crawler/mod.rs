pub mod state;
pub mod config;
pub mod scrape;
pub mod runner;

#[cfg(test)]
mod tests;

pub use state::{TraversalState, WalkOutcome};
pub use config::{CrawlerConfig, CrawlerConfigRef, StuckPolicy, DEFAULT_WIKI_URL, LINK_REQUEST_TIMEOUT_SEC};
pub use scrape::{extract_links, LinkSource, WikiClient, BODY_LINK_SELECTOR};
pub use runner::walk;
