use anyhow::Result;
use log2::*;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use wiki_hopper::{config, crawler, similarity};

/// Indicates start time of a project, lazily initialized
pub static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

#[tokio::main]
async fn main() -> Result<()> {
    let _ = *START_TIME;
    let cfg = config::Config::new();
    cfg.validate()?;
    let _log2 = stdout()
        .module(true) // include module name
        .module_with_line(true) // include line number from module
        .module_filter(|module| module.starts_with("wiki_hopper")) // include only modules having this pattern
        .compress(false)
        .level(cfg.log_level.to_string())
        .start();

    let crawler_config = Arc::new(cfg.crawler_config()?);
    // loaded once and shared for the whole walk
    let model = similarity::load(&cfg.similarity_backend()?)?;
    let client = crawler::WikiClient::new(Arc::clone(&crawler_config))?;

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match crawler::walk(&client, model.as_ref(), &crawler_config, &mut rng).await {
        Ok(outcome) => {
            info!(
                "Number of clicks: {} ({:.1?} elapsed)",
                outcome.hops,
                START_TIME.elapsed()
            );
            if let Some(path) = cfg.output_file {
                std::fs::write(&path, serde_json::to_string_pretty(&outcome)?)?;
                info!("Path written to {:?}", path);
            }
            Ok(())
        }
        Err(e) => {
            error!("Walk failed: {}", e);
            eprintln!("Gave up after {} clicks at {}", e.hops(), e.article());
            Err(e.into())
        }
    }
}
