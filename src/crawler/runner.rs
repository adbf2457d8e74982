use log2::*;
use rand::Rng;

use super::config::{CrawlerConfig, StuckPolicy};
use super::scrape::LinkSource;
use super::state::{TraversalState, WalkOutcome};
use crate::article::ArticleId;
use crate::error::WalkError;
use crate::pathfinder::{select_next, Selection};
use crate::similarity::Similarity;

/// Progress line printed before every click and once more on arrival
fn report_hop(hops: usize, article: &ArticleId) {
    println!("{} clicks: {}", hops, article);
}

/// Clicks from `config.start` towards `config.target` one link at a time
/// until the target is reached or the walk fails.
pub async fn walk<L, S, R>(
    links: &L,
    similarity: &S,
    config: &CrawlerConfig,
    rng: &mut R,
) -> Result<WalkOutcome, WalkError>
where
    L: LinkSource + ?Sized,
    S: Similarity + ?Sized,
    R: Rng + ?Sized,
{
    let target = &config.target;
    let mut state = TraversalState::new(config.start.clone());
    info!("Walking from {} to {}", state.current, target);

    while state.current != *target {
        report_hop(state.hops, &state.current);

        let candidates = links
            .links(&state.current)
            .await
            .map_err(|source| WalkError::Fetch {
                article: state.current.clone(),
                hops: state.hops,
                source,
            })?;

        let selection = select_next(
            &state.current,
            &candidates,
            &state.visited,
            target,
            similarity,
            &config.perturbation,
            rng,
        )
        .await
        .map_err(|source| WalkError::Similarity {
            article: state.current.clone(),
            hops: state.hops,
            source,
        })?;

        match selection {
            Selection::TargetFound => {
                debug!("{} links directly to the target", state.current);
                state.advance(target.clone());
            }
            Selection::Next(next) => state.advance(next),
            Selection::Stuck => {
                let dead_end = state.current.clone();
                let stuck = WalkError::NoViableLink {
                    article: dead_end.clone(),
                    hops: state.hops,
                };
                if config.on_stuck == StuckPolicy::Abort {
                    return Err(stuck);
                }
                match state.backtrack() {
                    Some(previous) => warn!("Dead end at {}, backtracking to {}", dead_end, previous),
                    None => return Err(stuck),
                }
            }
        }
    }

    report_hop(state.hops, &state.current);
    info!(
        "Reached {} in {} clicks ({} backtracks, {} articles visited)",
        state.current,
        state.hops,
        state.backtracks,
        state.visited.len()
    );
    Ok(state.into_outcome())
}
