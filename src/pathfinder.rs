//! Picks the next article to click.
//!
//! Greedy best-first over a graph that is never materialized: only the current
//! article's links are visible. Every unvisited link is scored by how close its
//! title is to the target's title, the scores get a little Gaussian noise
//! proportional to their spread, and the best one wins.

use log2::debug;
use rand::Rng;
use std::collections::{BTreeSet, HashSet};

use crate::article::ArticleId;
use crate::error::SimilarityError;
use crate::similarity::Similarity;

/// Noise is `damping * N(0, σ/2)` where σ is the spread of the scores
pub const DEFAULT_NOISE_DAMPING: f64 = 0.1;

/// Outcome of one selection round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The target is one click away
    TargetFound,
    /// Best unvisited link
    Next(ArticleId),
    /// Every link was already visited and none is the target
    Stuck,
}

/// Controls the random perturbation applied to similarity scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perturbation {
    pub damping: f64,
}

impl Perturbation {
    pub fn new(damping: f64) -> Self {
        Self { damping }
    }

    /// Fully deterministic ranking
    pub fn none() -> Self {
        Self { damping: 0.0 }
    }

    /// Adds `damping * N(0, σ/2)` to every score. With zero spread or zero
    /// damping the scores are left alone and `rng` is not touched.
    pub fn apply<R: Rng + ?Sized>(&self, scores: &mut [f64], rng: &mut R) {
        let sigma = population_std_dev(scores);
        if sigma == 0.0 || self.damping == 0.0 {
            return;
        }
        for score in scores.iter_mut() {
            *score += gaussian(rng, sigma / 2.0) * self.damping;
        }
    }
}

impl Default for Perturbation {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_DAMPING)
    }
}

/// Candidates that are not on the path yet
pub fn filter_unvisited(
    candidates: &BTreeSet<ArticleId>,
    visited: &HashSet<ArticleId>,
) -> BTreeSet<ArticleId> {
    candidates
        .iter()
        .filter(|c| !visited.contains(*c))
        .cloned()
        .collect()
}

/// Population standard deviation, 0 for an empty slice
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Zero-mean normal sample via the Box-Muller transform
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    // gen() is in [0, 1), flip it so ln never sees 0
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z * std_dev
}

/// Index of the highest score. Ties keep the earliest entry.
fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, score) in scores.iter().enumerate() {
        match best {
            Some(b) if scores[b] >= *score => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Chooses where to go from `current`.
///
/// `candidates` iterate in identifier order, which makes that order the
/// tie-break between equal scores. The similarity model is called once per
/// unvisited candidate, and not at all when the target is among them. Model
/// failures are returned as-is.
pub async fn select_next<S, R>(
    current: &ArticleId,
    candidates: &BTreeSet<ArticleId>,
    visited: &HashSet<ArticleId>,
    target: &ArticleId,
    similarity: &S,
    perturbation: &Perturbation,
    rng: &mut R,
) -> Result<Selection, SimilarityError>
where
    S: Similarity + ?Sized,
    R: Rng + ?Sized,
{
    let unvisited = filter_unvisited(candidates, visited);
    debug!(
        "{}: {} links, {} unvisited",
        current,
        candidates.len(),
        unvisited.len()
    );

    if unvisited.contains(target) {
        return Ok(Selection::TargetFound);
    }

    let target_title = target.title();
    let mut ranking: Vec<ArticleId> = Vec::with_capacity(unvisited.len());
    let mut scores: Vec<f64> = Vec::with_capacity(unvisited.len());
    for candidate in unvisited {
        let score = similarity.similarity(&candidate.title(), &target_title).await?;
        if !score.is_finite() {
            return Err(SimilarityError::NonFinite {
                candidate: candidate.to_string(),
                score,
            });
        }
        ranking.push(candidate);
        scores.push(score);
    }

    perturbation.apply(&mut scores, rng);

    let Some(best) = argmax(&scores) else {
        return Ok(Selection::Stuck);
    };
    debug!(
        "{}: picked {} with score {:.4}",
        current, ranking[best], scores[best]
    );
    Ok(Selection::Next(ranking.swap_remove(best)))
}
