//! Product scoring and weighted sampling for review generation runs.
//!
//! Scoring branches are mutually exclusive and evaluated in a fixed order:
//! zero-review products first, then bestsellers, then stale products, then
//! the low-review fallback bucket. Sampling is weighted-random without
//! replacement over an injected RNG so tests can seed it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::settings::PriorityWeights;

/// Days substituted for "never reviewed" when the stale branch needs a
/// finite score. The over-threshold comparison itself treats a missing
/// `last_review_at` as infinitely old.
const NEVER_REVIEWED_STALE_DAYS: f64 = 365.0;

/// Per-product input to the scorer: the denormalized review count plus the
/// derived timestamp of the latest posted/imported review.
#[derive(Debug, Clone)]
pub struct ProductStats {
    pub id: i64,
    pub name: String,
    pub review_count: i64,
    pub last_review_at: Option<DateTime<Utc>>,
}

/// Why a product was put into the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    Bestseller,
    NoReviews,
    Stale,
}

impl std::fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionReason::Bestseller => write!(f, "bestseller"),
            SelectionReason::NoReviews => write!(f, "no_reviews"),
            SelectionReason::Stale => write!(f, "stale"),
        }
    }
}

/// A scored candidate; exists only within one selection call.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSelection {
    pub product_id: i64,
    pub product_name: String,
    pub reason: SelectionReason,
    pub score: f64,
}

/// Score every product and drop zero scores from the pool.
///
/// Scores are deterministic for identical inputs; only sampling draws on
/// randomness. No weight-sum validation happens here — skewed persisted
/// weights are used as-is.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_products(
    products: &[ProductStats],
    weights: &PriorityWeights,
    stale_days_threshold: i64,
    now: DateTime<Utc>,
) -> Vec<ProductSelection> {
    let weight = |w: u8| f64::from(w) / 100.0;

    products
        .iter()
        .filter_map(|product| {
            let (reason, score) = if product.review_count == 0 {
                (SelectionReason::NoReviews, 10.0 * weight(weights.no_reviews))
            } else if product.review_count > 5 {
                (
                    SelectionReason::Bestseller,
                    product.review_count as f64 * weight(weights.bestsellers),
                )
            } else {
                let days_since = product
                    .last_review_at
                    .map(|last| (now - last).num_days());
                let is_stale = days_since.is_none_or(|days| days > stale_days_threshold);
                if is_stale {
                    let days = days_since.map_or(NEVER_REVIEWED_STALE_DAYS, |d| d as f64);
                    (SelectionReason::Stale, days * weight(weights.stale))
                } else {
                    let base = (5 - product.review_count).max(1) as f64;
                    (SelectionReason::NoReviews, base * weight(weights.no_reviews))
                }
            };

            (score > 0.0).then(|| ProductSelection {
                product_id: product.id,
                product_name: product.name.clone(),
                reason,
                score,
            })
        })
        .collect()
}

/// Weighted random sampling without replacement.
///
/// Draws until `count` picks are made or the pool runs dry; a pool whose
/// remaining total weight is zero ends selection early rather than erroring.
pub fn sample_weighted<R: Rng>(
    mut pool: Vec<ProductSelection>,
    count: usize,
    rng: &mut R,
) -> Vec<ProductSelection> {
    let mut picked = Vec::with_capacity(count.min(pool.len()));

    while picked.len() < count && !pool.is_empty() {
        let total: f64 = pool.iter().map(|p| p.score).sum();
        if total <= 0.0 {
            break;
        }

        let mut roll = rng.random_range(0.0..total);
        let mut chosen = pool.len() - 1;
        for (idx, candidate) in pool.iter().enumerate() {
            if roll < candidate.score {
                chosen = idx;
                break;
            }
            roll -= candidate.score;
        }

        picked.push(pool.swap_remove(chosen));
    }

    picked
}
