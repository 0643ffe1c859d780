//! Product selection against the live database.
//!
//! Loads every active product with its review stats, scores the pool with
//! the shop's priority weights, and draws a weighted random sample. Products
//! reviewed in the recency window are excluded after sampling: the draw
//! over-fetches by the size of the exclusion set, so a crowded week thins
//! the result rather than erroring.

use rand::Rng;
use sqlx::PgPool;

use revgen_core::{sample_weighted, score_products, ProductSelection};

use crate::error::EngineError;

/// Pick up to `count` products for a shop.
///
/// May return fewer than `count` selections: when the scored pool is small,
/// or when recent reviews crowd out most of the over-fetched sample.
///
/// # Errors
///
/// Returns [`EngineError::Db`] when the shop is unknown or a query fails.
pub async fn select_products<R: Rng>(
    pool: &PgPool,
    shop_id: i64,
    count: usize,
    recency_days_back: i64,
    rng: &mut R,
) -> Result<Vec<ProductSelection>, EngineError> {
    let settings = revgen_db::get_shop_settings(pool, shop_id).await?;
    let rows = revgen_db::list_products_with_stats(pool, shop_id).await?;
    let recent = revgen_db::recently_reviewed_product_ids(pool, shop_id, recency_days_back).await?;

    let stats: Vec<_> = rows
        .into_iter()
        .map(revgen_db::ProductStatsRow::into_stats)
        .collect();

    let pool_scored = score_products(
        &stats,
        &settings.weights,
        settings.stale_days_threshold,
        chrono::Utc::now(),
    );

    let sampled = sample_weighted(pool_scored, count + recent.len(), rng);

    let mut picked: Vec<ProductSelection> = sampled
        .into_iter()
        .filter(|s| !recent.contains(&s.product_id))
        .collect();
    picked.truncate(count);

    tracing::debug!(
        shop_id,
        requested = count,
        excluded_recent = recent.len(),
        picked = picked.len(),
        "product selection complete"
    );

    Ok(picked)
}
