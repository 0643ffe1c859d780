//! Database operations for `products`, including the derived review stats
//! the Selector consumes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use revgen_core::ProductStats;

use crate::DbError;

/// A product joined with its derived review statistics.
///
/// `review_count` is the denormalized column maintained by the storefront
/// sync. `last_review_at` is computed per query as the max of
/// `COALESCE(posted_at, created_at)` over posted/imported reviews; it is
/// never stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductStatsRow {
    pub id: i64,
    pub name: String,
    pub review_count: i32,
    pub last_review_at: Option<DateTime<Utc>>,
}

impl ProductStatsRow {
    #[must_use]
    pub fn into_stats(self) -> ProductStats {
        ProductStats {
            id: self.id,
            name: self.name,
            review_count: i64::from(self.review_count),
            last_review_at: self.last_review_at,
        }
    }
}

/// Load every active product of a shop with its review stats.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_with_stats(
    pool: &PgPool,
    shop_id: i64,
) -> Result<Vec<ProductStatsRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductStatsRow>(
        "SELECT p.id, p.name, p.review_count, \
                MAX(COALESCE(r.posted_at, r.created_at)) \
                    FILTER (WHERE r.status IN ('posted', 'imported')) AS last_review_at \
         FROM products p \
         LEFT JOIN reviews r ON r.product_id = p.id \
         WHERE p.shop_id = $1 AND p.is_active \
         GROUP BY p.id, p.name, p.review_count \
         ORDER BY p.id",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// IDs of products that received any review (regardless of status) within
/// the last `days_back` days. Used by the Selector's recency exclusion.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recently_reviewed_product_ids(
    pool: &PgPool,
    shop_id: i64,
    days_back: i64,
) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT DISTINCT r.product_id \
         FROM reviews r \
         WHERE r.shop_id = $1 \
           AND r.product_id IS NOT NULL \
           AND r.created_at >= NOW() - make_interval(days => $2::int)",
    )
    .bind(shop_id)
    .bind(days_back)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
