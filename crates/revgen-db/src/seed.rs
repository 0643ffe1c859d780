use revgen_core::shops::ShopConfig;
use revgen_core::PriorityWeights;
use sqlx::PgPool;

use crate::DbError;

/// Upsert shops from config into the database.
///
/// Returns the number of shops processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// Optional config fields fall back to the same defaults the schema uses,
/// so re-seeding an edited shops.yaml overwrites prior values predictably.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_shops(pool: &PgPool, shops: &[ShopConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for shop in shops {
        let slug = shop.slug();
        let platform = shop.platform.to_string();
        let language = shop.language.clone().unwrap_or_else(|| "en".to_string());
        let reviews_per_week = shop.reviews_per_week.unwrap_or(5);
        let weights = shop.priorities.unwrap_or_default();

        sqlx::query(
            "INSERT INTO shops \
                 (name, slug, platform, shop_url, language, reviews_per_week, \
                  priority_bestsellers, priority_no_reviews, priority_stale, \
                  auto_approve, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, true) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 platform = EXCLUDED.platform, \
                 shop_url = EXCLUDED.shop_url, \
                 language = EXCLUDED.language, \
                 reviews_per_week = EXCLUDED.reviews_per_week, \
                 priority_bestsellers = EXCLUDED.priority_bestsellers, \
                 priority_no_reviews = EXCLUDED.priority_no_reviews, \
                 priority_stale = EXCLUDED.priority_stale, \
                 auto_approve = EXCLUDED.auto_approve, \
                 updated_at = NOW()",
        )
        .bind(&shop.name)
        .bind(&slug)
        .bind(&platform)
        .bind(&shop.shop_url)
        .bind(&language)
        .bind(reviews_per_week)
        .bind(weight_column(weights.bestsellers))
        .bind(weight_column(weights.no_reviews))
        .bind(weight_column(weights.stale))
        .bind(shop.auto_approve)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

fn weight_column(weight: u8) -> i32 {
    i32::from(weight)
}
