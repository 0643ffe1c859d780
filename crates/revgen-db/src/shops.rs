//! Database operations for the `shops` table and per-shop settings.

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgPool;

use revgen_core::{parse_weekday, weekday_code, Cadence, PriorityWeights, ShopSettings};

use crate::DbError;

/// A row from the `shops` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub platform: String,
    pub shop_url: Option<String>,
    pub language: String,
    pub reviews_per_week: i32,
    /// Weekday codes (`mon`..`sun`); parsed into `chrono::Weekday` on read.
    pub active_days: Vec<String>,
    pub time_slot_start: NaiveTime,
    pub time_slot_end: NaiveTime,
    pub min_hours_between: i32,
    pub priority_bestsellers: i32,
    pub priority_no_reviews: i32,
    pub priority_stale: i32,
    pub stale_days_threshold: i32,
    pub auto_approve: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShopRow {
    /// Convert the persisted row into typed [`ShopSettings`].
    ///
    /// Deliberately performs no weight-sum validation: rows persisted in a
    /// violating state are used as-is by the read paths. Out-of-range weight
    /// columns are clamped into 0..=100 instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidSettings`] only when a weekday code cannot
    /// be parsed — that indicates a corrupted row, not a skewed one.
    pub fn settings(&self) -> Result<ShopSettings, DbError> {
        let active_days = self
            .active_days
            .iter()
            .map(|code| parse_weekday(code))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ShopSettings {
            weights: PriorityWeights {
                bestsellers: clamp_weight(self.priority_bestsellers),
                no_reviews: clamp_weight(self.priority_no_reviews),
                stale: clamp_weight(self.priority_stale),
            },
            stale_days_threshold: i64::from(self.stale_days_threshold),
            cadence: Cadence {
                reviews_per_week: self.reviews_per_week,
                active_days,
                slot_start: self.time_slot_start,
                slot_end: self.time_slot_end,
                min_hours_between: i64::from(self.min_hours_between),
            },
        })
    }
}

fn clamp_weight(value: i32) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(100)
}

const SHOP_COLUMNS: &str = "id, name, slug, platform, shop_url, language, reviews_per_week, \
     active_days, time_slot_start, time_slot_end, min_hours_between, \
     priority_bestsellers, priority_no_reviews, priority_stale, stale_days_threshold, \
     auto_approve, is_active, created_at, updated_at";

/// Fetch a shop by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the shop does not exist.
pub async fn get_shop(pool: &PgPool, shop_id: i64) -> Result<ShopRow, DbError> {
    let row = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1"
    ))
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Fetch a shop by slug.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the shop does not exist.
pub async fn get_shop_by_slug(pool: &PgPool, slug: &str) -> Result<ShopRow, DbError> {
    let row = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Load a shop's selection/scheduling settings.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown shop.
pub async fn get_shop_settings(pool: &PgPool, shop_id: i64) -> Result<ShopSettings, DbError> {
    get_shop(pool, shop_id).await?.settings()
}

/// List all active shops, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_shops(pool: &PgPool) -> Result<Vec<ShopRow>, DbError> {
    let rows = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE is_active ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Persist new settings for a shop.
///
/// This is the settings-write boundary: the weight-sum invariant and the
/// cadence sanity rules are enforced here, before anything touches the row.
///
/// # Errors
///
/// Returns [`DbError::InvalidSettings`] when validation fails and
/// [`DbError::NotFound`] when the shop does not exist.
pub async fn update_shop_settings(
    pool: &PgPool,
    shop_id: i64,
    settings: &ShopSettings,
) -> Result<(), DbError> {
    settings.validate()?;

    let active_days: Vec<String> = settings
        .cadence
        .active_days
        .iter()
        .map(|d| weekday_code(*d).to_string())
        .collect();

    let updated = sqlx::query(
        "UPDATE shops SET \
             reviews_per_week     = $2, \
             active_days          = $3, \
             time_slot_start      = $4, \
             time_slot_end        = $5, \
             min_hours_between    = $6, \
             priority_bestsellers = $7, \
             priority_no_reviews  = $8, \
             priority_stale       = $9, \
             stale_days_threshold = $10, \
             updated_at           = NOW() \
         WHERE id = $1",
    )
    .bind(shop_id)
    .bind(settings.cadence.reviews_per_week)
    .bind(&active_days)
    .bind(settings.cadence.slot_start)
    .bind(settings.cadence.slot_end)
    .bind(i32::try_from(settings.cadence.min_hours_between).unwrap_or(i32::MAX))
    .bind(i32::from(settings.weights.bestsellers))
    .bind(i32::from(settings.weights.no_reviews))
    .bind(i32::from(settings.weights.stale))
    .bind(i32::try_from(settings.stale_days_threshold).unwrap_or(i32::MAX))
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
