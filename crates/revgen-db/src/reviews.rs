//! Database operations for `reviews`: lifecycle transitions, scheduling
//! writes, and the windowed count queries the engine relies on.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use revgen_core::ReviewStatus;

use crate::DbError;

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub shop_id: i64,
    pub product_id: Option<i64>,
    pub status: String,
    pub reviewer_name: String,
    pub rating: i32,
    pub title: String,
    pub content: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub external_review_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a freshly generated review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub shop_id: i64,
    pub product_id: Option<i64>,
    pub reviewer_name: String,
    pub rating: i32,
    pub title: String,
    pub content: String,
}

/// A posted/imported review used as a few-shot sample for generation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewSampleRow {
    pub rating: i32,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewListFilters<'a> {
    pub status: Option<&'a str>,
    pub limit: Option<i64>,
}

const REVIEW_COLUMNS: &str = "id, shop_id, product_id, status, reviewer_name, rating, title, \
     content, scheduled_at, posted_at, external_review_id, error_message, created_at, updated_at";

/// Insert a generated review in `pending` state; returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including rating range
/// violations surfaced by the table constraint).
pub async fn insert_pending_review(pool: &PgPool, review: &NewReview) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO reviews (shop_id, product_id, status, reviewer_name, rating, title, content) \
         VALUES ($1, $2, 'pending', $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(review.shop_id)
    .bind(review.product_id)
    .bind(&review.reviewer_name)
    .bind(review.rating)
    .bind(&review.title)
    .bind(&review.content)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetch one review by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the review does not exist.
pub async fn get_review(pool: &PgPool, review_id: i64) -> Result<ReviewRow, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
    ))
    .bind(review_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Approve a pending review.
///
/// The transition is guarded in SQL: only `pending` rows flip, so a
/// rejected/posted review cannot be resurrected.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when no pending review matched the id.
pub async fn approve_review(pool: &PgPool, review_id: i64) -> Result<(), DbError> {
    transition_from_pending(pool, review_id, ReviewStatus::Approved).await
}

/// Reject a pending review (terminal; it will never be scheduled).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when no pending review matched the id.
pub async fn reject_review(pool: &PgPool, review_id: i64) -> Result<(), DbError> {
    transition_from_pending(pool, review_id, ReviewStatus::Rejected).await
}

async fn transition_from_pending(
    pool: &PgPool,
    review_id: i64,
    to: ReviewStatus,
) -> Result<(), DbError> {
    let updated = sqlx::query(
        "UPDATE reviews SET status = $2, updated_at = NOW() \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(review_id)
    .bind(to.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Approve every pending review of a shop; returns the approved ids.
/// Used for shops with `auto_approve` enabled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn approve_pending_reviews(pool: &PgPool, shop_id: i64) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "UPDATE reviews SET status = 'approved', updated_at = NOW() \
         WHERE shop_id = $1 AND status = 'pending' \
         RETURNING id",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Persist the slot the scheduler assigned to a review.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the review does not exist.
pub async fn set_review_scheduled_at(
    pool: &PgPool,
    review_id: i64,
    scheduled_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let updated = sqlx::query(
        "UPDATE reviews SET scheduled_at = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(review_id)
    .bind(scheduled_at)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Scheduled timestamps of a shop's pending/approved reviews inside
/// `[from, to)` — the collision set the scheduler must respect.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scheduled_times(
    pool: &PgPool,
    shop_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, DbError> {
    let times = sqlx::query_scalar::<_, DateTime<Utc>>(
        "SELECT scheduled_at FROM reviews \
         WHERE shop_id = $1 \
           AND scheduled_at IS NOT NULL \
           AND scheduled_at >= $2 AND scheduled_at < $3 \
           AND status IN ('pending', 'approved') \
         ORDER BY scheduled_at",
    )
    .bind(shop_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(times)
}

/// Ids of approved reviews that have not been assigned a slot yet,
/// oldest first so earlier approvals schedule first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_approved_unscheduled_ids(
    pool: &PgPool,
    shop_id: i64,
) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM reviews \
         WHERE shop_id = $1 AND status = 'approved' AND scheduled_at IS NULL \
         ORDER BY created_at",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Count reviews created inside `[from, to)`, optionally excluding one
/// status (the weekly generated count excludes `imported`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_reviews_created_in_window(
    pool: &PgPool,
    shop_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    exclude_status: Option<ReviewStatus>,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reviews \
         WHERE shop_id = $1 \
           AND created_at >= $2 AND created_at < $3 \
           AND ($4::text IS NULL OR status <> $4)",
    )
    .bind(shop_id)
    .bind(from)
    .bind(to)
    .bind(exclude_status.map(ReviewStatus::as_str))
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Count reviews whose assigned slot falls inside `[from, to)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_scheduled_in_window(
    pool: &PgPool,
    shop_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reviews \
         WHERE shop_id = $1 \
           AND scheduled_at IS NOT NULL \
           AND scheduled_at >= $2 AND scheduled_at < $3",
    )
    .bind(shop_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// List a shop's reviews, newest first, with optional status filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(
    pool: &PgPool,
    shop_id: i64,
    filters: ReviewListFilters<'_>,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews \
         WHERE shop_id = $1 \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC \
         LIMIT $3"
    ))
    .bind(shop_id)
    .bind(filters.status)
    .bind(filters.limit.unwrap_or(50))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Recent posted/imported reviews of a product, newest first, for use as
/// few-shot samples in the generation prompt. Falls back to shop-wide
/// samples when the product has none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_review_samples(
    pool: &PgPool,
    shop_id: i64,
    product_id: Option<i64>,
    limit: i64,
) -> Result<Vec<ReviewSampleRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewSampleRow>(
        "SELECT rating, title, content FROM reviews \
         WHERE shop_id = $1 \
           AND status IN ('posted', 'imported') \
           AND ($2::bigint IS NULL OR product_id = $2) \
         ORDER BY COALESCE(posted_at, created_at) DESC \
         LIMIT $3",
    )
    .bind(shop_id)
    .bind(product_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() && product_id.is_some() {
        // Product had no history; widen to the whole shop.
        return Box::pin(list_review_samples(pool, shop_id, None, limit)).await;
    }

    Ok(rows)
}
