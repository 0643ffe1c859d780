//! Slot assignment for approved reviews.
//!
//! Builds the collision set from every pending/approved slot in the current
//! Monday-start week plus seven weeks ahead, then walks the caller's
//! eligible reviews oldest first. Each placement joins the in-memory collision set
//! before the next search, so one batch can never stack two reviews inside
//! the spacing floor.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;

use revgen_core::{collision_window_end, find_slot, week_start};

use crate::error::EngineError;

/// Result of one scheduling pass over a shop.
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    /// Review ids with their newly assigned slots.
    pub scheduled: Vec<(i64, DateTime<Utc>)>,
    /// Review ids the slot search could not place within its horizon.
    pub unplaced: Vec<i64>,
}

/// Assign posting slots to the given reviews of a shop.
///
/// Only ids that are currently approved and unscheduled for this shop are
/// eligible; anything else in `review_ids` (rejected, already scheduled,
/// another shop's review) is dropped before the slot search. Placement is
/// best-effort per review: an exhausted search horizon leaves that review
/// unscheduled and moves on, so later reviews still get a chance (their
/// jittered candidates differ).
///
/// # Errors
///
/// Returns [`EngineError::Db`] when the shop is unknown or a query fails.
pub async fn schedule_reviews_for_shop<R: Rng>(
    pool: &PgPool,
    shop_id: i64,
    review_ids: &[i64],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ScheduleOutcome, EngineError> {
    let settings = revgen_db::get_shop_settings(pool, shop_id).await?;

    let mut taken = revgen_db::list_scheduled_times(
        pool,
        shop_id,
        week_start(now),
        collision_window_end(now),
    )
    .await?;

    // Oldest first, regardless of the order the caller passed.
    let pending: Vec<i64> = revgen_db::list_approved_unscheduled_ids(pool, shop_id)
        .await?
        .into_iter()
        .filter(|id| review_ids.contains(id))
        .collect();

    let mut outcome = ScheduleOutcome::default();
    // Every search starts half an hour out, never from the previous slot.
    let search_start = now + Duration::minutes(30);

    for review_id in pending {
        match find_slot(&settings.cadence, search_start, &taken, rng) {
            Some(slot) => {
                if let Err(e) = revgen_db::set_review_scheduled_at(pool, review_id, slot).await {
                    tracing::warn!(shop_id, review_id, error = %e, "failed to persist slot");
                    outcome.unplaced.push(review_id);
                    continue;
                }
                taken.push(slot);
                outcome.scheduled.push((review_id, slot));
            }
            None => {
                tracing::warn!(shop_id, review_id, "no free slot within search horizon");
                outcome.unplaced.push(review_id);
            }
        }
    }

    tracing::info!(
        shop_id,
        scheduled = outcome.scheduled.len(),
        unplaced = outcome.unplaced.len(),
        "scheduling pass complete"
    );

    Ok(outcome)
}

/// Reviews generated for this shop in the current Monday-start week.
/// Imported reviews never count toward the cadence.
///
/// # Errors
///
/// Returns [`EngineError::Db`] if the query fails.
pub async fn generated_count_this_week(
    pool: &PgPool,
    shop_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, EngineError> {
    let from = week_start(now);
    let count = revgen_db::count_reviews_created_in_window(
        pool,
        shop_id,
        from,
        from + Duration::days(7),
        Some(revgen_core::ReviewStatus::Imported),
    )
    .await?;
    Ok(count)
}

/// Reviews whose assigned slot falls in the current Monday-start week.
///
/// # Errors
///
/// Returns [`EngineError::Db`] if the query fails.
pub async fn scheduled_count_this_week(
    pool: &PgPool,
    shop_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, EngineError> {
    let from = week_start(now);
    let count =
        revgen_db::count_scheduled_in_window(pool, shop_id, from, from + Duration::days(7)).await?;
    Ok(count)
}
