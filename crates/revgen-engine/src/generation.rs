//! The generation pipeline: weekly deficit, product selection, LLM calls,
//! pending-review inserts.
//!
//! One run per shop:
//! 1. Compute the weekly deficit (cadence minus already-generated count).
//! 2. Cap at `max_per_run` so a fresh week fills gradually, not in one burst.
//! 3. Select products, skipping anything reviewed in the recency window.
//! 4. Per product: fetch few-shot samples, call the LLM, insert as `pending`.
//!
//! A rate-limited LLM aborts the rest of the run for this shop; any other
//! per-product failure is logged and skipped so one bad product cannot
//! starve the batch.

use chrono::Utc;
use sqlx::PgPool;

use rand::Rng;
use revgen_ai::{AiError, GeneratorClient, ReviewRequest, ReviewSample};
use revgen_db::{NewReview, ShopRow};

use crate::error::EngineError;
use crate::scheduling::generated_count_this_week;
use crate::selection::select_products;

/// Tunables for one generation run, taken from the app config.
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    /// Hard cap on reviews generated per shop per run.
    pub max_per_run: usize,
    /// How many few-shot sample reviews to include in the prompt.
    pub sample_reviews: usize,
    /// Products reviewed within this many days are skipped.
    pub recency_days_back: i64,
}

/// Result of one generation run over a shop.
#[derive(Debug, Default)]
pub struct GenerationOutcome {
    /// Ids of the pending reviews inserted this run.
    pub inserted: Vec<i64>,
    /// Weekly deficit observed at the start of the run.
    pub deficit: i64,
    /// True when a 429 cut the run short.
    pub rate_limited: bool,
}

/// Generate pending reviews for one shop, up to its weekly cadence.
///
/// # Errors
///
/// Returns [`EngineError::Db`] on query failures. LLM failures never bubble
/// out of a run: a 429 ends it early (flagged on the outcome), anything
/// else skips the product.
pub async fn generate_reviews_for_shop<R: Rng>(
    pool: &PgPool,
    client: &GeneratorClient,
    shop: &ShopRow,
    settings: GenerationSettings,
    rng: &mut R,
) -> Result<GenerationOutcome, EngineError> {
    let now = Utc::now();
    let generated = generated_count_this_week(pool, shop.id, now).await?;
    let deficit = i64::from(shop.reviews_per_week) - generated;

    let mut outcome = GenerationOutcome {
        deficit,
        ..GenerationOutcome::default()
    };

    if deficit <= 0 {
        tracing::debug!(shop_id = shop.id, generated, "weekly cadence already met");
        return Ok(outcome);
    }

    let to_generate = usize::try_from(deficit)
        .unwrap_or(settings.max_per_run)
        .min(settings.max_per_run);

    let selections = select_products(
        pool,
        shop.id,
        to_generate,
        settings.recency_days_back,
        rng,
    )
    .await?;

    for selection in &selections {
        let sample_rows = revgen_db::list_review_samples(
            pool,
            shop.id,
            Some(selection.product_id),
            i64::try_from(settings.sample_reviews).unwrap_or(3),
        )
        .await?;
        let samples: Vec<ReviewSample> = sample_rows
            .into_iter()
            .map(|row| ReviewSample {
                rating: row.rating,
                title: row.title,
                content: row.content,
            })
            .collect();

        let request = ReviewRequest {
            shop_name: &shop.name,
            product_name: &selection.product_name,
            language: &shop.language,
            samples: &samples,
        };

        match client.generate_review(&request).await {
            Ok(review) => {
                let id = revgen_db::insert_pending_review(
                    pool,
                    &NewReview {
                        shop_id: shop.id,
                        product_id: Some(selection.product_id),
                        reviewer_name: review.reviewer_name,
                        rating: review.rating,
                        title: review.title,
                        content: review.content,
                    },
                )
                .await?;
                outcome.inserted.push(id);
            }
            Err(AiError::RateLimited) => {
                tracing::warn!(shop_id = shop.id, "rate limited; ending generation run");
                outcome.rate_limited = true;
                break;
            }
            Err(e) => {
                tracing::warn!(
                    shop_id = shop.id,
                    product_id = selection.product_id,
                    error = %e,
                    "generation failed for product, skipping"
                );
            }
        }
    }

    tracing::info!(
        shop_id = shop.id,
        deficit,
        inserted = outcome.inserted.len(),
        rate_limited = outcome.rate_limited,
        "generation run complete"
    );

    Ok(outcome)
}
