//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the two
//! recurring jobs: daily review generation and hourly slot assignment.

use std::sync::Arc;

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use revgen_ai::GeneratorClient;
use revgen_engine::GenerationSettings;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<revgen_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_generation_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    register_scheduling_job(&scheduler, pool).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily generation job.
///
/// Runs every day at 06:00 UTC (`0 0 6 * * *`). For each active shop it
/// computes the weekly deficit and generates pending reviews up to the
/// per-run cap, so a fresh week fills over several mornings instead of in
/// one burst.
async fn register_generation_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<revgen_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 6 * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily generation run");
            run_generation_job(&pool, &config).await;
            tracing::info!("scheduler: daily generation run complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the hourly scheduling job.
///
/// Runs at minute 15 of every hour (`0 15 * * * *`). Auto-approves pending
/// reviews for shops with `auto_approve` set, then assigns posting slots to
/// every approved, unscheduled review.
async fn register_scheduling_job(
    scheduler: &JobScheduler,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 15 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            tracing::info!("scheduler: starting hourly scheduling run");
            run_scheduling_job(&pool).await;
            tracing::info!("scheduler: hourly scheduling run complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Drive one generation pass over all active shops.
async fn run_generation_job(pool: &PgPool, config: &revgen_core::AppConfig) {
    let Some(api_key) = config.openai_api_key.as_deref() else {
        tracing::info!("scheduler: no generation API key configured; skipping run");
        return;
    };

    let client = match GeneratorClient::with_base_url(
        api_key,
        &config.openai_model,
        config.generation_timeout_secs,
        &config.openai_base_url,
    ) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to build generation client");
            return;
        }
    };

    let shops = match revgen_db::list_active_shops(pool).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load active shops");
            return;
        }
    };

    let settings = GenerationSettings {
        max_per_run: config.generation_max_per_run,
        sample_reviews: config.generation_sample_reviews,
        recency_days_back: config.selection_days_back,
    };

    for shop in &shops {
        let mut rng = StdRng::from_os_rng();
        match revgen_engine::generate_reviews_for_shop(pool, &client, shop, settings, &mut rng)
            .await
        {
            Ok(outcome) => {
                tracing::info!(
                    shop = %shop.slug,
                    inserted = outcome.inserted.len(),
                    deficit = outcome.deficit,
                    rate_limited = outcome.rate_limited,
                    "scheduler: generation run for shop complete"
                );
                if outcome.rate_limited {
                    // The provider throttled us; remaining shops would hit
                    // the same limit this run.
                    tracing::warn!("scheduler: rate limited; deferring remaining shops");
                    break;
                }
            }
            Err(e) => {
                tracing::error!(shop = %shop.slug, error = %e, "scheduler: generation run failed");
            }
        }
    }
}

/// Drive one scheduling pass over all active shops.
async fn run_scheduling_job(pool: &PgPool) {
    let shops = match revgen_db::list_active_shops(pool).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load active shops");
            return;
        }
    };

    for shop in &shops {
        if shop.auto_approve {
            match revgen_db::approve_pending_reviews(pool, shop.id).await {
                Ok(ids) if !ids.is_empty() => {
                    tracing::info!(shop = %shop.slug, approved = ids.len(), "scheduler: auto-approved pending reviews");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(shop = %shop.slug, error = %e, "scheduler: auto-approve failed");
                }
            }
        }

        let review_ids = match revgen_db::list_approved_unscheduled_ids(pool, shop.id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(shop = %shop.slug, error = %e, "scheduler: failed to list reviews awaiting slots");
                continue;
            }
        };

        let mut rng = StdRng::from_os_rng();
        match revgen_engine::schedule_reviews_for_shop(pool, shop.id, &review_ids, Utc::now(), &mut rng)
            .await
        {
            Ok(outcome) if !outcome.scheduled.is_empty() || !outcome.unplaced.is_empty() => {
                tracing::info!(
                    shop = %shop.slug,
                    scheduled = outcome.scheduled.len(),
                    unplaced = outcome.unplaced.len(),
                    "scheduler: scheduling run for shop complete"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(shop = %shop.slug, error = %e, "scheduler: scheduling run failed");
            }
        }
    }
}
