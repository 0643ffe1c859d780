//! Endpoints that trigger selection, generation, and scheduling runs on
//! demand — the same work the background jobs do on their cron cadence.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use revgen_core::ProductSelection;
use revgen_engine::GenerationSettings;

use crate::middleware::RequestId;

use super::{map_db_error, map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SelectionBody {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct GenerationData {
    inserted: Vec<i64>,
    deficit: i64,
    rate_limited: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ScheduledItem {
    id: i64,
    scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScheduleData {
    auto_approved: Vec<i64>,
    scheduled: Vec<ScheduledItem>,
    unplaced: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct WeeklyStatsData {
    generated: i64,
    scheduled: i64,
    cadence: i32,
}

pub(super) async fn run_selection(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    body: Option<Json<SelectionBody>>,
) -> Result<Json<ApiResponse<Vec<ProductSelection>>>, ApiError> {
    let count = body
        .and_then(|Json(b)| b.count)
        .unwrap_or(state.config.generation_max_per_run)
        .clamp(1, 20);

    let mut rng = StdRng::from_os_rng();
    let picks = revgen_engine::select_products(
        &state.pool,
        shop_id,
        count,
        state.config.selection_days_back,
        &mut rng,
    )
    .await
    .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: picks,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn run_generation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ApiResponse<GenerationData>>, ApiError> {
    let Some(generator) = state.generator.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            "unavailable",
            "no generation API key configured",
        ));
    };

    let shop = revgen_db::get_shop(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut rng = StdRng::from_os_rng();
    let outcome = revgen_engine::generate_reviews_for_shop(
        &state.pool,
        generator,
        &shop,
        GenerationSettings {
            max_per_run: state.config.generation_max_per_run,
            sample_reviews: state.config.generation_sample_reviews,
            recency_days_back: state.config.selection_days_back,
        },
        &mut rng,
    )
    .await
    .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: GenerationData {
            inserted: outcome.inserted,
            deficit: outcome.deficit,
            rate_limited: outcome.rate_limited,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn run_scheduling(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ApiResponse<ScheduleData>>, ApiError> {
    let shop = revgen_db::get_shop(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let auto_approved = if shop.auto_approve {
        revgen_db::approve_pending_reviews(&state.pool, shop_id)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    } else {
        Vec::new()
    };

    let review_ids = revgen_db::list_approved_unscheduled_ids(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut rng = StdRng::from_os_rng();
    let outcome = revgen_engine::schedule_reviews_for_shop(
        &state.pool,
        shop_id,
        &review_ids,
        Utc::now(),
        &mut rng,
    )
    .await
    .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ScheduleData {
            auto_approved,
            scheduled: outcome
                .scheduled
                .into_iter()
                .map(|(id, scheduled_at)| ScheduledItem { id, scheduled_at })
                .collect(),
            unplaced: outcome.unplaced,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn weekly_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ApiResponse<WeeklyStatsData>>, ApiError> {
    let shop = revgen_db::get_shop(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let now = Utc::now();
    let generated = revgen_engine::generated_count_this_week(&state.pool, shop_id, now)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;
    let scheduled = revgen_engine::scheduled_count_this_week(&state.pool, shop_id, now)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: WeeklyStatsData {
            generated,
            scheduled,
            cadence: shop.reviews_per_week,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
