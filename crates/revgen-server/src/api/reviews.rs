use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, map_engine_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Serialize)]
pub(super) struct ReviewItem {
    id: i64,
    shop_id: i64,
    product_id: Option<i64>,
    status: String,
    reviewer_name: String,
    rating: i32,
    title: String,
    content: String,
    scheduled_at: Option<DateTime<Utc>>,
    posted_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReviewQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct TransitionData {
    id: i64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_at: Option<DateTime<Utc>>,
}

pub(super) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewItem>>>, ApiError> {
    let rows = revgen_db::list_reviews(
        &state.pool,
        shop_id,
        revgen_db::ReviewListFilters {
            status: query.status.as_deref(),
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ReviewItem {
            id: row.id,
            shop_id: row.shop_id,
            product_id: row.product_id,
            status: row.status,
            reviewer_name: row.reviewer_name,
            rating: row.rating,
            title: row.title,
            content: row.content,
            scheduled_at: row.scheduled_at,
            posted_at: row.posted_at,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn approve_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(review_id): Path<i64>,
) -> Result<Json<ApiResponse<TransitionData>>, ApiError> {
    let review = revgen_db::get_review(&state.pool, review_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    revgen_db::approve_review(&state.pool, review_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // A freshly approved review goes straight into the slot search instead
    // of waiting for the hourly pass.
    let mut rng = StdRng::from_os_rng();
    let outcome = revgen_engine::schedule_reviews_for_shop(
        &state.pool,
        review.shop_id,
        &[review_id],
        Utc::now(),
        &mut rng,
    )
    .await
    .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;
    let scheduled_at = outcome
        .scheduled
        .iter()
        .find(|(id, _)| *id == review_id)
        .map(|(_, slot)| *slot);

    Ok(Json(ApiResponse {
        data: TransitionData {
            id: review_id,
            status: "approved",
            scheduled_at,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn reject_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(review_id): Path<i64>,
) -> Result<Json<ApiResponse<TransitionData>>, ApiError> {
    revgen_db::reject_review(&state.pool, review_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: TransitionData {
            id: review_id,
            status: "rejected",
            scheduled_at: None,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
