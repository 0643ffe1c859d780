use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use revgen_core::{
    parse_slot_time, parse_weekday, weekday_code, Cadence, PriorityWeights, ShopSettings,
};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ShopItem {
    id: i64,
    name: String,
    slug: String,
    platform: String,
    shop_url: Option<String>,
    language: String,
    reviews_per_week: i32,
    auto_approve: bool,
    is_active: bool,
}

/// Wire shape of per-shop settings; weekdays as `mon`..`sun` codes and slot
/// times as `HH:MM` strings.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct SettingsBody {
    weights: WeightsBody,
    stale_days_threshold: i64,
    reviews_per_week: i32,
    active_days: Vec<String>,
    slot_start: String,
    slot_end: String,
    min_hours_between: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct WeightsBody {
    bestsellers: u8,
    no_reviews: u8,
    stale: u8,
}

impl SettingsBody {
    fn from_settings(settings: &ShopSettings) -> Self {
        Self {
            weights: WeightsBody {
                bestsellers: settings.weights.bestsellers,
                no_reviews: settings.weights.no_reviews,
                stale: settings.weights.stale,
            },
            stale_days_threshold: settings.stale_days_threshold,
            reviews_per_week: settings.cadence.reviews_per_week,
            active_days: settings
                .cadence
                .active_days
                .iter()
                .map(|d| weekday_code(*d).to_string())
                .collect(),
            slot_start: settings.cadence.slot_start.format("%H:%M").to_string(),
            slot_end: settings.cadence.slot_end.format("%H:%M").to_string(),
            min_hours_between: settings.cadence.min_hours_between,
        }
    }

    fn into_settings(self) -> Result<ShopSettings, revgen_core::SettingsError> {
        let active_days = self
            .active_days
            .iter()
            .map(|code| parse_weekday(code))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ShopSettings {
            weights: PriorityWeights {
                bestsellers: self.weights.bestsellers,
                no_reviews: self.weights.no_reviews,
                stale: self.weights.stale,
            },
            stale_days_threshold: self.stale_days_threshold,
            cadence: Cadence {
                reviews_per_week: self.reviews_per_week,
                active_days,
                slot_start: parse_slot_time(&self.slot_start)?,
                slot_end: parse_slot_time(&self.slot_end)?,
                min_hours_between: self.min_hours_between,
            },
        })
    }
}

pub(super) async fn list_shops(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ShopItem>>>, ApiError> {
    let rows = revgen_db::list_active_shops(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ShopItem {
            id: row.id,
            name: row.name,
            slug: row.slug,
            platform: row.platform,
            shop_url: row.shop_url,
            language: row.language,
            reviews_per_week: row.reviews_per_week,
            auto_approve: row.auto_approve,
            is_active: row.is_active,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ApiResponse<SettingsBody>>, ApiError> {
    let settings = revgen_db::get_shop_settings(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SettingsBody::from_settings(&settings),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<i64>,
    Json(body): Json<SettingsBody>,
) -> Result<Json<ApiResponse<SettingsBody>>, ApiError> {
    let settings = body
        .into_settings()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    revgen_db::update_shop_settings(&state.pool, shop_id, &settings)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SettingsBody::from_settings(&settings),
        meta: ResponseMeta::new(req_id.0),
    }))
}
