mod reviews;
mod runs;
mod shops;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use revgen_ai::GeneratorClient;
use revgen_core::AppConfig;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, ApiAuth, RateLimiter, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// Present only when an OpenAI API key is configured; generation
    /// endpoints answer `unavailable` without it.
    pub generator: Option<Arc<GeneratorClient>>,
}

impl AppState {
    /// Builds the shared state, constructing the generation client when an
    /// API key is configured.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client for generation cannot be constructed.
    pub fn new(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let generator = match &config.openai_api_key {
            Some(key) => Some(Arc::new(GeneratorClient::with_base_url(
                key,
                &config.openai_model,
                config.generation_timeout_secs,
                &config.openai_base_url,
            )?)),
            None => None,
        };

        Ok(Self {
            pool,
            config,
            generator,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &revgen_db::DbError) -> ApiError {
    match error {
        revgen_db::DbError::NotFound => {
            ApiError::new(request_id, "not_found", "resource not found")
        }
        revgen_db::DbError::InvalidSettings(e) => {
            ApiError::new(request_id, "validation_error", e.to_string())
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_engine_error(request_id: String, error: &revgen_engine::EngineError) -> ApiError {
    match error {
        revgen_engine::EngineError::Db(e) => map_db_error(request_id, e),
        revgen_engine::EngineError::Settings(e) => {
            ApiError::new(request_id, "validation_error", e.to_string())
        }
        revgen_engine::EngineError::Ai(e) => {
            tracing::error!(error = %e, "generation call failed");
            ApiError::new(request_id, "internal_error", "review generation failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: ApiAuth, limiter: RateLimiter) -> Router<AppState> {
    Router::new()
        .route("/api/v1/shops", get(shops::list_shops))
        .route(
            "/api/v1/shops/{shop_id}/settings",
            get(shops::get_settings).patch(shops::update_settings),
        )
        .route("/api/v1/shops/{shop_id}/reviews", get(reviews::list_reviews))
        .route(
            "/api/v1/reviews/{review_id}/approve",
            post(reviews::approve_review),
        )
        .route(
            "/api/v1/reviews/{review_id}/reject",
            post(reviews::reject_review),
        )
        .route(
            "/api/v1/shops/{shop_id}/selection",
            post(runs::run_selection),
        )
        .route(
            "/api/v1/shops/{shop_id}/generate",
            post(runs::run_generation),
        )
        .route(
            "/api/v1/shops/{shop_id}/schedule",
            post(runs::run_scheduling),
        )
        .route(
            "/api/v1/shops/{shop_id}/stats/weekly",
            get(runs::weekly_stats),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    limiter,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: ApiAuth, limiter: RateLimiter) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, limiter))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match revgen_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}
