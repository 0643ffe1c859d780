//! Request-level middleware for the admin API: request ids, bearer-token
//! auth, and a coarse fixed-window rate limit.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use revgen_core::{AppConfig, Environment};

/// Request id carried through handlers as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Attaches a request id to every request and echoes it back on the
/// response. An incoming `x-request-id` header wins over a generated UUID,
/// so ids from an upstream proxy survive the round trip.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = match req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
    {
        Some(given) => given.to_owned(),
        None => Uuid::new_v4().to_string(),
    };
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Bearer-token auth for the admin routes.
///
/// Tokens come from [`AppConfig::api_keys`]. An empty token set turns the
/// check off, which [`ApiAuth::from_config`] only permits in development.
#[derive(Debug, Clone)]
pub struct ApiAuth {
    keys: Arc<HashSet<String>>,
}

impl ApiAuth {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: Arc::new(keys.into_iter().collect()),
        }
    }

    /// # Errors
    ///
    /// Fails when no API keys are configured outside development.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        if config.api_keys.is_empty() {
            if config.env != Environment::Development {
                anyhow::bail!(
                    "REVGEN_API_KEYS must list at least one bearer token when REVGEN_ENV is {}",
                    config.env
                );
            }
            tracing::warn!("no API keys configured; admin routes are unauthenticated");
        }
        Ok(Self::new(config.api_keys.iter().cloned()))
    }
}

pub async fn require_bearer_auth(
    State(auth): State<ApiAuth>,
    req: Request,
    next: Next,
) -> Response {
    if auth.keys.is_empty() {
        return next.run(req).await;
    }

    if bearer_token(&req).is_some_and(|token| auth.keys.contains(token)) {
        next.run(req).await
    } else {
        reject(
            &req,
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        )
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Fixed-window rate limiter shared across all admin routes.
///
/// One window for the whole process; this is a backstop against runaway
/// clients, not per-caller accounting.
#[derive(Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    inner: Arc<Mutex<Window>>,
}

struct Window {
    opened_at: Instant,
    used: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            inner: Arc::new(Mutex::new(Window {
                opened_at: Instant::now(),
                used: 0,
            })),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rate_limit_per_minute, Duration::from_secs(60))
    }

    /// Counts one request against the current window, rolling the window
    /// over first if it has expired.
    fn try_acquire(&self) -> bool {
        let mut window = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if window.opened_at.elapsed() >= self.window {
            window.opened_at = Instant::now();
            window.used = 0;
        }
        if window.used >= self.limit {
            return false;
        }
        window.used += 1;
        true
    }
}

pub async fn enforce_rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        next.run(req).await
    } else {
        reject(
            &req,
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many requests, try again shortly",
        )
    }
}

// Same envelope the handlers produce, so clients see one error shape. The
// request-id layer wraps the protected routes, so the extension is set by
// the time either check can fail.
fn reject(req: &Request, status: StatusCode, code: &str, message: &str) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let body = serde_json::json!({
        "error": { "code": code, "message": message },
        "meta": { "request_id": request_id, "timestamp": chrono::Utc::now() },
    });
    (status, Json(body)).into_response()
}
