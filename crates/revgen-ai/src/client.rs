//! HTTP client for an OpenAI-compatible chat-completions API.
//!
//! Wraps `reqwest` with bearer auth, a JSON-object response format, and
//! typed parsing of the model's answer into [`GeneratedReview`]. A 429 is
//! surfaced as [`AiError::RateLimited`] so callers can skip the shop and
//! move on instead of aborting a whole run.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::prompt;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the review-generation API.
///
/// Use [`GeneratorClient::new`] for production or
/// [`GeneratorClient::with_base_url`] to point at a mock server in tests.
pub struct GeneratorClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

/// Everything the prompt needs to generate one review.
#[derive(Debug, Clone)]
pub struct ReviewRequest<'a> {
    pub shop_name: &'a str,
    pub product_name: &'a str,
    /// ISO language code, e.g. `"en"` or `"nl"`.
    pub language: &'a str,
    /// Recent real reviews used as few-shot samples. May be empty.
    pub samples: &'a [ReviewSample],
}

/// A real review included in the prompt as a style sample.
#[derive(Debug, Clone)]
pub struct ReviewSample {
    pub rating: i32,
    pub title: String,
    pub content: String,
}

/// The model's answer, parsed from its JSON object.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedReview {
    pub reviewer_name: String,
    pub rating: i32,
    pub title: String,
    pub content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl GeneratorClient {
    /// Creates a client pointed at the production OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, AiError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock,
    /// or for OpenAI-compatible local gateways).
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    /// Generates one review for a product.
    ///
    /// # Errors
    ///
    /// - [`AiError::RateLimited`] on HTTP 429.
    /// - [`AiError::Api`] on any other non-2xx status.
    /// - [`AiError::Http`] on network failure.
    /// - [`AiError::Deserialize`] if the response envelope or the model's
    ///   JSON answer does not parse.
    /// - [`AiError::InvalidReview`] if the parsed review violates the
    ///   contract (rating outside 1..=5, empty fields).
    pub async fn generate_review(
        &self,
        request: &ReviewRequest<'_>,
    ) -> Result<GeneratedReview, AiError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::system_prompt(request.language),
                },
                ChatMessage {
                    role: "user",
                    content: prompt::user_prompt(request),
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: 0.9,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(model = %self.model, "generation API rate limited the request");
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "generation API returned an error");
            return Err(AiError::Api {
                status: status.as_u16(),
                message: truncate(&message, 500),
            });
        }

        let envelope: ChatResponse = {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|e| {
                tracing::warn!(error = %e, "chat completion envelope did not parse");
                AiError::Deserialize {
                    context: "chat completion envelope".to_string(),
                    source: e,
                }
            })?
        };

        let content = envelope
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AiError::InvalidReview("response had no choices".to_string()))?;

        let review: GeneratedReview = serde_json::from_str(content).map_err(|e| {
            tracing::warn!(error = %e, "model answer was not valid review JSON");
            AiError::Deserialize {
                context: "generated review JSON".to_string(),
                source: e,
            }
        })?;

        validate_review(&review)?;
        Ok(review)
    }
}

fn validate_review(review: &GeneratedReview) -> Result<(), AiError> {
    if !(1..=5).contains(&review.rating) {
        return Err(AiError::InvalidReview(format!(
            "rating {} outside 1..=5",
            review.rating
        )));
    }
    if review.reviewer_name.trim().is_empty()
        || review.title.trim().is_empty()
        || review.content.trim().is_empty()
    {
        return Err(AiError::InvalidReview("empty field".to_string()));
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}
