//! Integration tests for `GeneratorClient` using wiremock HTTP mocks.

use revgen_ai::{AiError, GeneratorClient, ReviewRequest, ReviewSample};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> GeneratorClient {
    GeneratorClient::with_base_url("test-key", "gpt-4o-mini", 30, base_url)
        .expect("client construction should not fail")
}

fn request<'a>(samples: &'a [ReviewSample]) -> ReviewRequest<'a> {
    ReviewRequest {
        shop_name: "Velo Outlet",
        product_name: "Trail Pump",
        language: "en",
        samples,
    }
}

fn completion_body(content: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content.to_string()
                },
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
async fn generate_review_parses_model_answer() {
    let server = MockServer::start().await;

    let answer = serde_json::json!({
        "reviewer_name": "Sophie K.",
        "rating": 5,
        "title": "Exactly what I needed",
        "content": "Inflates my tires in no time and fits in a jersey pocket."
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&answer)))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let review = client
        .generate_review(&request(&[]))
        .await
        .expect("should parse review");

    assert_eq!(review.reviewer_name, "Sophie K.");
    assert_eq!(review.rating, 5);
    assert_eq!(review.title, "Exactly what I needed");
}

#[tokio::test]
async fn rate_limit_maps_to_dedicated_variant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.generate_review(&request(&[])).await.unwrap_err();
    assert!(matches!(err, AiError::RateLimited), "got {err:?}");
}

#[tokio::test]
async fn server_error_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.generate_review(&request(&[])).await.unwrap_err();
    match err {
        AiError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
    let server = MockServer::start().await;

    let answer = serde_json::json!({
        "reviewer_name": "Bot",
        "rating": 9,
        "title": "!!!",
        "content": "Too enthusiastic."
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&answer)))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.generate_review(&request(&[])).await.unwrap_err();
    assert!(matches!(err, AiError::InvalidReview(_)), "got {err:?}");
}

#[tokio::test]
async fn non_json_answer_is_a_deserialize_error() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": "five stars, great!" } }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.generate_review(&request(&[])).await.unwrap_err();
    assert!(matches!(err, AiError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn samples_reach_the_prompt() {
    let server = MockServer::start().await;

    let answer = serde_json::json!({
        "reviewer_name": "Joris",
        "rating": 4,
        "title": "Prima",
        "content": "Doet wat het moet doen."
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&answer)))
        .mount(&server)
        .await;

    let samples = vec![ReviewSample {
        rating: 5,
        title: "Aanrader".to_string(),
        content: "Snelle levering.".to_string(),
    }];

    let client = test_client(&server.uri());
    let review = client
        .generate_review(&request(&samples))
        .await
        .expect("should parse review");
    assert_eq!(review.rating, 4);

    // The outgoing request body should carry the sample text.
    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests.len(), 1);
    let sent = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(sent.contains("Aanrader"));
    assert!(sent.contains("Snelle levering."));
}
