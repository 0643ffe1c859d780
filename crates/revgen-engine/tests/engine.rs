//! Engine tests against a real Postgres instance, with wiremock standing in
//! for the generation API where needed.

use chrono::{Datelike, Timelike, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use revgen_ai::GeneratorClient;
use revgen_engine::GenerationSettings;
use sqlx::PgPool;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn seed_shop(pool: &PgPool, slug: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO shops (name, slug, platform, shop_url) \
         VALUES ($1, $2, 'lightspeed', $3) RETURNING id",
    )
    .bind(format!("Shop {slug}"))
    .bind(slug)
    .bind(format!("https://{slug}.example.com"))
    .fetch_one(pool)
    .await
    .expect("seed_shop failed")
}

async fn seed_product(pool: &PgPool, shop_id: i64, external_id: &str, review_count: i32) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (shop_id, external_id, name, review_count) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(shop_id)
    .bind(external_id)
    .bind(format!("Product {external_id}"))
    .bind(review_count)
    .fetch_one(pool)
    .await
    .expect("seed_product failed")
}

async fn seed_review(pool: &PgPool, shop_id: i64, product_id: Option<i64>, status: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO reviews (shop_id, product_id, status, reviewer_name, rating, title, content) \
         VALUES ($1, $2, $3, 'Tester', 5, 'Great', 'Loved it') RETURNING id",
    )
    .bind(shop_id)
    .bind(product_id)
    .bind(status)
    .fetch_one(pool)
    .await
    .expect("seed_review failed")
}

fn completion_response() -> ResponseTemplate {
    let answer = serde_json::json!({
        "reviewer_name": "Mara V.",
        "rating": 5,
        "title": "Happy with it",
        "content": "Arrived quickly and works exactly as described."
    });
    let body = serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": answer.to_string() } }
        ]
    });
    ResponseTemplate::new(200).set_body_json(body)
}

#[sqlx::test(migrations = "../../migrations")]
async fn select_products_excludes_recently_reviewed(pool: PgPool) {
    let shop_id = seed_shop(&pool, "select-shop").await;
    let fresh = seed_product(&pool, shop_id, "p-fresh", 0).await;
    seed_product(&pool, shop_id, "p-a", 0).await;
    seed_product(&pool, shop_id, "p-b", 8).await;
    seed_review(&pool, shop_id, Some(fresh), "posted").await;

    let mut rng = StdRng::seed_from_u64(7);
    let picks = revgen_engine::select_products(&pool, shop_id, 2, 7, &mut rng)
        .await
        .expect("selection");

    assert_eq!(picks.len(), 2);
    assert!(
        picks.iter().all(|p| p.product_id != fresh),
        "recently reviewed product must be excluded: {picks:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn select_products_caps_at_pool_size(pool: PgPool) {
    let shop_id = seed_shop(&pool, "small-pool-shop").await;
    seed_product(&pool, shop_id, "p-only", 0).await;

    let mut rng = StdRng::seed_from_u64(1);
    let picks = revgen_engine::select_products(&pool, shop_id, 5, 7, &mut rng)
        .await
        .expect("selection");
    assert_eq!(picks.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn schedule_places_all_approved_with_spacing(pool: PgPool) {
    let shop_id = seed_shop(&pool, "schedule-shop").await;
    for _ in 0..3 {
        seed_review(&pool, shop_id, None, "approved").await;
    }

    let ids = revgen_db::list_approved_unscheduled_ids(&pool, shop_id)
        .await
        .expect("ids");

    let now = Utc::now();
    let mut rng = StdRng::seed_from_u64(99);
    let outcome = revgen_engine::schedule_reviews_for_shop(&pool, shop_id, &ids, now, &mut rng)
        .await
        .expect("scheduling");

    assert_eq!(outcome.scheduled.len(), 3);
    assert!(outcome.unplaced.is_empty());

    let active = ["Tue", "Wed", "Thu", "Sat"];
    for (_, slot) in &outcome.scheduled {
        assert!(*slot > now);
        assert!(
            active.contains(&slot.weekday().to_string().as_str()),
            "slot on inactive day: {slot}"
        );
        let hour = slot.hour();
        assert!((9..21).contains(&hour), "slot outside window: {slot}");
    }

    for (i, (_, a)) in outcome.scheduled.iter().enumerate() {
        for (_, b) in &outcome.scheduled[i + 1..] {
            assert!(
                (*a - *b).abs() >= chrono::Duration::hours(4),
                "slots {a} and {b} violate spacing"
            );
        }
    }

    // Slots must be persisted.
    let stored: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reviews WHERE shop_id = $1 AND scheduled_at IS NOT NULL",
    )
    .bind(shop_id)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(stored, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn schedule_skips_rejected_and_already_scheduled(pool: PgPool) {
    let shop_id = seed_shop(&pool, "skip-shop").await;
    let rejected = seed_review(&pool, shop_id, None, "rejected").await;
    let scheduled = seed_review(&pool, shop_id, None, "approved").await;
    sqlx::query("UPDATE reviews SET scheduled_at = NOW() + INTERVAL '1 day' WHERE id = $1")
        .bind(scheduled)
        .execute(&pool)
        .await
        .expect("preschedule");

    // Even when the caller passes them explicitly, ineligible ids are dropped.
    let mut rng = StdRng::seed_from_u64(3);
    let outcome = revgen_engine::schedule_reviews_for_shop(
        &pool,
        shop_id,
        &[rejected, scheduled],
        Utc::now(),
        &mut rng,
    )
    .await
    .expect("scheduling");
    assert!(outcome.scheduled.is_empty());
    assert!(outcome.unplaced.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn schedule_places_only_the_requested_subset(pool: PgPool) {
    let shop_id = seed_shop(&pool, "subset-shop").await;
    let wanted = seed_review(&pool, shop_id, None, "approved").await;
    let other = seed_review(&pool, shop_id, None, "approved").await;

    let mut rng = StdRng::seed_from_u64(17);
    let outcome =
        revgen_engine::schedule_reviews_for_shop(&pool, shop_id, &[wanted], Utc::now(), &mut rng)
            .await
            .expect("scheduling");

    assert_eq!(outcome.scheduled.len(), 1);
    assert_eq!(outcome.scheduled[0].0, wanted);
    assert!(outcome.unplaced.is_empty());

    // The review that was not asked for keeps waiting.
    let slot: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT scheduled_at FROM reviews WHERE id = $1")
            .bind(other)
            .fetch_one(&pool)
            .await
            .expect("slot");
    assert!(slot.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn schedule_reports_failed_slot_write_as_unplaced(pool: PgPool) {
    let shop_id = seed_shop(&pool, "flaky-write-shop").await;
    let blocked = seed_review(&pool, shop_id, None, "approved").await;
    let fine = seed_review(&pool, shop_id, None, "approved").await;
    sqlx::query("UPDATE reviews SET reviewer_name = 'Blocked' WHERE id = $1")
        .bind(blocked)
        .execute(&pool)
        .await
        .expect("mark");

    // Simulate a failing slot write for one row.
    sqlx::raw_sql(
        "CREATE FUNCTION refuse_blocked_slot() RETURNS trigger AS $$
         BEGIN
             IF NEW.reviewer_name = 'Blocked' AND NEW.scheduled_at IS NOT NULL THEN
                 RAISE EXCEPTION 'slot write refused';
             END IF;
             RETURN NEW;
         END;
         $$ LANGUAGE plpgsql;
         CREATE TRIGGER refuse_blocked_slot BEFORE UPDATE ON reviews
             FOR EACH ROW EXECUTE FUNCTION refuse_blocked_slot();",
    )
    .execute(&pool)
    .await
    .expect("trigger");

    let mut rng = StdRng::seed_from_u64(29);
    let outcome = revgen_engine::schedule_reviews_for_shop(
        &pool,
        shop_id,
        &[blocked, fine],
        Utc::now(),
        &mut rng,
    )
    .await
    .expect("scheduling");

    // The failed write is reported, not fatal; the rest of the pass runs.
    assert_eq!(outcome.unplaced, vec![blocked]);
    assert_eq!(outcome.scheduled.len(), 1);
    assert_eq!(outcome.scheduled[0].0, fine);

    let slot: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT scheduled_at FROM reviews WHERE id = $1")
            .bind(fine)
            .fetch_one(&pool)
            .await
            .expect("slot");
    assert!(slot.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn generation_caps_at_max_per_run(pool: PgPool) {
    let shop_id = seed_shop(&pool, "gen-shop").await;
    for i in 0..6 {
        seed_product(&pool, shop_id, &format!("p-{i}"), 0).await;
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion_response())
        .mount(&server)
        .await;

    let client = GeneratorClient::with_base_url("test-key", "gpt-4o-mini", 30, &server.uri())
        .expect("client");
    let shop = revgen_db::get_shop(&pool, shop_id).await.expect("shop");

    let mut rng = StdRng::seed_from_u64(11);
    let outcome = revgen_engine::generate_reviews_for_shop(
        &pool,
        &client,
        &shop,
        GenerationSettings {
            max_per_run: 2,
            sample_reviews: 3,
            recency_days_back: 7,
        },
        &mut rng,
    )
    .await
    .expect("generation");

    // Default cadence is 5/week with nothing generated yet; the cap wins.
    assert_eq!(outcome.deficit, 5);
    assert_eq!(outcome.inserted.len(), 2);

    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE shop_id = $1 AND status = 'pending'")
            .bind(shop_id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(pending, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn generation_noop_when_cadence_met(pool: PgPool) {
    let shop_id = seed_shop(&pool, "met-shop").await;
    seed_product(&pool, shop_id, "p-x", 0).await;
    for _ in 0..5 {
        seed_review(&pool, shop_id, None, "pending").await;
    }

    let server = MockServer::start().await;
    let client = GeneratorClient::with_base_url("test-key", "gpt-4o-mini", 30, &server.uri())
        .expect("client");
    let shop = revgen_db::get_shop(&pool, shop_id).await.expect("shop");

    let mut rng = StdRng::seed_from_u64(5);
    let outcome = revgen_engine::generate_reviews_for_shop(
        &pool,
        &client,
        &shop,
        GenerationSettings {
            max_per_run: 3,
            sample_reviews: 3,
            recency_days_back: 7,
        },
        &mut rng,
    )
    .await
    .expect("generation");

    assert_eq!(outcome.deficit, 0);
    assert!(outcome.inserted.is_empty());
    // No HTTP call may have been made.
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn generation_stops_early_on_rate_limit(pool: PgPool) {
    let shop_id = seed_shop(&pool, "limited-shop").await;
    seed_product(&pool, shop_id, "p-1", 0).await;
    seed_product(&pool, shop_id, "p-2", 0).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = GeneratorClient::with_base_url("test-key", "gpt-4o-mini", 30, &server.uri())
        .expect("client");
    let shop = revgen_db::get_shop(&pool, shop_id).await.expect("shop");

    let mut rng = StdRng::seed_from_u64(21);
    let outcome = revgen_engine::generate_reviews_for_shop(
        &pool,
        &client,
        &shop,
        GenerationSettings {
            max_per_run: 2,
            sample_reviews: 3,
            recency_days_back: 7,
        },
        &mut rng,
    )
    .await
    .expect("generation");

    assert!(outcome.rate_limited);
    assert!(outcome.inserted.is_empty());
    // The run must stop after the first 429, not retry per product.
    assert_eq!(server.received_requests().await.expect("requests").len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn weekly_counts_split_generated_and_scheduled(pool: PgPool) {
    let shop_id = seed_shop(&pool, "weekly-shop").await;
    seed_review(&pool, shop_id, None, "pending").await;
    seed_review(&pool, shop_id, None, "imported").await;
    let approved = seed_review(&pool, shop_id, None, "approved").await;
    // Pin the slot inside the current Monday-start week regardless of when
    // the test runs.
    sqlx::query(
        "UPDATE reviews SET scheduled_at = date_trunc('week', NOW()) + INTERVAL '3 days' \
         WHERE id = $1",
    )
    .bind(approved)
    .execute(&pool)
    .await
    .expect("schedule");

    let now = Utc::now();
    let generated = revgen_engine::generated_count_this_week(&pool, shop_id, now)
        .await
        .expect("generated");
    assert_eq!(generated, 2, "imported must not count toward cadence");

    let scheduled = revgen_engine::scheduled_count_this_week(&pool, shop_id, now)
        .await
        .expect("scheduled");
    assert_eq!(scheduled, 1);
}
