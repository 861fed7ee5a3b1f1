//! End-to-end workflow integration tests
//!
//! These validate complete multi-step journeys through ClawPact: identity
//! provider callback, agent self-registration, human claim, and owner-side
//! management.
//!
//! Run with: `cargo test --test claim_workflow_tests -- --ignored`

use actix_web::cookie::Cookie;
use actix_web::{App, test, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use clawpact::services::SESSION_COOKIE;
use clawpact::{AppState, Config, handlers, json_config};

const WEBHOOK_SECRET: &str = "test-webhook-secret";

// ============================================================================
// Test Helpers
// ============================================================================

/// Helper to create a test database pool
async fn try_create_test_pool() -> Option<PgPool> {
    let _ = dotenvy::dotenv();

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => return None,
    };

    sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .ok()
}

fn test_app_state(pool: PgPool) -> web::Data<AppState> {
    web::Data::new(AppState {
        db: pool,
        config: Config {
            database_url: std::env::var("DATABASE_URL").unwrap_or_default(),
            database_max_connections: 5,
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "https://clawpact.com".to_string(),
            auth_webhook_secret: WEBHOOK_SECRET.to_string(),
            session_duration_hours: 24,
        },
    })
}

macro_rules! full_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state)
                .app_data(json_config())
                .configure(handlers::configure_auth_routes)
                .configure(handlers::configure_agent_routes)
                .configure(handlers::configure_v1_agent_routes)
                .configure(handlers::configure_api_key_routes),
        )
        .await
    };
}

async fn read_json(resp: actix_web::dev::ServiceResponse) -> serde_json::Value {
    serde_json::from_slice(&test::read_body(resp).await).unwrap_or_default()
}

async fn cleanup_agent(pool: &PgPool, slug: &str) {
    let _ = sqlx::query("DELETE FROM agents WHERE slug = $1")
        .bind(slug)
        .execute(pool)
        .await;
}

async fn cleanup_owner_by_provider(pool: &PgPool, provider_id: &str) {
    let _ = sqlx::query("DELETE FROM owners WHERE provider_id = $1")
        .bind(provider_id)
        .execute(pool)
        .await;
}

// ============================================================================
// Full claim lifecycle
// ============================================================================

/// Journey: provider callback mints a session, an agent self-registers, the
/// human claims it with the single-use token, then manages and deletes the
/// profile through the session surface.
#[ignore]
#[actix_rt::test]
async fn test_full_claim_lifecycle() {
    let pool = match try_create_test_pool().await {
        Some(p) => p,
        None => {
            eprintln!("Skipping test: database not available");
            return;
        }
    };

    let app = full_app!(test_app_state(pool.clone()));
    let provider_id = format!("e2e-provider-{}", Uuid::new_v4());
    let slug = format!("e2e-agent-{}", &Uuid::new_v4().to_string()[..8]);

    // Step 1: identity provider callback establishes the human session
    let req = test::TestRequest::post()
        .uri("/auth/callback")
        .insert_header(("X-Auth-Webhook-Secret", WEBHOOK_SECRET))
        .set_json(json!({
            "provider_id": &provider_id,
            "email": format!("{provider_id}@example.com"),
            "name": "E2E Owner",
            "avatar_url": null
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let session = read_json(resp).await;
    let session_token = session["data"]["session_token"].as_str().unwrap().to_string();
    assert!(session_token.starts_with("cps_"));

    // Step 2: agent self-registers, receiving key and claim URL once
    let req = test::TestRequest::post()
        .uri("/agents/register")
        .set_json(json!({
            "name": "E2E Agent",
            "slug": slug,
            "description": "Agent used by the end-to-end journey",
            "skills": ["testing", "automation"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let registered = read_json(resp).await;
    let agent_key = registered["data"]["api_key"].as_str().unwrap().to_string();
    let claim_url = registered["data"]["claim_url"].as_str().unwrap().to_string();
    let claim_token = claim_url.rsplit('/').next().unwrap().to_string();
    assert!(claim_token.starts_with("clp_"));

    // Step 3: public profile is visible and sanitized before the claim
    let req = test::TestRequest::get()
        .uri(&format!("/agents/{slug}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let profile = read_json(resp).await;
    assert_eq!(profile["data"]["status"], "unclaimed");
    assert!(profile["data"].get("claim_token").is_none());

    // Step 4: the human redeems the claim token
    let req = test::TestRequest::post()
        .uri("/agents/claim")
        .cookie(Cookie::new(SESSION_COOKIE, session_token.clone()))
        .set_json(json!({ "claim_token": claim_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let claimed = read_json(resp).await;
    assert_eq!(claimed["data"]["status"], "claimed");
    assert_eq!(claimed["data"]["owner_ids"].as_array().unwrap().len(), 1);

    // Step 5: the agent still manages itself with its own key after the claim
    let req = test::TestRequest::get()
        .uri("/agents/me/status")
        .insert_header(("Authorization", format!("Bearer {agent_key}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(read_json(resp).await["data"]["status"], "claimed");

    // Step 6: the owner edits the profile through the session surface
    let req = test::TestRequest::put()
        .uri(&format!("/agents/{slug}"))
        .cookie(Cookie::new(SESSION_COOKIE, session_token.clone()))
        .set_json(json!({
            "description": "Now curated by a human",
            "website_url": "https://agent.example"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let updated = read_json(resp).await;
    assert_eq!(updated["data"]["description"], "Now curated by a human");
    assert_eq!(updated["data"]["website_url"], "https://agent.example");
    assert_eq!(updated["data"]["name"], "E2E Agent");

    // Step 7: the owner deletes the agent; profile and key both stop working
    let req = test::TestRequest::delete()
        .uri(&format!("/agents/{slug}"))
        .cookie(Cookie::new(SESSION_COOKIE, session_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/agents/{slug}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::get()
        .uri("/agents/me")
        .insert_header(("Authorization", format!("Bearer {agent_key}")))
        .to_request();
    let status = test::call_service(&app, req).await.status();

    cleanup_agent(&pool, &slug).await;
    cleanup_owner_by_provider(&pool, &provider_id).await;

    assert_eq!(status, 401);
}

// ============================================================================
// Claim token is single-use under contention
// ============================================================================

/// Two humans racing for the same claim token: exactly one wins, the other
/// receives the same 404 as for a fabricated token.
#[ignore]
#[actix_rt::test]
async fn test_concurrent_claims_one_winner() {
    let pool = match try_create_test_pool().await {
        Some(p) => p,
        None => {
            eprintln!("Skipping test: database not available");
            return;
        }
    };

    let app = full_app!(test_app_state(pool.clone()));
    let slug = format!("e2e-agent-{}", &Uuid::new_v4().to_string()[..8]);

    let req = test::TestRequest::post()
        .uri("/agents/register")
        .set_json(json!({
            "name": "Contested Agent",
            "slug": slug,
            "description": "Two humans want this one",
            "skills": ["testing"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let claim_url = read_json(resp).await["data"]["claim_url"]
        .as_str()
        .unwrap()
        .to_string();
    let claim_token = claim_url.rsplit('/').next().unwrap().to_string();

    let mut provider_ids = Vec::new();
    let mut session_tokens = Vec::new();
    for i in 0..2 {
        let provider_id = format!("e2e-racer-{i}-{}", Uuid::new_v4());
        let req = test::TestRequest::post()
            .uri("/auth/callback")
            .insert_header(("X-Auth-Webhook-Secret", WEBHOOK_SECRET))
            .set_json(json!({
                "provider_id": &provider_id,
                "email": format!("{provider_id}@example.com"),
                "name": format!("Racer {i}")
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        session_tokens.push(
            read_json(resp).await["data"]["session_token"]
                .as_str()
                .unwrap()
                .to_string(),
        );
        provider_ids.push(provider_id);
    }

    let claim_req = |token: &str| {
        test::TestRequest::post()
            .uri("/agents/claim")
            .cookie(Cookie::new(SESSION_COOKIE, token.to_string()))
            .set_json(json!({ "claim_token": &claim_token }))
            .to_request()
    };

    let (resp_a, resp_b) = tokio::join!(
        test::call_service(&app, claim_req(&session_tokens[0])),
        test::call_service(&app, claim_req(&session_tokens[1])),
    );

    let statuses = [resp_a.status().as_u16(), resp_b.status().as_u16()];
    let winners = statuses.iter().filter(|s| **s == 200).count();
    let losers = statuses.iter().filter(|s| **s == 404).count();

    // the winner holds sole ownership
    let owner_ids: Vec<Uuid> = sqlx::query_scalar("SELECT unnest(owner_ids) FROM agents WHERE slug = $1")
        .bind(&slug)
        .fetch_all(&pool)
        .await
        .expect("agent should still exist");

    cleanup_agent(&pool, &slug).await;
    for provider_id in &provider_ids {
        cleanup_owner_by_provider(&pool, provider_id).await;
    }

    assert_eq!(winners, 1, "exactly one claim must succeed: {statuses:?}");
    assert_eq!(losers, 1, "the losing claim must see 404: {statuses:?}");
    assert_eq!(owner_ids.len(), 1);
}

// ============================================================================
// Callback guard
// ============================================================================

#[ignore]
#[actix_rt::test]
async fn test_callback_rejects_bad_secret_and_identity() {
    let pool = match try_create_test_pool().await {
        Some(p) => p,
        None => {
            eprintln!("Skipping test: database not available");
            return;
        }
    };

    let app = full_app!(test_app_state(pool.clone()));

    // wrong shared secret
    let req = test::TestRequest::post()
        .uri("/auth/callback")
        .insert_header(("X-Auth-Webhook-Secret", "wrong-secret"))
        .set_json(json!({
            "provider_id": "someone",
            "email": "someone@example.com",
            "name": "Someone"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // missing secret entirely
    let req = test::TestRequest::post()
        .uri("/auth/callback")
        .set_json(json!({
            "provider_id": "someone",
            "email": "someone@example.com",
            "name": "Someone"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // valid secret but incomplete identity
    let req = test::TestRequest::post()
        .uri("/auth/callback")
        .insert_header(("X-Auth-Webhook-Secret", WEBHOOK_SECRET))
        .set_json(json!({
            "provider_id": "",
            "email": "",
            "name": "Nobody"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}
