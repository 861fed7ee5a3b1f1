//! Authentication: API key resolution and session identity.
//!
//! Two independent bearer-credential scopes exist and are never
//! interchangeable: dashboard keys resolve against the `api_keys` table to a
//! human user, agent keys resolve against `agents.api_key_hash` to an agent.
//! Human sessions ride in the `cp_session` cookie and resolve against the
//! `sessions` table. Handlers receive identities as extracted parameters;
//! there is no ambient "current user".

use std::future::Future;
use std::pin::Pin;

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, web};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Owner, ProviderIdentity};
use crate::services::credentials::hash_key;

/// Cookie carrying the human session token
pub const SESSION_COOKIE: &str = "cp_session";

/// Identity resolved from a dashboard API key
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub api_key_id: Uuid,
}

/// Identity resolved from an agent's own API key
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedAgent {
    pub agent_id: Uuid,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
/// Empty tokens are rejected.
pub fn extract_bearer_token(req: &HttpRequest) -> Option<String> {
    let auth_header = req.headers().get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    if auth_str.len() > 7 && auth_str[..7].eq_ignore_ascii_case("Bearer ") {
        let token = &auth_str[7..];
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    } else {
        None
    }
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Resolves bearer credentials to identities.
///
/// Every failure path (missing header, unknown hash, revoked key, lookup
/// error) collapses to `None` so the caller cannot distinguish causes.
#[derive(Debug, Clone)]
pub struct KeyAuthenticator {
    pool: PgPool,
}

impl KeyAuthenticator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a dashboard API key to its owning user.
    ///
    /// On success a detached `last_used_at` update is spawned; it is
    /// fire-and-forget and never affects the authentication outcome.
    pub async fn authenticate_dashboard_key(&self, raw_key: &str) -> Option<AuthenticatedUser> {
        let key_hash = hash_key(raw_key);

        let row: (Uuid, Uuid, Option<DateTime<Utc>>) = sqlx::query_as(
            "SELECT id, user_id, revoked_at FROM api_keys WHERE key_hash = $1",
        )
        .bind(&key_hash)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Dashboard key lookup failed: {e}");
            None
        })?;

        let (api_key_id, user_id, revoked_at) = row;
        if revoked_at.is_some() {
            return None;
        }

        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
                .bind(api_key_id)
                .execute(&pool)
                .await
            {
                tracing::debug!("last_used_at update failed for key {api_key_id}: {e}");
            }
        });

        Some(AuthenticatedUser {
            user_id,
            api_key_id,
        })
    }

    /// Resolve an agent's own API key to the agent. Scoped to the agents
    /// table only; a dashboard key can never match here.
    pub async fn authenticate_agent_key(&self, raw_key: &str) -> Option<AuthenticatedAgent> {
        let key_hash = hash_key(raw_key);

        let agent_id: Uuid =
            sqlx::query_scalar("SELECT id FROM agents WHERE api_key_hash = $1")
                .bind(&key_hash)
                .fetch_optional(&self.pool)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Agent key lookup failed: {e}");
                    None
                })?;

        Some(AuthenticatedAgent { agent_id })
    }
}

/// Errors from session establishment
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Human session management backed by the `sessions` table.
///
/// The external identity provider verifies who the human is; this service
/// only records the verified identity and mints an expiring session token,
/// stored hashed like every other credential.
#[derive(Debug, Clone)]
pub struct SessionService {
    pool: PgPool,
}

impl SessionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the owner row for a provider-verified identity and mint a
    /// session. Returns the raw token (shown once) and its expiry.
    pub async fn establish(
        &self,
        identity: ProviderIdentity,
        duration_hours: i64,
    ) -> Result<(String, DateTime<Utc>), SessionError> {
        let owner: Owner = sqlx::query_as(
            r#"
            INSERT INTO owners (provider_id, email, name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider_id)
            DO UPDATE SET email = $2, name = $3, avatar_url = $4
            RETURNING id, provider_id, email, name, avatar_url, created_at
            "#,
        )
        .bind(&identity.provider_id)
        .bind(&identity.email)
        .bind(&identity.name)
        .bind(&identity.avatar_url)
        .fetch_one(&self.pool)
        .await?;

        let raw_token = generate_session_token();
        let expires_at = Utc::now() + Duration::hours(duration_hours);

        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(hash_key(&raw_token))
            .bind(owner.id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok((raw_token, expires_at))
    }

    /// Resolve a session token to its owner. Expired and unknown tokens
    /// fail identically.
    pub async fn authenticate(&self, raw_token: &str) -> Option<Owner> {
        sqlx::query_as::<_, Owner>(
            r#"
            SELECT o.id, o.provider_id, o.email, o.name, o.avatar_url, o.created_at
            FROM sessions s
            JOIN owners o ON o.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > now()
            "#,
        )
        .bind(hash_key(raw_token))
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Session lookup failed: {e}");
            None
        })
    }
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!("cps_{}", hex::encode(bytes))
}

fn unauthorized() -> actix_web::Error {
    actix_web::error::InternalError::from_response(
        "Unauthorized",
        HttpResponse::Unauthorized().json(serde_json::json!({ "error": "Unauthorized" })),
    )
    .into()
}

/// Session-authenticated human identity, extracted from the `cp_session`
/// cookie. Claiming and dashboard management are human-only actions.
#[derive(Debug, Clone)]
pub struct SessionUser(pub Owner);

impl FromRequest for SessionUser {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<crate::AppState>>()
                .ok_or_else(|| {
                    tracing::error!("AppState not configured in app data");
                    unauthorized()
                })?;

            let token = req
                .cookie(SESSION_COOKIE)
                .map(|c| c.value().to_string())
                .ok_or_else(unauthorized)?;

            let owner = SessionService::new(state.db.clone())
                .authenticate(&token)
                .await
                .ok_or_else(unauthorized)?;

            Ok(SessionUser(owner))
        })
    }
}

/// Agent identity extracted from a bearer agent API key
#[derive(Debug, Clone, Copy)]
pub struct AgentIdentity {
    pub agent_id: Uuid,
}

impl FromRequest for AgentIdentity {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<crate::AppState>>()
                .ok_or_else(|| {
                    tracing::error!("AppState not configured in app data");
                    unauthorized()
                })?;

            let token = extract_bearer_token(&req).ok_or_else(unauthorized)?;

            let agent = KeyAuthenticator::new(state.db.clone())
                .authenticate_agent_key(&token)
                .await
                .ok_or_else(unauthorized)?;

            Ok(AgentIdentity {
                agent_id: agent.agent_id,
            })
        })
    }
}

/// Human identity extracted from a bearer dashboard API key
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyUser {
    pub user_id: Uuid,
    pub api_key_id: Uuid,
}

impl FromRequest for ApiKeyUser {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<crate::AppState>>()
                .ok_or_else(|| {
                    tracing::error!("AppState not configured in app data");
                    unauthorized()
                })?;

            let token = extract_bearer_token(&req).ok_or_else(unauthorized)?;

            let user = KeyAuthenticator::new(state.db.clone())
                .authenticate_dashboard_key(&token)
                .await
                .ok_or_else(unauthorized)?;

            Ok(ApiKeyUser {
                user_id: user.user_id,
                api_key_id: user.api_key_id,
            })
        })
    }
}
