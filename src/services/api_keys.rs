//! Dashboard API key management: list, generate, revoke.
//!
//! A user holds at most `MAX_ACTIVE_KEYS` non-revoked keys at once. The
//! count-then-insert check is not transactional; a rare transient breach of
//! the cap under concurrent issuance by the same user is accepted.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ApiKeyRow, NewApiKeyResponse};
use crate::services::credentials::CredentialService;

/// Maximum simultaneously non-revoked keys per user
pub const MAX_ACTIVE_KEYS: i64 = 5;

/// Errors that can occur during dashboard key operations
#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error("Maximum of {MAX_ACTIVE_KEYS} active API keys allowed")]
    CapReached,
    #[error("API key not found")]
    NotFound,
    #[error("API key is already revoked")]
    AlreadyRevoked,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Service for dashboard-managed API keys
#[derive(Debug, Clone)]
pub struct ApiKeyService {
    pool: PgPool,
    credentials: CredentialService,
}

impl ApiKeyService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            credentials: CredentialService::new(),
        }
    }

    /// List a user's keys, newest first. Hashes never leave the database.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ApiKeyRow>, ApiKeyError> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT id, label, key_prefix, created_at, last_used_at, revoked_at
            FROM api_keys
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Generate a new key for a user, enforcing the active-key cap. The raw
    /// key appears in the response exactly once.
    pub async fn create(
        &self,
        user_id: Uuid,
        label: Option<String>,
    ) -> Result<NewApiKeyResponse, ApiKeyError> {
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM api_keys WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if active >= MAX_ACTIVE_KEYS {
            return Err(ApiKeyError::CapReached);
        }

        let credential = self.credentials.generate_api_key();
        let label = label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());

        let row: ApiKeyRow = sqlx::query_as(
            r#"
            INSERT INTO api_keys (user_id, key_hash, key_prefix, label)
            VALUES ($1, $2, $3, $4)
            RETURNING id, label, key_prefix, created_at, last_used_at, revoked_at
            "#,
        )
        .bind(user_id)
        .bind(&credential.hash)
        .bind(&credential.prefix)
        .bind(&label)
        .fetch_one(&self.pool)
        .await?;

        Ok(NewApiKeyResponse {
            id: row.id,
            key: credential.raw,
            key_prefix: row.key_prefix,
            label: row.label,
            created_at: row.created_at,
        })
    }

    /// Revoke a key the user owns. Revocation is monotonic: a revoked key
    /// never becomes active again.
    pub async fn revoke(&self, user_id: Uuid, key_id: Uuid) -> Result<ApiKeyRow, ApiKeyError> {
        let existing: Option<ApiKeyRow> = sqlx::query_as(
            r#"
            SELECT id, label, key_prefix, created_at, last_used_at, revoked_at
            FROM api_keys
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(key_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let existing = existing.ok_or(ApiKeyError::NotFound)?;
        if existing.revoked_at.is_some() {
            return Err(ApiKeyError::AlreadyRevoked);
        }

        let row: ApiKeyRow = sqlx::query_as(
            r#"
            UPDATE api_keys
            SET revoked_at = now()
            WHERE id = $1 AND revoked_at IS NULL
            RETURNING id, label, key_prefix, created_at, last_used_at, revoked_at
            "#,
        )
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiKeyError::AlreadyRevoked)?;

        Ok(row)
    }
}
