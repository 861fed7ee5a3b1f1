use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Dashboard API key row as listed back to its owner.
///
/// The stored hash never appears in any response; only the display prefix
/// does. Revocation is monotonic: once `revoked_at` is set it stays set.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub label: Option<String>,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Request payload for generating a dashboard API key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateApiKeyRequest {
    #[serde(default)]
    pub label: Option<String>,
}

/// Response for a freshly generated dashboard key; `key` is the raw
/// credential, shown exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct NewApiKeyResponse {
    pub id: Uuid,
    pub key: String,
    pub key_prefix: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}
