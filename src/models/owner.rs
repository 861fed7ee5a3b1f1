use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Human owner, upserted from the external identity provider on first
/// successful sign-in. Never created directly by application logic.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Owner {
    pub id: Uuid,
    pub provider_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Verified identity payload the external provider posts to /auth/callback
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderIdentity {
    pub provider_id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Response for a freshly minted session. The raw token appears exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}
