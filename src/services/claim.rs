//! Claim protocol: the exactly-once `unclaimed` -> `claimed` transition.
//!
//! The whole transition is a single filtered UPDATE, so the lookup and the
//! conditional write are one indivisible statement on the database side.
//! Two concurrent redemptions of the same token can never both match: the
//! winner flips `status`, the loser's filter finds no row.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Agent;

/// Errors that can occur while claiming an agent
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The token never existed or was already consumed; callers cannot tell
    /// which, by design.
    #[error("Invalid or already claimed token")]
    InvalidOrClaimed,
    /// Storage failed mid-claim; distinct from the ambiguous not-found case
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Service orchestrating claim-token redemption
#[derive(Debug, Clone)]
pub struct ClaimService {
    pool: PgPool,
}

impl ClaimService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Redeem a claim token on behalf of a session-authenticated human.
    ///
    /// On success the agent is returned with the requester as sole owner,
    /// status `claimed`, and the token cleared.
    pub async fn claim(&self, claim_token: &str, user_id: Uuid) -> Result<Agent, ClaimError> {
        if claim_token.is_empty() {
            return Err(ClaimError::InvalidOrClaimed);
        }

        let claimed = sqlx::query_as::<_, Agent>(
            r#"
            UPDATE agents
            SET owner_ids = ARRAY[$2]::uuid[],
                status = 'claimed',
                claim_token = NULL,
                updated_at = now()
            WHERE claim_token = $1 AND status = 'unclaimed'
            RETURNING *
            "#,
        )
        .bind(claim_token)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match claimed {
            Some(agent) => {
                tracing::info!(agent_id = %agent.id, "agent claimed");
                Ok(agent)
            }
            None => Err(ClaimError::InvalidOrClaimed),
        }
    }
}
