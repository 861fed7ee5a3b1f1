use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Claim lifecycle state of an agent.
///
/// `unclaimed` is the initial state entered at self-registration; `claimed`
/// is terminal. While unclaimed the row carries a claim token and an empty
/// owner set; once claimed the token is null and the owner set is non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "agent_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Unclaimed,
    Claimed,
}

/// Agent entity as stored, credential columns included.
///
/// Deliberately not `Serialize`: an `Agent` cannot leave the HTTP boundary
/// directly. Convert to [`SanitizedAgent`] first.
#[derive(Debug, Clone, FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub skills: Vec<String>,
    pub website_url: Option<String>,
    pub github_url: Option<String>,
    pub moltbook_karma: Option<i32>,
    pub owner_ids: Vec<Uuid>,
    pub status: AgentStatus,
    pub claim_token: Option<String>,
    pub api_key_hash: Option<String>,
    pub api_key_prefix: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Agent record with credential fields stripped.
///
/// The only agent representation handlers are able to serialize; the
/// sanitization contract is enforced by the type rather than by field
/// deletion at each call site.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAgent {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub skills: Vec<String>,
    pub website_url: Option<String>,
    pub github_url: Option<String>,
    pub moltbook_karma: Option<i32>,
    pub owner_ids: Vec<Uuid>,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Agent> for SanitizedAgent {
    fn from(agent: Agent) -> Self {
        Self {
            id: agent.id,
            slug: agent.slug,
            name: agent.name,
            description: agent.description,
            skills: agent.skills,
            website_url: agent.website_url,
            github_url: agent.github_url,
            moltbook_karma: agent.moltbook_karma,
            owner_ids: agent.owner_ids,
            status: agent.status,
            created_at: agent.created_at,
            updated_at: agent.updated_at,
        }
    }
}

/// Request payload for agent self-registration (no auth)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub skills: Vec<String>,
}

/// Response payload for successful self-registration.
///
/// `api_key` is the raw credential and appears here exactly once; it is
/// never persisted or retrievable again.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterAgentResponse {
    pub api_key: String,
    pub claim_url: String,
    pub profile_url: String,
    pub slug: String,
}

/// Request payload for claiming an unclaimed agent (session auth)
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimAgentRequest {
    pub claim_token: String,
}

/// Partial update an agent applies to itself via its own API key.
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAgentSelfRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
}

/// Request payload for owner-authenticated agent creation; the slug is
/// derived from the name.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
}

/// Request payload for human-API-key agent creation with an explicit slug
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentV1Request {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub skills: Vec<String>,
}

/// Owner-side partial update. Nullable fields distinguish "absent" (leave
/// untouched) from explicit `null` (clear) via the double-option encoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub website_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub github_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub moltbook_karma: Option<Option<i32>>,
}

/// Maps a present-but-null JSON field to `Some(None)`, so `None` means the
/// field was absent from the document.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_agent() -> Agent {
        Agent {
            id: Uuid::new_v4(),
            slug: "test-agent".to_string(),
            name: "Test Agent".to_string(),
            description: "A test agent for testing".to_string(),
            skills: vec!["testing".to_string()],
            website_url: None,
            github_url: Some("https://github.com/test".to_string()),
            moltbook_karma: Some(7),
            owner_ids: vec![],
            status: AgentStatus::Unclaimed,
            claim_token: Some("clp_sometoken".to_string()),
            api_key_hash: Some("abc123".to_string()),
            api_key_prefix: Some("cp_abc123de...".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sanitize_strips_only_credential_fields() {
        let agent = test_agent();
        let sanitized = SanitizedAgent::from(agent.clone());

        let json = serde_json::to_value(&sanitized).unwrap();
        assert!(json.get("claim_token").is_none());
        assert!(json.get("api_key_hash").is_none());
        assert!(json.get("api_key_prefix").is_none());

        // every other field survives unchanged
        assert_eq!(json["slug"], agent.slug);
        assert_eq!(json["name"], agent.name);
        assert_eq!(json["description"], agent.description);
        assert_eq!(json["skills"][0], "testing");
        assert_eq!(json["github_url"], "https://github.com/test");
        assert_eq!(json["moltbook_karma"], 7);
        assert_eq!(json["status"], "unclaimed");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AgentStatus::Claimed).unwrap(),
            "\"claimed\""
        );
        assert_eq!(
            serde_json::to_string(&AgentStatus::Unclaimed).unwrap(),
            "\"unclaimed\""
        );
    }

    #[test]
    fn test_update_request_absent_vs_null() {
        let absent: UpdateAgentRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.website_url, None);
        assert_eq!(absent.moltbook_karma, None);

        let cleared: UpdateAgentRequest =
            serde_json::from_str(r#"{"website_url": null, "moltbook_karma": null}"#).unwrap();
        assert_eq!(cleared.website_url, Some(None));
        assert_eq!(cleared.moltbook_karma, Some(None));

        let set: UpdateAgentRequest =
            serde_json::from_str(r#"{"website_url": "https://a.example", "moltbook_karma": 3}"#)
                .unwrap();
        assert_eq!(set.website_url, Some(Some("https://a.example".to_string())));
        assert_eq!(set.moltbook_karma, Some(Some(3)));
    }
}
