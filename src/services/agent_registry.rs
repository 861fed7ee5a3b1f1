//! Agent registry: validation, self-registration, self-management, and
//! owner-side CRUD.
//!
//! Self-registration creates an unclaimed row carrying a claim token and a
//! freshly minted agent API key; owner-side creation produces a claimed row
//! with no token and no agent key. The status/token/owner invariant is
//! maintained by every write path here (and double-checked by a database
//! constraint).

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Agent, AgentStatus, CreateAgentRequest, CreateAgentV1Request, RegisterAgentRequest,
    RegisterAgentResponse, UpdateAgentRequest, UpdateAgentSelfRequest,
};
use crate::services::credentials::CredentialService;

const NAME_MAX: usize = 100;
const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 500;
const OWNER_DESCRIPTION_MAX: usize = 2000;
const SKILL_MAX: usize = 50;
const SKILLS_MAX: usize = 20;

/// Errors that can occur during agent registry operations
#[derive(Debug, Error)]
pub enum AgentRegistryError {
    #[error("Slug \"{0}\" is already taken")]
    SlugTaken(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Agent not found")]
    NotFound,
    #[error("Forbidden")]
    Forbidden,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Service for agent registration and profile management
#[derive(Debug, Clone)]
pub struct AgentRegistryService {
    pool: PgPool,
    credentials: CredentialService,
    base_url: String,
}

impl AgentRegistryService {
    pub fn new(pool: PgPool, base_url: String) -> Self {
        Self {
            pool,
            credentials: CredentialService::new(),
            base_url,
        }
    }

    /// Self-register a new agent (no auth).
    ///
    /// Slug uniqueness is checked before any mutation; the raw API key is
    /// returned to the caller exactly once and only its hash is stored.
    pub async fn register(
        &self,
        request: RegisterAgentRequest,
    ) -> Result<RegisterAgentResponse, AgentRegistryError> {
        validate_name(&request.name)?;
        validate_slug(&request.slug)?;
        validate_description(&request.description, DESCRIPTION_MAX)?;
        validate_skills(&request.skills)?;

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM agents WHERE slug = $1")
            .bind(&request.slug)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            return Err(AgentRegistryError::SlugTaken(request.slug));
        }

        let api_key = self.credentials.generate_api_key();
        let claim_token = self.credentials.generate_claim_token();

        sqlx::query(
            r#"
            INSERT INTO agents
                (slug, name, description, skills, owner_ids, status, claim_token,
                 api_key_hash, api_key_prefix)
            VALUES ($1, $2, $3, $4, '{}', 'unclaimed', $5, $6, $7)
            "#,
        )
        .bind(&request.slug)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.skills)
        .bind(&claim_token)
        .bind(&api_key.hash)
        .bind(&api_key.prefix)
        .execute(&self.pool)
        .await?;

        Ok(RegisterAgentResponse {
            api_key: api_key.raw,
            claim_url: format!("{}/claim/{claim_token}", self.base_url),
            profile_url: self.profile_url(&request.slug),
            slug: request.slug,
        })
    }

    /// Profile URL for a slug
    pub fn profile_url(&self, slug: &str) -> String {
        format!("{}/agents/{slug}", self.base_url)
    }

    pub async fn get_by_id(&self, agent_id: Uuid) -> Result<Option<Agent>, AgentRegistryError> {
        let agent = sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE id = $1")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(agent)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Agent>, AgentRegistryError> {
        let agent = sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(agent)
    }

    pub async fn get_status(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<AgentStatus>, AgentRegistryError> {
        let status: Option<AgentStatus> =
            sqlx::query_scalar("SELECT status FROM agents WHERE id = $1")
                .bind(agent_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(status)
    }

    /// Agent fetched by slug, only when the given user is among its owners
    pub async fn get_owned_by_slug(
        &self,
        slug: &str,
        user_id: Uuid,
    ) -> Result<Option<Agent>, AgentRegistryError> {
        let agent = sqlx::query_as::<_, Agent>(
            "SELECT * FROM agents WHERE slug = $1 AND $2 = ANY(owner_ids)",
        )
        .bind(slug)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(agent)
    }

    /// Partial update applied by the agent itself. Absent fields are left
    /// untouched.
    pub async fn update_self(
        &self,
        agent_id: Uuid,
        request: UpdateAgentSelfRequest,
    ) -> Result<Agent, AgentRegistryError> {
        if let Some(name) = &request.name {
            validate_name(name)?;
        }
        if let Some(description) = &request.description {
            validate_description(description, DESCRIPTION_MAX)?;
        }
        if let Some(skills) = &request.skills {
            validate_skills(skills)?;
        }

        let agent = sqlx::query_as::<_, Agent>(
            r#"
            UPDATE agents
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                skills = COALESCE($4, skills),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(agent_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.skills)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AgentRegistryError::NotFound)?;

        Ok(agent)
    }

    /// Delete the agent's own row. Returns false when no row matched.
    pub async fn delete_self(&self, agent_id: Uuid) -> Result<bool, AgentRegistryError> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Owner-authenticated creation with a slug derived from the name.
    /// The agent is claimed immediately: creator as sole owner, no claim
    /// token, no agent API key.
    pub async fn create_claimed(
        &self,
        owner_id: Uuid,
        request: CreateAgentRequest,
    ) -> Result<Agent, AgentRegistryError> {
        validate_name(&request.name)?;
        validate_description(&request.description, OWNER_DESCRIPTION_MAX)?;
        validate_skills_optional(&request.skills)?;

        let slug = generate_slug(&request.name);
        if slug.is_empty() {
            return Err(AgentRegistryError::InvalidInput(
                "Name must contain at least one alphanumeric character".to_string(),
            ));
        }

        self.insert_claimed(
            owner_id,
            &slug,
            &request.name,
            &request.description,
            &request.skills,
            request.website_url.as_deref(),
            request.github_url.as_deref(),
        )
        .await
    }

    /// Human-API-key creation with an explicit slug (v1 surface)
    pub async fn create_claimed_v1(
        &self,
        owner_id: Uuid,
        request: CreateAgentV1Request,
    ) -> Result<Agent, AgentRegistryError> {
        validate_name(&request.name)?;
        validate_slug(&request.slug)?;
        validate_description(&request.description, DESCRIPTION_MAX)?;
        validate_skills(&request.skills)?;

        self.insert_claimed(
            owner_id,
            &request.slug,
            &request.name,
            &request.description,
            &request.skills,
            None,
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_claimed(
        &self,
        owner_id: Uuid,
        slug: &str,
        name: &str,
        description: &str,
        skills: &[String],
        website_url: Option<&str>,
        github_url: Option<&str>,
    ) -> Result<Agent, AgentRegistryError> {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM agents WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            return Err(AgentRegistryError::SlugTaken(slug.to_string()));
        }

        let agent = sqlx::query_as::<_, Agent>(
            r#"
            INSERT INTO agents
                (slug, name, description, skills, website_url, github_url,
                 owner_ids, status, claim_token)
            VALUES ($1, $2, $3, $4, $5, $6, ARRAY[$7]::uuid[], 'claimed', NULL)
            RETURNING *
            "#,
        )
        .bind(slug)
        .bind(name)
        .bind(description)
        .bind(skills)
        .bind(website_url)
        .bind(github_url)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(agent)
    }

    /// Owner-side partial update by slug. Fails with `NotFound` when no such
    /// agent exists and `Forbidden` when the requester is not in its owner
    /// set. Explicit `null` clears nullable fields.
    pub async fn update_owned(
        &self,
        slug: &str,
        user_id: Uuid,
        request: UpdateAgentRequest,
    ) -> Result<Agent, AgentRegistryError> {
        if let Some(name) = &request.name {
            validate_name(name)?;
        }
        if let Some(description) = &request.description {
            validate_description(description, OWNER_DESCRIPTION_MAX)?;
        }
        if let Some(skills) = &request.skills {
            validate_skills_optional(skills)?;
        }
        if let Some(Some(karma)) = request.moltbook_karma {
            if karma < 0 {
                return Err(AgentRegistryError::InvalidInput(
                    "moltbook_karma must not be negative".to_string(),
                ));
            }
        }

        let existing = self
            .get_by_slug(slug)
            .await?
            .ok_or(AgentRegistryError::NotFound)?;

        if !existing.owner_ids.contains(&user_id) {
            return Err(AgentRegistryError::Forbidden);
        }

        // Resolve patch semantics in one place: absent keeps the stored
        // value, explicit null clears it.
        let name = request.name.unwrap_or(existing.name);
        let description = request.description.unwrap_or(existing.description);
        let skills = request.skills.unwrap_or(existing.skills);
        let website_url = request.website_url.unwrap_or(existing.website_url);
        let github_url = request.github_url.unwrap_or(existing.github_url);
        let moltbook_karma = request.moltbook_karma.unwrap_or(existing.moltbook_karma);

        let agent = sqlx::query_as::<_, Agent>(
            r#"
            UPDATE agents
            SET name = $2, description = $3, skills = $4,
                website_url = $5, github_url = $6, moltbook_karma = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(existing.id)
        .bind(&name)
        .bind(&description)
        .bind(&skills)
        .bind(&website_url)
        .bind(&github_url)
        .bind(moltbook_karma)
        .fetch_one(&self.pool)
        .await?;

        Ok(agent)
    }

    /// Owner-side deletion by slug with the same ownership check as update
    pub async fn delete_owned(
        &self,
        slug: &str,
        user_id: Uuid,
    ) -> Result<(), AgentRegistryError> {
        let existing = self
            .get_by_slug(slug)
            .await?
            .ok_or(AgentRegistryError::NotFound)?;

        if !existing.owner_ids.contains(&user_id) {
            return Err(AgentRegistryError::Forbidden);
        }

        sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(existing.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Derive a URL-safe slug from an agent name. May return an empty string
/// when the name holds no alphanumeric characters.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // suppress leading hyphens

    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            last_was_hyphen = false;
        } else if (c.is_whitespace() || c == '-') && !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

fn validate_name(name: &str) -> Result<(), AgentRegistryError> {
    if name.is_empty() {
        return Err(AgentRegistryError::InvalidInput(
            "Name is required".to_string(),
        ));
    }
    if name.chars().count() > NAME_MAX {
        return Err(AgentRegistryError::InvalidInput(format!(
            "Name must be {NAME_MAX} characters or less"
        )));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), AgentRegistryError> {
    let len = slug.len();
    if len < SLUG_MIN {
        return Err(AgentRegistryError::InvalidInput(format!(
            "Slug must be at least {SLUG_MIN} characters"
        )));
    }
    if len > SLUG_MAX {
        return Err(AgentRegistryError::InvalidInput(format!(
            "Slug must be {SLUG_MAX} characters or less"
        )));
    }

    let bytes = slug.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let ok = edge_ok(bytes[0])
        && edge_ok(bytes[len - 1])
        && bytes
            .iter()
            .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

    if !ok {
        return Err(AgentRegistryError::InvalidInput(
            "Slug must start and end with a letter or number, and contain only \
             lowercase letters, numbers, and hyphens"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str, max: usize) -> Result<(), AgentRegistryError> {
    if description.is_empty() {
        return Err(AgentRegistryError::InvalidInput(
            "Description is required".to_string(),
        ));
    }
    if description.chars().count() > max {
        return Err(AgentRegistryError::InvalidInput(format!(
            "Description must be {max} characters or less"
        )));
    }
    Ok(())
}

/// 1-20 non-empty skills, each at most 50 characters
fn validate_skills(skills: &[String]) -> Result<(), AgentRegistryError> {
    if skills.is_empty() {
        return Err(AgentRegistryError::InvalidInput(
            "At least one skill is required".to_string(),
        ));
    }
    validate_skills_optional(skills)
}

/// Same entry rules as `validate_skills` but an empty list is allowed
/// (owner-side creation tolerates it)
fn validate_skills_optional(skills: &[String]) -> Result<(), AgentRegistryError> {
    if skills.len() > SKILLS_MAX {
        return Err(AgentRegistryError::InvalidInput(format!(
            "Maximum {SKILLS_MAX} skills allowed"
        )));
    }
    for skill in skills {
        if skill.is_empty() {
            return Err(AgentRegistryError::InvalidInput(
                "Skill must not be empty".to_string(),
            ));
        }
        if skill.chars().count() > SKILL_MAX {
            return Err(AgentRegistryError::InvalidInput(format!(
                "Skill must be {SKILL_MAX} characters or less"
            )));
        }
    }
    Ok(())
}
