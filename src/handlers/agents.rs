use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::AppState;
use crate::error::AppError;
use crate::models::{
    ClaimAgentRequest, CreateAgentRequest, CreateAgentV1Request, RegisterAgentRequest,
    SanitizedAgent, UpdateAgentRequest, UpdateAgentSelfRequest,
};
use crate::services::{
    AgentIdentity, AgentRegistryService, ApiKeyUser, ClaimService, SessionUser,
};

/// Standard API response wrapper
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn new(data: T) -> Self {
        Self { data }
    }
}

/// Sanitized agent plus its public profile URL (v1 surface)
#[derive(Serialize)]
struct AgentWithProfileUrl {
    #[serde(flatten)]
    agent: SanitizedAgent,
    profile_url: String,
}

fn registry(state: &web::Data<AppState>) -> AgentRegistryService {
    AgentRegistryService::new(state.db.clone(), state.config.base_url.clone())
}

/// POST /agents/register
///
/// Agent self-registration, the only unauthenticated mutation. Returns the
/// raw agent API key and the claim URL exactly once.
pub async fn register_agent(
    state: web::Data<AppState>,
    body: web::Json<RegisterAgentRequest>,
) -> Result<HttpResponse, AppError> {
    let response = registry(&state).register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(response)))
}

/// POST /agents/claim
///
/// Redeem a claim token; human-only (session auth). Succeeds for exactly
/// one concurrent redemption of a given token.
pub async fn claim_agent(
    state: web::Data<AppState>,
    user: SessionUser,
    body: web::Json<ClaimAgentRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    if request.claim_token.is_empty() {
        return Err(AppError::Validation("Claim token is required".to_string()));
    }

    let agent = ClaimService::new(state.db.clone())
        .claim(&request.claim_token, user.0.id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(SanitizedAgent::from(agent))))
}

/// GET /agents/me (agent API key auth)
pub async fn get_me(
    state: web::Data<AppState>,
    identity: AgentIdentity,
) -> Result<HttpResponse, AppError> {
    let agent = registry(&state)
        .get_by_id(identity.agent_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(SanitizedAgent::from(agent))))
}

/// PATCH /agents/me (agent API key auth)
///
/// Partial update; absent fields are left untouched.
pub async fn update_me(
    state: web::Data<AppState>,
    identity: AgentIdentity,
    body: web::Json<UpdateAgentSelfRequest>,
) -> Result<HttpResponse, AppError> {
    let agent = registry(&state)
        .update_self(identity.agent_id, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(SanitizedAgent::from(agent))))
}

/// DELETE /agents/me (agent API key auth)
pub async fn delete_me(
    state: web::Data<AppState>,
    identity: AgentIdentity,
) -> Result<HttpResponse, AppError> {
    registry(&state).delete_self(identity.agent_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "deleted": true }))))
}

/// GET /agents/me/status (agent API key auth)
pub async fn get_my_status(
    state: web::Data<AppState>,
    identity: AgentIdentity,
) -> Result<HttpResponse, AppError> {
    let status = registry(&state)
        .get_status(identity.agent_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "status": status }))))
}

/// GET /agents/{slug} — public profile, always sanitized
pub async fn get_agent(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let agent = registry(&state)
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(SanitizedAgent::from(agent))))
}

/// POST /agents (session auth)
///
/// Owner-side creation; the slug is derived from the name and the agent is
/// claimed immediately with the creator as sole owner.
pub async fn create_agent(
    state: web::Data<AppState>,
    user: SessionUser,
    body: web::Json<CreateAgentRequest>,
) -> Result<HttpResponse, AppError> {
    let agent = registry(&state)
        .create_claimed(user.0.id, body.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::new(SanitizedAgent::from(agent))))
}

/// PUT /agents/{slug} (session auth, owner only)
pub async fn update_agent(
    state: web::Data<AppState>,
    user: SessionUser,
    path: web::Path<String>,
    body: web::Json<UpdateAgentRequest>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let agent = registry(&state)
        .update_owned(&slug, user.0.id, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(SanitizedAgent::from(agent))))
}

/// DELETE /agents/{slug} (session auth, owner only)
pub async fn delete_agent(
    state: web::Data<AppState>,
    user: SessionUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    registry(&state).delete_owned(&slug, user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "deleted": true }))))
}

/// POST /v1/agents (dashboard API key auth)
pub async fn create_agent_v1(
    state: web::Data<AppState>,
    user: ApiKeyUser,
    body: web::Json<CreateAgentV1Request>,
) -> Result<HttpResponse, AppError> {
    let service = registry(&state);
    let agent = service
        .create_claimed_v1(user.user_id, body.into_inner())
        .await?;

    let profile_url = service.profile_url(&agent.slug);
    Ok(HttpResponse::Created().json(ApiResponse::new(AgentWithProfileUrl {
        agent: SanitizedAgent::from(agent),
        profile_url,
    })))
}

/// GET /v1/agents/{slug} (dashboard API key auth, owner only)
///
/// Ownership is part of the lookup filter, so a non-owner sees the same 404
/// as a missing agent.
pub async fn get_agent_v1(
    state: web::Data<AppState>,
    user: ApiKeyUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let service = registry(&state);
    let agent = service
        .get_owned_by_slug(&slug, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

    let profile_url = service.profile_url(&agent.slug);
    Ok(HttpResponse::Ok().json(ApiResponse::new(AgentWithProfileUrl {
        agent: SanitizedAgent::from(agent),
        profile_url,
    })))
}

/// PATCH /v1/agents/{slug} (dashboard API key auth, owner only)
pub async fn update_agent_v1(
    state: web::Data<AppState>,
    user: ApiKeyUser,
    path: web::Path<String>,
    body: web::Json<UpdateAgentRequest>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let service = registry(&state);
    let agent = service
        .update_owned(&slug, user.user_id, body.into_inner())
        .await?;

    let profile_url = service.profile_url(&agent.slug);
    Ok(HttpResponse::Ok().json(ApiResponse::new(AgentWithProfileUrl {
        agent: SanitizedAgent::from(agent),
        profile_url,
    })))
}

/// DELETE /v1/agents/{slug} (dashboard API key auth, owner only)
pub async fn delete_agent_v1(
    state: web::Data<AppState>,
    user: ApiKeyUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    registry(&state).delete_owned(&slug, user.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configure the session/public agent surface.
/// Static paths must be registered before the `{slug}` resource so
/// actix-web matches them first.
pub fn configure_agent_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/agents")
            .route("/register", web::post().to(register_agent))
            .route("/claim", web::post().to(claim_agent))
            .route("/me/status", web::get().to(get_my_status))
            .route("/me", web::get().to(get_me))
            .route("/me", web::patch().to(update_me))
            .route("/me", web::delete().to(delete_me))
            .route("", web::post().to(create_agent))
            .route("/{slug}", web::get().to(get_agent))
            .route("/{slug}", web::put().to(update_agent))
            .route("/{slug}", web::delete().to(delete_agent)),
    );
}

/// Configure the dashboard-key v1 agent surface
pub fn configure_v1_agent_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1/agents")
            .route("", web::post().to(create_agent_v1))
            .route("/{slug}", web::get().to(get_agent_v1))
            .route("/{slug}", web::patch().to(update_agent_v1))
            .route("/{slug}", web::delete().to(delete_agent_v1)),
    );
}
