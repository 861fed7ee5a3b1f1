//! ClawPact - agent profile registry with a human claim workflow
//!
//! Agents self-register public profiles and manage them with their own API
//! key; humans claim agents through single-use tokens and manage them via
//! sessions or dashboard API keys.

use actix_web::{HttpResponse, web};

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;

// Re-export specific items to avoid ambiguous glob re-exports
pub use models::{
    Agent, AgentStatus, ApiKeyRow, ClaimAgentRequest, CreateAgentRequest, CreateAgentV1Request,
    CreateApiKeyRequest, NewApiKeyResponse, Owner, ProviderIdentity, RegisterAgentRequest,
    RegisterAgentResponse, SanitizedAgent, SessionResponse, UpdateAgentRequest,
    UpdateAgentSelfRequest,
};

pub use services::{
    AgentRegistryService, ApiKeyService, ClaimService, CredentialService, KeyAuthenticator,
    SessionService,
};

/// Application state shared across handlers
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Config,
}

/// JSON extractor configuration: every malformed request body maps to the
/// uniform 400 `{"error": "Invalid JSON body"}` response.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        actix_web::error::InternalError::from_response(
            err,
            HttpResponse::BadRequest()
                .json(serde_json::json!({ "error": "Invalid JSON body" })),
        )
        .into()
    })
}
