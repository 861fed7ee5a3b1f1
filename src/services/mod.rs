pub mod agent_registry;
pub mod api_keys;
pub mod auth;
pub mod claim;
pub mod credentials;

pub use agent_registry::{AgentRegistryError, AgentRegistryService, generate_slug};
pub use api_keys::{ApiKeyError, ApiKeyService, MAX_ACTIVE_KEYS};
pub use auth::{
    AgentIdentity, ApiKeyUser, AuthenticatedAgent, AuthenticatedUser, KeyAuthenticator,
    SESSION_COOKIE, SessionError, SessionService, SessionUser, constant_time_eq,
    extract_bearer_token,
};
pub use claim::{ClaimError, ClaimService};
pub use credentials::{ApiCredential, CredentialService, hash_key};
