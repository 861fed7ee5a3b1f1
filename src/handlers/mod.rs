pub mod agents;
pub mod api_keys;
pub mod auth;



pub use agents::{configure_agent_routes, configure_v1_agent_routes};
pub use api_keys::configure_api_key_routes;
pub use auth::configure_auth_routes;
