use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, web};

use crate::AppState;
use crate::error::AppError;
use crate::handlers::agents::ApiResponse;
use crate::models::{ProviderIdentity, SessionResponse};
use crate::services::{SESSION_COOKIE, SessionService, constant_time_eq};

/// POST /auth/callback
///
/// Endpoint the external identity provider calls with a verified identity
/// payload after a successful sign-in, authenticated by a shared webhook
/// secret. Upserts the owner row and mints a session token (set as an
/// HttpOnly cookie and returned once in the body).
pub async fn auth_callback(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ProviderIdentity>,
) -> Result<HttpResponse, AppError> {
    let presented = req
        .headers()
        .get("X-Auth-Webhook-Secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !constant_time_eq(presented, &state.config.auth_webhook_secret) {
        return Err(AppError::Unauthorized("Unauthorized".to_string()));
    }

    let identity = body.into_inner();
    if identity.provider_id.is_empty() || identity.email.is_empty() {
        return Err(AppError::Validation(
            "provider_id and email are required".to_string(),
        ));
    }

    let (session_token, expires_at) = SessionService::new(state.db.clone())
        .establish(identity, state.config.session_duration_hours)
        .await?;

    let cookie = Cookie::build(SESSION_COOKIE, session_token.clone())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .finish();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::new(SessionResponse {
            session_token,
            expires_at,
        })))
}

/// Configure the identity-provider callback route
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/callback", web::post().to(auth_callback));
}
