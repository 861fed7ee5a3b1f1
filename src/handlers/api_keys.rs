use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::handlers::agents::ApiResponse;
use crate::models::CreateApiKeyRequest;
use crate::services::{ApiKeyService, SessionUser};

/// GET /dashboard/api-keys (session auth)
pub async fn list_api_keys(
    state: web::Data<AppState>,
    user: SessionUser,
) -> Result<HttpResponse, AppError> {
    let keys = ApiKeyService::new(state.db.clone()).list(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(keys)))
}

/// POST /dashboard/api-keys (session auth)
///
/// Returns the raw key once; only its hash and display prefix are kept.
pub async fn create_api_key(
    state: web::Data<AppState>,
    user: SessionUser,
    body: web::Json<CreateApiKeyRequest>,
) -> Result<HttpResponse, AppError> {
    let response = ApiKeyService::new(state.db.clone())
        .create(user.0.id, body.into_inner().label)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::new(response)))
}

/// PATCH /dashboard/api-keys/{id} (session auth) — revoke a key
pub async fn revoke_api_key(
    state: web::Data<AppState>,
    user: SessionUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let key_id = path.into_inner();
    let row = ApiKeyService::new(state.db.clone())
        .revoke(user.0.id, key_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(row)))
}

/// Configure dashboard API key routes
pub fn configure_api_key_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard/api-keys")
            .route("", web::get().to(list_api_keys))
            .route("", web::post().to(create_api_key))
            .route("/{id}", web::patch().to(revoke_api_key)),
    );
}
