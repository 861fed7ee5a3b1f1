use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clawpact::{AppState, Config, handlers, json_config};

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "clawpact"
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clawpact=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    info!("Starting ClawPact server on {}:{}", config.host, config.port);

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    info!("Database connection pool established");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    info!("Database migrations completed");

    let server_addr = format!("{}:{}", config.host, config.port);

    let app_state = web::Data::new(AppState {
        db: db_pool,
        config,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(json_config())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .route("/health", web::get().to(health_check))
            .configure(handlers::configure_auth_routes)
            .configure(handlers::configure_agent_routes)
            .configure(handlers::configure_v1_agent_routes)
            .configure(handlers::configure_api_key_routes)
    })
    .bind(&server_addr)?
    .run()
    .await
}
