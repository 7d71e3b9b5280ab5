//! GenBox Server - Main Application Entry Point
//!
//! This is the API server for a UGC image-generation SaaS: a product photo
//! plus a chosen character persona in, AI-generated marketing images out.
//! Free-tier generations run on platform provider keys and consume credits;
//! paid (BYOK) users bring their own encrypted keys.
//!
//! # Architecture
//!
//! - **Web framework**: Axum over tokio, JSON in and out
//! - **Database**: PostgreSQL through sqlx, embedded migrations
//! - **Authentication**: bearer session tokens, SHA-256-hashed lookups
//! - **AI providers**: Kie AI (image jobs, polled asynchronously) and Gemini
//!   (prompt assistance), both behind retrying HTTP clients
//!
//! # Startup
//!
//! Config, pool, migrations, then shared state (provider clients, rate
//! limiter, storage) and the router. Generation endpoints sit behind the
//! session middleware; `/health` and key validation stay public.

mod config;
mod db;
mod encryption;
mod error;
mod handlers;
mod middleware;
mod models;
mod rate_limit;
mod services;
mod state;
mod watermark;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity; default to info.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Wire up shared state: provider clients, rate limiter, object storage
    let app_state = state::AppState::new(pool, config);

    // Everything a session token gates: generation, prompts, keys, credits.
    let authenticated_routes = Router::new()
        // Generation routes
        .route(
            "/api/generate/image",
            post(handlers::generations::generate_image),
        )
        .route(
            "/api/generate/{id}/status",
            get(handlers::generations::generation_status),
        )
        .route(
            "/api/generate/character",
            post(handlers::characters::generate_character),
        )
        // Prompt builder
        .route("/api/prompt", post(handlers::prompt::build_prompt))
        // BYOK key management
        .route(
            "/api/byok",
            post(handlers::byok::save_key).delete(handlers::byok::delete_key),
        )
        // Credits
        .route("/api/credits", get(handlers::credits::get_credits))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::auth_middleware,
        ));

    let app = Router::new()
        // Public: monitors hit /health, and key validation runs before the
        // user has finished onboarding.
        .route("/health", get(handlers::health::health_check))
        .route("/api/byok/validate", post(handlers::byok::validate_key))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state.clone());

    let addr = format!("0.0.0.0:{}", app_state.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
