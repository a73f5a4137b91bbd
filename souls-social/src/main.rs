use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;

use config::AppConfig;
use souls_shared::clients::db::{create_pool, DbPool};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    souls_shared::middleware::init_tracing("souls-social");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);

    let state = Arc::new(AppState { db, config });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Posts
        .route("/posts", get(routes::posts::list_posts).post(routes::posts::create_post))
        .route("/posts/:id/like", post(routes::posts::toggle_like))
        .route("/posts/:id/comments", get(routes::comments::list_comments).post(routes::comments::add_comment))
        // Memories
        .route("/memories", get(routes::memories::list_memories).post(routes::memories::add_memory))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "souls-social starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
