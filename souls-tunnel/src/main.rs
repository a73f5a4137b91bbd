use axum::{routing::{get, post}, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use souls_shared::clients::db::{create_pool, DbPool};
use souls_shared::clients::email::EmailClient;
use souls_shared::clients::geoip::GeoIpClient;
use souls_shared::clients::redis::RedisClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub redis: RedisClient,
    pub email: EmailClient,
    pub geoip: GeoIpClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    souls_shared::middleware::init_tracing("souls-tunnel");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    let redis = RedisClient::connect(&config.redis_url).await?;
    let email = EmailClient::new(&config.resend_api_key, &config.from_email, "SOULS");
    let geoip = GeoIpClient::new();

    let state = Arc::new(AppState { db, config, redis, email, geoip });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Sessions
        .route("/tunnels", post(routes::sessions::initiate_tunnel))
        .route("/tunnels/verify", post(routes::sessions::verify_otp))
        .route("/tunnels/:chat_room_id", get(routes::sessions::get_tunnel))
        // Messages
        .route(
            "/tunnels/:chat_room_id/messages",
            get(routes::messages::fetch_messages).post(routes::messages::send_message),
        )
        // Archived-message unlock
        .route("/tunnels/:chat_room_id/unlock", post(routes::unlock::unlock_archived))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "souls-tunnel starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
