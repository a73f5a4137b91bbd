use axum::Json;
use souls_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("souls-auth", env!("CARGO_PKG_VERSION")))
}
