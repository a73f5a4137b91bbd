use axum::Json;
use souls_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("souls-social", env!("CARGO_PKG_VERSION")))
}
