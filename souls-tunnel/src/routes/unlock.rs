use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use souls_shared::clients::email::IntruderReport;
use souls_shared::clients::geoip::GeoInfo;
use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::api::ApiResponse;
use souls_shared::types::auth::AuthUser;

use crate::models::{User, UserProfile};
use crate::schema::{user_profiles, users};
use crate::services::otp_service;
use crate::services::request_meta::RequestMeta;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub profile_code: String,
}

/// POST /tunnels/:chat_room_id/unlock - verify the caller's profile
/// code and mark the room's archived messages readable for them. A
/// wrong code triggers an intruder alert to the account owner.
pub async fn unlock_archived(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(chat_room_id): Path<Uuid>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<UnlockRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    let entered_code = req.profile_code.trim().to_string();
    if entered_code.is_empty() {
        return Err(AppError::new(ErrorCode::ProfileCodeRequired, "profile code is required"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let account: User = users::table
        .find(user.id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found("user not found"))?;

    let profile: UserProfile = user_profiles::table
        .filter(user_profiles::user_id.eq(user.id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    if profile.profile_code != entered_code {
        alert_account_owner(&state, &account, &headers, peer, chat_room_id, &entered_code).await;
        return Err(AppError::new(ErrorCode::InvalidProfileCode, "invalid profile code"));
    }

    state
        .redis
        .set(
            &otp_service::unlock_key(user.id, chat_room_id),
            "1",
            state.config.unlock_ttl_secs,
        )
        .await
        .map_err(|e| AppError::internal(format!("failed to store unlock flag: {e}")))?;

    tracing::info!(user_id = %user.id, chat_room_id = %chat_room_id, "archived messages unlocked");

    Ok(Json(ApiResponse::ok("archived messages unlocked")))
}

/// Best-effort: collect request metadata, geolocate the IP, and email
/// the owner. Nothing here is allowed to fail the request.
async fn alert_account_owner(
    state: &AppState,
    account: &User,
    headers: &HeaderMap,
    peer: SocketAddr,
    chat_room_id: Uuid,
    entered_code: &str,
) {
    let meta = RequestMeta::capture(headers, Some(peer));

    let geo = if meta.has_ip() {
        state.geoip.lookup(&meta.ip).await
    } else {
        GeoInfo::default()
    };

    let report = IntruderReport {
        username: account.username.clone(),
        ip: meta.ip,
        country: geo.country,
        region: geo.region,
        city: geo.city,
        org: geo.org,
        user_agent: meta.user_agent,
        referer: meta.referer,
        language: meta.language,
        page: format!("/tunnels/{chat_room_id}/unlock"),
        attempt_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        entered_code: entered_code.to_string(),
    };

    tracing::warn!(
        user_id = %account.id,
        chat_room_id = %chat_room_id,
        ip = %report.ip,
        "wrong profile code attempt"
    );

    if let Err(e) = state.email.send_intruder_alert(&account.email, &report).await {
        tracing::error!(error = %e, user_id = %account.id, "failed to send intruder alert");
    }
}
