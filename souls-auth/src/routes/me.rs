use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::auth::AuthUser;
use souls_shared::types::ApiResponse;

use crate::models::{User, UserProfile};
use crate::schema::{user_profiles, users};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    /// The caller's own unlock code; never exposed to anyone else.
    pub profile_code: String,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let account: User = users::table
        .find(user.id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found("user not found"))?;

    let profile: UserProfile = user_profiles::table
        .filter(user_profiles::user_id.eq(user.id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    Ok(Json(ApiResponse::ok(MeResponse {
        id: account.id,
        username: account.username,
        email: account.email,
        is_verified: profile.is_verified,
        profile_code: profile.profile_code,
        profile_picture_url: profile.profile_picture_url,
        created_at: account.created_at,
    })))
}
