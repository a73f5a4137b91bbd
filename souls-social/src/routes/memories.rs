use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::api::ApiResponse;
use souls_shared::types::auth::AuthUser;

use crate::models::{Memory, NewMemory};
use crate::schema::{memories, users};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddMemoryRequest {
    pub name: String,
    pub caption: String,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct MemoryView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub caption: String,
    pub image_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// GET /memories - the gallery, newest first
pub async fn list_memories(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MemoryView>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let rows: Vec<(Memory, String)> = memories::table
        .inner_join(users::table)
        .order(memories::created_at.desc())
        .select((memories::all_columns, users::username))
        .load(&mut conn)?;

    let views = rows
        .into_iter()
        .map(|(m, username)| MemoryView {
            id: m.id,
            user_id: m.user_id,
            username,
            name: m.name,
            caption: m.caption,
            image_url: m.image_url,
            created_at: m.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(views)))
}

/// POST /memories - add a gallery item; every field is required
pub async fn add_memory(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddMemoryRequest>,
) -> AppResult<Json<ApiResponse<Memory>>> {
    if req.name.trim().is_empty() || req.caption.trim().is_empty() || req.image_url.trim().is_empty() {
        return Err(AppError::new(ErrorCode::MemoryFieldsMissing, "all fields are required"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let memory: Memory = diesel::insert_into(memories::table)
        .values(&NewMemory {
            user_id: user.id,
            name: req.name,
            caption: req.caption,
            image_url: req.image_url,
        })
        .get_result(&mut conn)?;

    tracing::info!(memory_id = %memory.id, user_id = %user.id, "memory added");

    Ok(Json(ApiResponse::ok(memory)))
}
