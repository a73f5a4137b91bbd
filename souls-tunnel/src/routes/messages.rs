use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::api::ApiResponse;
use souls_shared::types::auth::AuthUser;

use crate::models::{NewTunnelMessage, TunnelMessage, TunnelSession};
use crate::schema::{tunnel_messages, tunnel_sessions, users};
use crate::services::otp_service;
use crate::AppState;

const ARCHIVED_PLACEHOLDER: &str = "[Archived Content]";

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub unlocked: bool,
    pub messages: Vec<MessageView>,
}

fn load_session_for(
    conn: &mut diesel::pg::PgConnection,
    chat_room_id: Uuid,
    user_id: Uuid,
) -> AppResult<TunnelSession> {
    let session: TunnelSession = tunnel_sessions::table
        .filter(tunnel_sessions::chat_room_id.eq(chat_room_id))
        .first(conn)
        .map_err(|_| AppError::new(ErrorCode::TunnelNotFound, "tunnel not found"))?;

    if !session.includes(user_id) {
        return Err(AppError::new(ErrorCode::NotTunnelParty, "access denied"));
    }

    Ok(session)
}

/// POST /tunnels/:chat_room_id/messages - send into an active tunnel.
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(chat_room_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<TunnelMessage>>> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "message must not be empty"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let session = load_session_for(&mut conn, chat_room_id, user.id)?;

    if !session.is_active {
        return Err(AppError::new(ErrorCode::TunnelInactive, "tunnel is not active"));
    }
    if session.is_expired(Utc::now()) {
        return Err(AppError::new(ErrorCode::TunnelExpired, "tunnel has expired"));
    }

    let message: TunnelMessage = diesel::insert_into(tunnel_messages::table)
        .values(&NewTunnelMessage {
            chat_room_id,
            sender_id: user.id,
            content,
        })
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(message)))
}

/// GET /tunnels/:chat_room_id/messages - the room's history, oldest
/// first. Content is masked until the caller unlocks the room with
/// their profile code.
pub async fn fetch_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(chat_room_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessagesResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    load_session_for(&mut conn, chat_room_id, user.id)?;

    let unlocked = state
        .redis
        .exists(&otp_service::unlock_key(user.id, chat_room_id))
        .await
        .unwrap_or(false);

    let rows: Vec<(TunnelMessage, String)> = tunnel_messages::table
        .inner_join(users::table)
        .filter(tunnel_messages::chat_room_id.eq(chat_room_id))
        .order(tunnel_messages::created_at.asc())
        .select((tunnel_messages::all_columns, users::username))
        .load(&mut conn)?;

    let messages = rows
        .into_iter()
        .map(|(m, sender_username)| MessageView {
            id: m.id,
            sender_id: m.sender_id,
            sender_username,
            content: if unlocked {
                m.content
            } else {
                ARCHIVED_PLACEHOLDER.to_string()
            },
            created_at: m.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(MessagesResponse { unlocked, messages })))
}
