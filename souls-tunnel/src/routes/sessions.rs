use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::api::ApiResponse;
use souls_shared::types::auth::AuthUser;

use crate::models::{NewTunnelOtp, NewTunnelSession, TunnelOtp, TunnelSession, User};
use crate::schema::{tunnel_otps, tunnel_sessions, users};
use crate::services::otp_service;
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct InitiateTunnelRequest {
    pub recipient: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub tunnel_id: Uuid,
    pub otp: String,
}

// --- Response DTOs ---

#[derive(Debug, Serialize)]
pub struct TunnelCreatedResponse {
    pub tunnel_id: Uuid,
    pub chat_room_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TunnelVerifiedResponse {
    pub chat_room_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TunnelInfoResponse {
    pub tunnel_id: Uuid,
    pub chat_room_id: Uuid,
    pub other_user: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

// --- Helpers ---

/// Decide whether an OTP attempt redeems the session. `latest_unused`
/// is the newest unredeemed code for the session, if any; on success
/// it is returned to be marked used before the session is activated.
fn validate_otp_attempt(
    session: &TunnelSession,
    user_id: Uuid,
    latest_unused: Option<TunnelOtp>,
    entered: &str,
    now: chrono::DateTime<Utc>,
) -> AppResult<TunnelOtp> {
    if !session.includes(user_id) {
        return Err(AppError::new(ErrorCode::NotTunnelParty, "access denied"));
    }

    let otp = latest_unused
        .ok_or_else(|| AppError::new(ErrorCode::OtpInvalid, "no active code for this tunnel"))?;

    if !otp.is_valid(now) {
        return Err(AppError::new(ErrorCode::OtpExpired, "code expired"));
    }

    if otp.code != entered.trim() {
        return Err(AppError::new(ErrorCode::OtpInvalid, "invalid code"));
    }

    Ok(otp)
}

// --- Handlers ---

/// POST /tunnels - open an ephemeral tunnel to another user and email
/// them a one-time code.
pub async fn initiate_tunnel(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitiateTunnelRequest>,
) -> AppResult<Json<ApiResponse<TunnelCreatedResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let recipient: User = users::table
        .filter(users::username.eq(req.recipient.trim()))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::RecipientNotFound, "user not found"))?;

    if recipient.id == user.id {
        return Err(AppError::new(ErrorCode::CannotTunnelSelf, "cannot open a tunnel with yourself"));
    }

    let new_session = NewTunnelSession {
        initiator_id: user.id,
        recipient_id: recipient.id,
        chat_room_id: Uuid::new_v4(),
        expires_at: Utc::now() + Duration::minutes(state.config.session_ttl_minutes),
    };

    let session: TunnelSession = diesel::insert_into(tunnel_sessions::table)
        .values(&new_session)
        .get_result(&mut conn)?;

    let code = otp_service::generate_otp();
    diesel::insert_into(tunnel_otps::table)
        .values(&NewTunnelOtp {
            session_id: session.id,
            code: code.clone(),
        })
        .execute(&mut conn)?;

    if let Err(e) = state
        .email
        .send_tunnel_otp(&recipient.email, &recipient.username, &user.username, &code)
        .await
    {
        tracing::error!(error = %e, tunnel_id = %session.id, "failed to send tunnel OTP email");
    }

    tracing::info!(
        tunnel_id = %session.id,
        initiator = %user.id,
        recipient = %recipient.id,
        "tunnel initiated"
    );

    Ok(Json(ApiResponse::ok(TunnelCreatedResponse {
        tunnel_id: session.id,
        chat_room_id: session.chat_room_id,
    })))
}

/// POST /tunnels/verify - redeem the OTP and activate the tunnel.
pub async fn verify_otp(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<TunnelVerifiedResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let session: TunnelSession = tunnel_sessions::table
        .find(req.tunnel_id)
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::TunnelNotFound, "tunnel not found"))?;

    // Only the latest unredeemed code counts.
    let latest_unused: Option<TunnelOtp> = tunnel_otps::table
        .filter(tunnel_otps::session_id.eq(session.id))
        .filter(tunnel_otps::is_used.eq(false))
        .order(tunnel_otps::created_at.desc())
        .first(&mut conn)
        .optional()?;

    let otp = validate_otp_attempt(&session, user.id, latest_unused, &req.otp, Utc::now())?;

    diesel::update(tunnel_otps::table.find(otp.id))
        .set(tunnel_otps::is_used.eq(true))
        .execute(&mut conn)?;

    diesel::update(tunnel_sessions::table.find(session.id))
        .set(tunnel_sessions::is_active.eq(true))
        .execute(&mut conn)?;

    tracing::info!(tunnel_id = %session.id, user_id = %user.id, "tunnel activated");

    Ok(Json(ApiResponse::ok(TunnelVerifiedResponse {
        chat_room_id: session.chat_room_id,
    })))
}

/// GET /tunnels/:chat_room_id - info for an active tunnel the caller
/// belongs to.
pub async fn get_tunnel(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(chat_room_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TunnelInfoResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let session: TunnelSession = tunnel_sessions::table
        .filter(tunnel_sessions::chat_room_id.eq(chat_room_id))
        .filter(tunnel_sessions::is_active.eq(true))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::TunnelNotFound, "tunnel not found or inactive"))?;

    if !session.includes(user.id) {
        return Err(AppError::new(ErrorCode::NotTunnelParty, "access denied"));
    }

    let other: User = users::table
        .find(session.other_party(user.id))
        .first(&mut conn)?;

    Ok(Json(ApiResponse::ok(TunnelInfoResponse {
        tunnel_id: session.id,
        chat_room_id: session.chat_room_id,
        other_user: other.username,
        expires_at: session.expires_at,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn session(now: DateTime<Utc>) -> TunnelSession {
        TunnelSession {
            id: Uuid::new_v4(),
            initiator_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            chat_room_id: Uuid::new_v4(),
            is_active: false,
            created_at: now,
            expires_at: now + Duration::minutes(30),
        }
    }

    fn otp(session_id: Uuid, code: &str, issued_at: DateTime<Utc>) -> TunnelOtp {
        TunnelOtp {
            id: Uuid::new_v4(),
            session_id,
            code: code.to_string(),
            is_used: false,
            created_at: issued_at,
        }
    }

    fn error_code(err: AppError) -> ErrorCode {
        match err {
            AppError::Known { code, .. } => code,
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn matching_code_redeems_for_either_party() {
        let now = Utc::now();
        let s = session(now);
        let issued = otp(s.id, "482913", now);
        let redeemed =
            validate_otp_attempt(&s, s.recipient_id, Some(issued), "482913", now).unwrap();
        assert_eq!(redeemed.code, "482913");
    }

    #[test]
    fn entered_code_is_trimmed() {
        let now = Utc::now();
        let s = session(now);
        let issued = otp(s.id, "482913", now);
        assert!(validate_otp_attempt(&s, s.initiator_id, Some(issued), " 482913\n", now).is_ok());
    }

    #[test]
    fn outsider_cannot_redeem() {
        let now = Utc::now();
        let s = session(now);
        let issued = otp(s.id, "482913", now);
        let err = validate_otp_attempt(&s, Uuid::new_v4(), Some(issued), "482913", now)
            .unwrap_err();
        assert_eq!(error_code(err), ErrorCode::NotTunnelParty);
    }

    #[test]
    fn wrong_code_rejected() {
        let now = Utc::now();
        let s = session(now);
        let issued = otp(s.id, "482913", now);
        let err =
            validate_otp_attempt(&s, s.initiator_id, Some(issued), "000000", now).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::OtpInvalid);
    }

    #[test]
    fn stale_code_rejected() {
        let now = Utc::now();
        let s = session(now);
        let issued = otp(s.id, "482913", now - Duration::minutes(6));
        let err =
            validate_otp_attempt(&s, s.initiator_id, Some(issued), "482913", now).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::OtpExpired);
    }

    #[test]
    fn used_code_rejected_on_second_verify() {
        let now = Utc::now();
        let s = session(now);

        // First verify succeeds and the handler flips is_used before
        // activating the session.
        let issued = otp(s.id, "482913", now);
        assert!(validate_otp_attempt(&s, s.initiator_id, Some(issued), "482913", now).is_ok());

        // The latest-unused query then no longer returns the code, so a
        // replay of the same digits sees no active code at all.
        let err = validate_otp_attempt(&s, s.initiator_id, None, "482913", now).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::OtpInvalid);
    }
}
