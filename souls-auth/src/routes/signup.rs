use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::auth::AccessToken;
use souls_shared::types::ApiResponse;

use crate::models::{NewUser, NewUserProfile, User};
use crate::schema::{user_profiles, users};
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    pub username: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub profile_picture_url: Option<String>,
}

/// Map a unique-index violation to the column that actually collided.
/// Postgres reports the constraint name (`users_email_key` /
/// `users_username_key`); when it withholds one, fall back to the
/// combined message.
fn map_unique_violation(constraint: Option<&str>) -> AppError {
    match constraint {
        Some(name) if name.contains("email") => {
            AppError::new(ErrorCode::EmailAlreadyExists, "email is already in use")
        }
        Some(name) if name.contains("username") => {
            AppError::new(ErrorCode::UsernameTaken, "username is already taken")
        }
        _ => AppError::new(ErrorCode::UsernameTaken, "username or email is already taken"),
    }
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> AppResult<Json<ApiResponse<AccessToken>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if req.password != req.confirm_password {
        return Err(AppError::new(ErrorCode::PasswordMismatch, "passwords do not match"));
    }

    auth_service::validate_password(&req.password)?;

    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "username is required"));
    }

    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let email = req.email.to_lowercase();

    let email_taken: bool = users::table
        .filter(users::email.eq(&email))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);

    if email_taken {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email is already in use"));
    }

    let username_taken: bool = users::table
        .filter(users::username.eq(&username))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);

    if username_taken {
        return Err(AppError::new(ErrorCode::UsernameTaken, "username is already taken"));
    }

    let new_user = NewUser {
        username,
        email,
        password_hash,
    };

    // A concurrent signup can still slip past the pre-checks; the
    // unique indexes are the source of truth.
    let user: User = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(&mut conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
                map_unique_violation(info.constraint_name())
            }
            other => AppError::Database(other),
        })?;

    // No email verification flow: profiles are verified at signup.
    let new_profile = NewUserProfile {
        user_id: user.id,
        profile_code: auth_service::generate_profile_code(),
        is_verified: true,
        profile_picture_url: req.profile_picture_url,
    };
    diesel::insert_into(user_profiles::table)
        .values(&new_profile)
        .execute(&mut conn)?;

    let token = token_service::create_access_token(
        user.id,
        &user.username,
        &souls_shared::middleware::jwt_secret(),
        state.config.jwt_access_ttl,
    )?;

    tracing::info!(user_id = %user.id, username = %user.username, "user signed up");

    Ok(Json(ApiResponse::ok_with_message(token, "Account created successfully!")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(err: AppError) -> ErrorCode {
        match err {
            AppError::Known { code, .. } => code,
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn email_index_collision_reports_email_taken() {
        let err = map_unique_violation(Some("users_email_key"));
        assert_eq!(code_of(err), ErrorCode::EmailAlreadyExists);
    }

    #[test]
    fn username_index_collision_reports_username_taken() {
        let err = map_unique_violation(Some("users_username_key"));
        assert_eq!(code_of(err), ErrorCode::UsernameTaken);
    }

    #[test]
    fn anonymous_collision_falls_back_to_combined_message() {
        let err = map_unique_violation(None);
        assert_eq!(code_of(err), ErrorCode::UsernameTaken);
    }
}
