use axum::extract::{Path, State};
use axum::Json;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::api::ApiResponse;
use souls_shared::types::auth::AuthUser;

use crate::models::{Comment, NewComment};
use crate::schema::{comments, posts, users};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn ensure_post_exists(conn: &mut diesel::pg::PgConnection, post_id: Uuid) -> AppResult<()> {
    let exists: bool = posts::table
        .find(post_id)
        .select(count_star())
        .first::<i64>(conn)
        .map(|c| c > 0)?;

    if !exists {
        return Err(AppError::new(ErrorCode::PostNotFound, "post not found"));
    }
    Ok(())
}

/// GET /posts/:id/comments - all comments for a post, oldest first
pub async fn list_comments(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<CommentView>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    ensure_post_exists(&mut conn, post_id)?;

    let rows: Vec<(Comment, String)> = comments::table
        .inner_join(users::table)
        .filter(comments::post_id.eq(post_id))
        .order(comments::created_at.asc())
        .select((comments::all_columns, users::username))
        .load(&mut conn)?;

    let views = rows
        .into_iter()
        .map(|(c, username)| CommentView {
            id: c.id,
            post_id: c.post_id,
            user_id: c.user_id,
            username,
            content: c.content,
            created_at: c.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(views)))
}

/// POST /posts/:id/comments - add a comment
pub async fn add_comment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyComment, "comment must not be empty"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    ensure_post_exists(&mut conn, post_id)?;

    let comment: Comment = diesel::insert_into(comments::table)
        .values(&NewComment {
            post_id,
            user_id: user.id,
            content,
        })
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(comment)))
}
