use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use souls_shared::errors::{AppError, AppResult, ErrorCode};
use souls_shared::types::api::ApiResponse;
use souls_shared::types::auth::AuthUser;
use souls_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{Like, NewLike, NewPost, Post};
use crate::schema::{comments, likes, posts, users};
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub photo_url: Option<String>,
}

// --- Response DTOs ---

#[derive(Debug, Serialize)]
pub struct FeedPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub photo_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct LikeToggleResponse {
    pub liked: bool,
    pub like_count: i64,
}

// --- Helpers ---

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LikeAction {
    Add,
    Remove,
}

/// Toggle semantics: a like exists, so this press removes it; no like
/// exists, so this press adds one.
pub(crate) fn resolve_like_toggle(existing: Option<&Like>) -> LikeAction {
    match existing {
        Some(_) => LikeAction::Remove,
        None => LikeAction::Add,
    }
}

// --- Handlers ---

/// GET /posts - paginated feed, newest first
pub async fn list_posts(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<FeedPost>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let total: i64 = posts::table.select(count_star()).first(&mut conn)?;

    let page: Vec<(Post, String)> = posts::table
        .inner_join(users::table)
        .order(posts::created_at.desc())
        .offset(i64::try_from(params.offset()).unwrap_or(i64::MAX))
        .limit(params.limit() as i64)
        .select((posts::all_columns, users::username))
        .load(&mut conn)?;

    let post_ids: Vec<Uuid> = page.iter().map(|(p, _)| p.id).collect();

    let like_counts: HashMap<Uuid, i64> = likes::table
        .filter(likes::post_id.eq_any(&post_ids))
        .group_by(likes::post_id)
        .select((likes::post_id, count_star()))
        .load::<(Uuid, i64)>(&mut conn)?
        .into_iter()
        .collect();

    let comment_counts: HashMap<Uuid, i64> = comments::table
        .filter(comments::post_id.eq_any(&post_ids))
        .group_by(comments::post_id)
        .select((comments::post_id, count_star()))
        .load::<(Uuid, i64)>(&mut conn)?
        .into_iter()
        .collect();

    let liked_by_me: Vec<Uuid> = likes::table
        .filter(likes::post_id.eq_any(&post_ids))
        .filter(likes::user_id.eq(user.id))
        .select(likes::post_id)
        .load(&mut conn)?;

    let items: Vec<FeedPost> = page
        .into_iter()
        .map(|(post, author_username)| FeedPost {
            like_count: like_counts.get(&post.id).copied().unwrap_or(0),
            comment_count: comment_counts.get(&post.id).copied().unwrap_or(0),
            liked_by_me: liked_by_me.contains(&post.id),
            id: post.id,
            author_id: post.author_id,
            author_username,
            title: post.title,
            content: post.content,
            photo_url: post.photo_url,
            created_at: post.created_at,
        })
        .collect();

    let paginated = Paginated::new(items, total as u64, &params);
    Ok(Json(ApiResponse::ok(paginated)))
}

/// POST /posts - create a post
pub async fn create_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Json<ApiResponse<Post>>> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "title and content are required"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let new_post = NewPost {
        author_id: user.id,
        title: req.title,
        content: req.content,
        photo_url: req.photo_url,
    };

    let post: Post = diesel::insert_into(posts::table)
        .values(&new_post)
        .get_result(&mut conn)?;

    tracing::info!(post_id = %post.id, author_id = %user.id, "post created");

    Ok(Json(ApiResponse::ok(post)))
}

/// POST /posts/:id/like - toggle: first call likes, second removes
pub async fn toggle_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeToggleResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let post_exists: bool = posts::table
        .find(post_id)
        .select(count_star())
        .first::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if !post_exists {
        return Err(AppError::new(ErrorCode::PostNotFound, "post not found"));
    }

    let existing: Option<Like> = likes::table
        .filter(likes::post_id.eq(post_id))
        .filter(likes::user_id.eq(user.id))
        .first(&mut conn)
        .optional()?;

    let liked = match resolve_like_toggle(existing.as_ref()) {
        LikeAction::Remove => {
            // existing is Some by construction of the action
            if let Some(like) = existing {
                diesel::delete(likes::table.find(like.id)).execute(&mut conn)?;
            }
            false
        }
        LikeAction::Add => {
            diesel::insert_into(likes::table)
                .values(&NewLike { post_id, user_id: user.id })
                .execute(&mut conn)?;
            true
        }
    };

    let like_count: i64 = likes::table
        .filter(likes::post_id.eq(post_id))
        .select(count_star())
        .first(&mut conn)?;

    Ok(Json(ApiResponse::ok(LikeToggleResponse { liked, like_count })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored_like(post_id: Uuid, user_id: Uuid) -> Like {
        Like {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn liking_twice_removes_the_like() {
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        // First press: no row yet, the like is added.
        assert_eq!(resolve_like_toggle(None), LikeAction::Add);

        // Second press sees the stored row and removes it.
        let row = stored_like(post_id, user_id);
        assert_eq!(resolve_like_toggle(Some(&row)), LikeAction::Remove);

        // Third press: the row is gone again, so the like comes back.
        assert_eq!(resolve_like_toggle(None), LikeAction::Add);
    }
}
