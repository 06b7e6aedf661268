use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::{AppError, Result},
    models::{CreatePostRequest, Post, PostResponse, PostVoteResponse, UpdatePostRequest},
    services::{post_service, vote_service},
};

#[derive(Debug, Deserialize)]
pub struct GetPostsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn create_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    // Validate input
    payload.validate()?;

    // Create post
    let post_id = Uuid::new_v4();

    let _post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, title, content, author_id, published_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(post_id)
    .bind(&payload.title)
    .bind(payload.content.as_deref().unwrap_or_default())
    .bind(auth_user.user_id)
    .bind(chrono::Utc::now())
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully",
            "post_id": post_id
        })),
    ))
}

pub async fn get_posts(
    State(state): State<AppState>,
    Query(params): Query<GetPostsQuery>,
    auth_user: OptionalAuthUser,
) -> Result<Json<Value>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(25).clamp(1, 100); // Max 100 per page
    let offset = (page - 1) * limit;

    let viewer_id = auth_user.0.as_ref().map(|user| user.user_id);

    let posts = post_service::get_posts(&state.db, viewer_id, limit, offset).await?;

    let total_count = post_service::get_posts_count(&state.db).await?;

    Ok(Json(json!({
        "posts": posts,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total_count,
            "pages": (total_count + limit - 1) / limit
        }
    })))
}

pub async fn get_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostResponse>> {
    let post = post_service::get_post_by_id(&state.db, post_id, Some(auth_user.user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    // Check if post exists and user owns it
    let post = post_service::get_post_by_id_raw(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.author_id != auth_user.user_id {
        return Err(AppError::Authorization(
            "Can only edit your own posts".to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE posts
        SET title = COALESCE($1, title),
            content = COALESCE($2, content)
        WHERE id = $3
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.content)
    .bind(post_id)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({
        "message": "Post updated successfully"
    })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Value>> {
    // Check if post exists and user owns it
    let post = post_service::get_post_by_id_raw(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.author_id != auth_user.user_id {
        return Err(AppError::Authorization(
            "Can only delete your own posts".to_string(),
        ));
    }

    // Votes and comments go with the post
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "message": "Post deleted successfully"
    })))
}

pub async fn like_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostVoteResponse>> {
    check_vote_rate_limit(&state, auth_user.user_id).await?;

    let response = vote_service::toggle_post_like(&state.db, auth_user.user_id, post_id).await?;

    Ok(Json(response))
}

pub async fn downvote_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostVoteResponse>> {
    check_vote_rate_limit(&state, auth_user.user_id).await?;

    let response =
        vote_service::toggle_post_downvote(&state.db, auth_user.user_id, post_id).await?;

    Ok(Json(response))
}

// 100 votes per hour, shared across posts and comments
pub(crate) async fn check_vote_rate_limit(state: &AppState, user_id: Uuid) -> Result<()> {
    let rate_limit_key = format!("vote:{}", user_id);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 100, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    Ok(())
}
