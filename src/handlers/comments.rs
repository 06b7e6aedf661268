use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{CommentVoteResponse, CreateCommentRequest},
    services::{comment_service, vote_service},
};

use super::posts::check_vote_rate_limit;

pub async fn create_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    // Validate input
    payload.validate()?;

    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Please write something before posting.".to_string(),
        ));
    }

    let comment =
        comment_service::create_comment(&state.db, auth_user.user_id, post_id, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added",
            "comment_id": comment.id
        })),
    ))
}

pub async fn like_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentVoteResponse>> {
    check_vote_rate_limit(&state, auth_user.user_id).await?;

    let response =
        vote_service::toggle_comment_like(&state.db, auth_user.user_id, comment_id).await?;

    Ok(Json(response))
}

pub async fn downvote_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentVoteResponse>> {
    check_vote_rate_limit(&state, auth_user.user_id).await?;

    let response =
        vote_service::toggle_comment_downvote(&state.db, auth_user.user_id, comment_id).await?;

    Ok(Json(response))
}
