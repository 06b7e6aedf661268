use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{ProfileResponse, UpdateProfileRequest},
    services::user_service,
};

pub async fn get_profile(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileResponse>> {
    let profile = user_service::get_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    user_service::update_bio(&state.db, auth_user.user_id, payload.bio.as_deref()).await?;

    Ok(Json(json!({
        "message": "Profile updated successfully"
    })))
}
