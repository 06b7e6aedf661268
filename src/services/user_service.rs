use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{ProfileResponse, User, UserResponse},
};

pub async fn get_user_by_id(db: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

/// Profile page data: the user, their bio and activity counts (posts
/// written, likes given, comments written).
pub async fn get_profile(db: &PgPool, user_id: Uuid) -> Result<Option<ProfileResponse>> {
    let Some(user) = get_user_by_id(db, user_id).await? else {
        return Ok(None);
    };

    let bio = sqlx::query_scalar::<_, Option<String>>(
        "SELECT bio FROM profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .flatten();

    let post_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await?;

    let like_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await?;

    let comment_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE author_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await?;

    Ok(Some(ProfileResponse {
        user: UserResponse::from(user),
        bio,
        post_count,
        like_count,
        comment_count,
    }))
}

pub async fn update_bio(db: &PgPool, user_id: Uuid, bio: Option<&str>) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE profiles SET bio = $1, updated_at = NOW() WHERE user_id = $2",
    )
    .bind(bio)
    .bind(user_id)
    .execute(db)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }

    Ok(())
}
