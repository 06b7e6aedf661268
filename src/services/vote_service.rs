use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{CommentVoteResponse, PostVoteResponse},
};

// The toggle protocol is the same for every vote kind: lock the target row,
// delete the opposing vote, then delete-or-insert the requested one, all in
// one transaction so concurrent requests serialize on the row lock.

pub async fn toggle_post_like(db: &PgPool, user_id: Uuid, post_id: Uuid) -> Result<PostVoteResponse> {
    let mut tx = db.begin().await?;

    lock_post(&mut tx, post_id).await?;

    // Remove any downvote first
    sqlx::query("DELETE FROM post_downvotes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    // Toggle like
    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM post_likes WHERE post_id = $1 AND user_id = $2",
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let liked = match existing {
        Some(like_id) => {
            sqlx::query("DELETE FROM post_likes WHERE id = $1")
                .bind(like_id)
                .execute(&mut *tx)
                .await?;
            false
        }
        None => {
            sqlx::query(
                "INSERT INTO post_likes (id, user_id, post_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(post_id)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
            true
        }
    };

    let score = post_score(&mut tx, post_id).await?;

    tx.commit().await?;

    Ok(PostVoteResponse {
        liked,
        downvoted: false,
        score,
    })
}

pub async fn toggle_post_downvote(
    db: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<PostVoteResponse> {
    let mut tx = db.begin().await?;

    lock_post(&mut tx, post_id).await?;

    // Remove any like first
    sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    // Toggle downvote
    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM post_downvotes WHERE post_id = $1 AND user_id = $2",
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let downvoted = match existing {
        Some(downvote_id) => {
            sqlx::query("DELETE FROM post_downvotes WHERE id = $1")
                .bind(downvote_id)
                .execute(&mut *tx)
                .await?;
            false
        }
        None => {
            sqlx::query(
                "INSERT INTO post_downvotes (id, user_id, post_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(post_id)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
            true
        }
    };

    let score = post_score(&mut tx, post_id).await?;

    tx.commit().await?;

    Ok(PostVoteResponse {
        liked: false,
        downvoted,
        score,
    })
}

pub async fn toggle_comment_like(
    db: &PgPool,
    user_id: Uuid,
    comment_id: Uuid,
) -> Result<CommentVoteResponse> {
    let mut tx = db.begin().await?;

    lock_comment(&mut tx, comment_id).await?;

    // Remove any downvote first
    sqlx::query("DELETE FROM comment_downvotes WHERE comment_id = $1 AND user_id = $2")
        .bind(comment_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    // Toggle like
    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM comment_likes WHERE comment_id = $1 AND user_id = $2",
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let liked = match existing {
        Some(like_id) => {
            sqlx::query("DELETE FROM comment_likes WHERE id = $1")
                .bind(like_id)
                .execute(&mut *tx)
                .await?;
            false
        }
        None => {
            sqlx::query(
                "INSERT INTO comment_likes (id, user_id, comment_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(comment_id)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
            true
        }
    };

    let (like_count, downvote_count) = recount_comment_votes(&mut tx, comment_id).await?;

    tx.commit().await?;

    Ok(CommentVoteResponse {
        liked,
        downvoted: false,
        like_count,
        downvote_count,
        score: like_count - downvote_count,
    })
}

pub async fn toggle_comment_downvote(
    db: &PgPool,
    user_id: Uuid,
    comment_id: Uuid,
) -> Result<CommentVoteResponse> {
    let mut tx = db.begin().await?;

    lock_comment(&mut tx, comment_id).await?;

    // Remove any like first
    sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
        .bind(comment_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    // Toggle downvote
    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM comment_downvotes WHERE comment_id = $1 AND user_id = $2",
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let downvoted = match existing {
        Some(downvote_id) => {
            sqlx::query("DELETE FROM comment_downvotes WHERE id = $1")
                .bind(downvote_id)
                .execute(&mut *tx)
                .await?;
            false
        }
        None => {
            sqlx::query(
                "INSERT INTO comment_downvotes (id, user_id, comment_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(comment_id)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
            true
        }
    };

    let (like_count, downvote_count) = recount_comment_votes(&mut tx, comment_id).await?;

    tx.commit().await?;

    Ok(CommentVoteResponse {
        liked: false,
        downvoted,
        like_count,
        downvote_count,
        score: like_count - downvote_count,
    })
}

async fn lock_post(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, post_id: Uuid) -> Result<()> {
    let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?;

    if locked.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    Ok(())
}

async fn lock_comment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    comment_id: Uuid,
) -> Result<()> {
    let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
        .bind(comment_id)
        .fetch_optional(&mut **tx)
        .await?;

    if locked.is_none() {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    Ok(())
}

// Post score is never stored, always aggregated from the vote tables
async fn post_score(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, post_id: Uuid) -> Result<i64> {
    let score = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT (SELECT COUNT(*) FROM post_likes WHERE post_id = $1)
             - (SELECT COUNT(*) FROM post_downvotes WHERE post_id = $1)
        "#,
    )
    .bind(post_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(score)
}

// Cached comment counters are recomputed from the vote tables, not
// incremented, so they cannot drift
async fn recount_comment_votes(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    comment_id: Uuid,
) -> Result<(i32, i32)> {
    let counts = sqlx::query_as::<_, (i32, i32)>(
        r#"
        UPDATE comments
        SET like_count = (SELECT COUNT(*)::INT FROM comment_likes WHERE comment_id = $1),
            downvote_count = (SELECT COUNT(*)::INT FROM comment_downvotes WHERE comment_id = $1)
        WHERE id = $1
        RETURNING like_count, downvote_count
        "#,
    )
    .bind(comment_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(counts)
}
