use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{Post, PostAuthor, PostListResponse, PostResponse},
    services::comment_service,
};

// Shared SELECT for list/search rows: score and comment_count are count
// aggregations, user_liked/user_downvoted are EXISTS probes against the
// viewer ($1, NULL for anonymous callers)
const POST_ROW_COLUMNS: &str = r#"
    p.id, p.title, p.content, p.published_date,
    u.id as author_id, u.username, u.first_name, u.last_name,
    (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id)
        - (SELECT COUNT(*) FROM post_downvotes pd WHERE pd.post_id = p.id) as score,
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) as comment_count,
    EXISTS(SELECT 1 FROM post_likes pl WHERE pl.post_id = p.id AND pl.user_id = $1) as user_liked,
    EXISTS(SELECT 1 FROM post_downvotes pd WHERE pd.post_id = p.id AND pd.user_id = $1) as user_downvoted
"#;

pub async fn get_post_by_id_raw(db: &PgPool, post_id: Uuid) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(db)
        .await?;

    Ok(post)
}

pub async fn get_post_by_id(
    db: &PgPool,
    post_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<Option<PostResponse>> {
    let query = format!(
        r#"
        SELECT {}
        FROM posts p
        JOIN users u ON p.author_id = u.id
        WHERE p.id = $2
        "#,
        POST_ROW_COLUMNS
    );

    let row = sqlx::query(&query)
        .bind(viewer_id)
        .bind(post_id)
        .fetch_optional(db)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let comments = comment_service::get_post_comments(db, post_id, viewer_id).await?;

    Ok(Some(PostResponse {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author: PostAuthor {
            id: row.get("author_id"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
        },
        score: row.get("score"),
        user_liked: row.get("user_liked"),
        user_downvoted: row.get("user_downvoted"),
        published_date: row.get("published_date"),
        comments,
    }))
}

pub async fn get_posts(
    db: &PgPool,
    viewer_id: Option<Uuid>,
    limit: u32,
    offset: u32,
) -> Result<Vec<PostListResponse>> {
    let query = format!(
        r#"
        SELECT {}
        FROM posts p
        JOIN users u ON p.author_id = u.id
        ORDER BY p.published_date DESC
        LIMIT $2 OFFSET $3
        "#,
        POST_ROW_COLUMNS
    );

    let rows = sqlx::query(&query)
        .bind(viewer_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(db)
        .await?;

    Ok(rows.into_iter().map(|row| post_list_row(&row)).collect())
}

pub async fn get_posts_count(db: &PgPool) -> Result<u32> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(db)
        .await?;

    Ok(count as u32)
}

pub async fn search_posts(
    db: &PgPool,
    viewer_id: Option<Uuid>,
    search_term: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<PostListResponse>> {
    let query = format!(
        r#"
        SELECT {}
        FROM posts p
        JOIN users u ON p.author_id = u.id
        WHERE p.title ILIKE $2 OR p.content ILIKE $2
        ORDER BY p.published_date DESC
        LIMIT $3 OFFSET $4
        "#,
        POST_ROW_COLUMNS
    );

    let pattern = format!("%{}%", search_term);

    let rows = sqlx::query(&query)
        .bind(viewer_id)
        .bind(&pattern)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(db)
        .await?;

    Ok(rows.into_iter().map(|row| post_list_row(&row)).collect())
}

pub async fn search_posts_count(db: &PgPool, search_term: &str) -> Result<u32> {
    let pattern = format!("%{}%", search_term);

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM posts WHERE title ILIKE $1 OR content ILIKE $1",
    )
    .bind(&pattern)
    .fetch_one(db)
    .await?;

    Ok(count as u32)
}

fn post_list_row(row: &sqlx::postgres::PgRow) -> PostListResponse {
    PostListResponse {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author: PostAuthor {
            id: row.get("author_id"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
        },
        score: row.get("score"),
        comment_count: row.get("comment_count"),
        user_liked: row.get("user_liked"),
        user_downvoted: row.get("user_downvoted"),
        published_date: row.get("published_date"),
    }
}
