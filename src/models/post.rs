use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::CommentResponse;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub published_date: DateTime<Utc>,
}

// Create post request
#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content: Option<String>,
}

// Update post request
#[derive(Debug, Validate, Deserialize)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostAuthor {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// Post list / search row: score is aggregated from the vote tables, never
// stored on the post itself
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: PostAuthor,
    pub score: i64,
    pub comment_count: i64,
    pub user_liked: bool,
    pub user_downvoted: bool,
    pub published_date: DateTime<Utc>,
}

// Post detail with the full comment thread
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: PostAuthor,
    pub score: i64,
    pub user_liked: bool,
    pub user_downvoted: bool,
    pub published_date: DateTime<Utc>,
    pub comments: Vec<CommentResponse>,
}
