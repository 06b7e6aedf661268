use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostLike {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostDownvote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentLike {
    pub id: Uuid,
    pub user_id: Uuid,
    pub comment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentDownvote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub comment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// Result of a post vote toggle
#[derive(Debug, Serialize)]
pub struct PostVoteResponse {
    pub liked: bool,
    pub downvoted: bool,
    pub score: i64,
}

// Result of a comment vote toggle, with the recomputed cached counters
#[derive(Debug, Serialize)]
pub struct CommentVoteResponse {
    pub liked: bool,
    pub downvoted: bool,
    pub like_count: i32,
    pub downvote_count: i32,
    pub score: i32,
}
