use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub like_count: i32,
    pub downvote_count: i32,
    pub published_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Comment {
    pub fn score(&self) -> i32 {
        self.like_count - self.downvote_count
    }
}

// Create comment request
#[derive(Debug, Validate, Deserialize)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub username: String,
}

// Comment response with nested replies
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub author: CommentAuthor,
    pub like_count: i32,
    pub downvote_count: i32,
    pub score: i32,
    pub user_liked: bool,
    pub user_downvoted: bool,
    pub published_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub replies: Vec<CommentResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_score_is_likes_minus_downvotes() {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            parent_id: None,
            content: "hello".to_string(),
            like_count: 5,
            downvote_count: 2,
            published_date: Utc::now(),
            modified_date: Utc::now(),
        };

        assert_eq!(comment.score(), 3);
    }
}
