use std::collections::HashMap;

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Comment, CommentAuthor, CommentResponse, CreateCommentRequest},
};

/// Create a comment under the post's row lock so comment creation serializes
/// with concurrent vote toggles on the same post. An optional parent must be
/// a comment on the same post.
pub async fn create_comment(
    db: &PgPool,
    author_id: Uuid,
    post_id: Uuid,
    request: &CreateCommentRequest,
) -> Result<Comment> {
    let mut tx = db.begin().await?;

    let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

    if locked.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    if let Some(parent_id) = request.parent_id {
        let parent = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM comments WHERE id = $1 AND post_id = $2",
        )
        .bind(parent_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        if parent.is_none() {
            return Err(AppError::NotFound("Parent comment not found".to_string()));
        }
    }

    let now = Utc::now();

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (
            id, post_id, author_id, parent_id, content,
            like_count, downvote_count, published_date, modified_date
        )
        VALUES ($1, $2, $3, $4, $5, 0, 0, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(post_id)
    .bind(author_id)
    .bind(request.parent_id)
    .bind(request.content.trim())
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(comment)
}

/// Load the full thread for a post in one query and assemble the tree in
/// memory, oldest first at every level.
pub async fn get_post_comments(
    db: &PgPool,
    post_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<Vec<CommentResponse>> {
    let rows = sqlx::query(
        r#"
        SELECT
            c.id, c.post_id, c.parent_id, c.content,
            c.like_count, c.downvote_count, c.published_date, c.modified_date,
            u.id as author_id, u.username,
            EXISTS(SELECT 1 FROM comment_likes cl
                   WHERE cl.comment_id = c.id AND cl.user_id = $1) as user_liked,
            EXISTS(SELECT 1 FROM comment_downvotes cd
                   WHERE cd.comment_id = c.id AND cd.user_id = $1) as user_downvoted
        FROM comments c
        JOIN users u ON c.author_id = u.id
        WHERE c.post_id = $2
        ORDER BY c.published_date ASC
        "#,
    )
    .bind(viewer_id)
    .bind(post_id)
    .fetch_all(db)
    .await?;

    let comments = rows
        .into_iter()
        .map(|row| {
            let like_count: i32 = row.get("like_count");
            let downvote_count: i32 = row.get("downvote_count");

            CommentResponse {
                id: row.get("id"),
                post_id: row.get("post_id"),
                parent_id: row.get("parent_id"),
                content: row.get("content"),
                author: CommentAuthor {
                    id: row.get("author_id"),
                    username: row.get("username"),
                },
                like_count,
                downvote_count,
                score: like_count - downvote_count,
                user_liked: row.get("user_liked"),
                user_downvoted: row.get("user_downvoted"),
                published_date: row.get("published_date"),
                modified_date: row.get("modified_date"),
                replies: Vec::new(),
            }
        })
        .collect();

    Ok(build_comment_tree(comments))
}

/// Nest a flat, chronologically ordered comment list under its parents.
/// Comments whose parent is missing (not part of this post) surface at the
/// top level rather than disappearing.
pub fn build_comment_tree(comments: Vec<CommentResponse>) -> Vec<CommentResponse> {
    let ids: std::collections::HashSet<Uuid> = comments.iter().map(|c| c.id).collect();

    let mut children: HashMap<Uuid, Vec<CommentResponse>> = HashMap::new();
    let mut roots = Vec::new();

    for comment in comments {
        match comment.parent_id {
            Some(parent_id) if ids.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(comment);
            }
            _ => roots.push(comment),
        }
    }

    fn attach(node: &mut CommentResponse, children: &mut HashMap<Uuid, Vec<CommentResponse>>) {
        if let Some(mut replies) = children.remove(&node.id) {
            for reply in &mut replies {
                attach(reply, children);
            }
            node.replies = replies;
        }
    }

    for root in &mut roots {
        attach(root, &mut children);
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn comment(id: Uuid, parent_id: Option<Uuid>) -> CommentResponse {
        CommentResponse {
            id,
            post_id: Uuid::new_v4(),
            parent_id,
            content: "test".to_string(),
            author: CommentAuthor {
                id: Uuid::new_v4(),
                username: "alice".to_string(),
            },
            like_count: 0,
            downvote_count: 0,
            score: 0,
            user_liked: false,
            user_downvoted: false,
            published_date: Utc::now(),
            modified_date: Utc::now(),
            replies: Vec::new(),
        }
    }

    #[test]
    fn builds_nested_thread() {
        let root_id = Uuid::new_v4();
        let reply_id = Uuid::new_v4();
        let nested_id = Uuid::new_v4();
        let other_root_id = Uuid::new_v4();

        let tree = build_comment_tree(vec![
            comment(root_id, None),
            comment(reply_id, Some(root_id)),
            comment(other_root_id, None),
            comment(nested_id, Some(reply_id)),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, root_id);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].id, reply_id);
        assert_eq!(tree[0].replies[0].replies[0].id, nested_id);
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn orphaned_reply_surfaces_at_top_level() {
        let orphan = comment(Uuid::new_v4(), Some(Uuid::new_v4()));
        let tree = build_comment_tree(vec![orphan]);

        assert_eq!(tree.len(), 1);
        assert!(tree[0].replies.is_empty());
    }

    #[test]
    fn preserves_chronological_order_within_a_level() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let tree = build_comment_tree(vec![comment(first, None), comment(second, None)]);

        assert_eq!(tree[0].id, first);
        assert_eq!(tree[1].id, second);
    }
}
