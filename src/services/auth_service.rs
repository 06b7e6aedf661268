use chrono::{Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::Result, models::User};

/// Verification and reset links expire this long after they are issued.
pub const TOKEN_TTL_MINUTES: i64 = 15;

const TOKEN_LENGTH: usize = 64;

pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Look a user up the way the login form does: identifiers containing '@'
/// are emails, anything else is a username, both matched case-insensitively.
pub async fn find_user_by_identifier(db: &PgPool, identifier: &str) -> Result<Option<User>> {
    let query = if identifier.contains('@') {
        "SELECT * FROM users WHERE LOWER(email) = LOWER($1)"
    } else {
        "SELECT * FROM users WHERE LOWER(username) = LOWER($1)"
    };

    let user = sqlx::query_as::<_, User>(query)
        .bind(identifier)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn create_email_verification_token(db: &PgPool, user_id: Uuid) -> Result<String> {
    let token = generate_token();

    sqlx::query(
        r#"
        INSERT INTO email_verification_tokens (id, user_id, token, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&token)
    .bind(Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES))
    .bind(Utc::now())
    .execute(db)
    .await?;

    Ok(token)
}

/// Consume an unexpired, unused verification token, returning the owning
/// user's id. Returns None when the token is unknown, expired or spent.
pub async fn consume_email_verification_token(db: &PgPool, token: &str) -> Result<Option<Uuid>> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE email_verification_tokens
        SET used_at = NOW()
        WHERE token = $1 AND expires_at > NOW() AND used_at IS NULL
        RETURNING user_id
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    Ok(user_id)
}

pub async fn create_password_reset_token(db: &PgPool, user_id: Uuid) -> Result<String> {
    let token = generate_token();

    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (id, user_id, token, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&token)
    .bind(Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES))
    .bind(Utc::now())
    .execute(db)
    .await?;

    Ok(token)
}

pub async fn consume_password_reset_token(db: &PgPool, token: &str) -> Result<Option<Uuid>> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE password_reset_tokens
        SET used_at = NOW()
        WHERE token = $1 AND expires_at > NOW() AND used_at IS NULL
        RETURNING user_id
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_long_and_alphanumeric() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }
}
