use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String, // JWT ID for session management
}

impl Claims {
    pub fn new(user_id: Uuid, username: String, jwt_secret: &str) -> Result<(String, Self)> {
        let now = Utc::now();
        let exp = now + Duration::hours(24);
        let jti = Uuid::new_v4().to_string();

        let claims = Self {
            sub: user_id.to_string(),
            username,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt_secret.as_ref()),
        )?;

        Ok((token, claims))
    }

    pub fn verify(token: &str, jwt_secret: &str) -> Result<Self> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_ref()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[derive(Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub jti: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing authorization header".to_string()))?;

        let claims = Claims::verify(bearer.token(), &state.config.jwt_secret)?;

        // Check if session is still valid in Redis
        if let Some(stored_user_id) = state.redis.get_session(&claims.jti).await? {
            if stored_user_id != claims.sub {
                return Err(AppError::Authentication("Invalid session".to_string()));
            }
        } else {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            username: claims.username,
            jti: claims.jti,
        })
    }
}

// Optional auth user (for endpoints that work with or without auth)
#[derive(Debug)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(OptionalAuthUser(Some(user))),
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}

// Password hashing utilities
pub fn hash_password(password: &str) -> Result<String> {
    let cost = 12;
    bcrypt::hash(password, cost).map_err(AppError::from)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).map_err(AppError::from)
}

/// Password strength rules: minimum length plus at least one digit, one
/// uppercase letter and one special character. Returns every failed rule so
/// the caller can surface them together.
pub fn validate_password_strength(password: &str) -> Vec<String> {
    let mut messages = Vec::new();

    if password.len() < 8 {
        messages.push("Password must be at least 8 characters long.".to_string());
    }
    if !Regex::new(r"\d").unwrap().is_match(password) {
        messages.push("Password must contain at least one number.".to_string());
    }
    if !Regex::new(r"[A-Z]").unwrap().is_match(password) {
        messages.push("Password must contain at least one uppercase letter.".to_string());
    }
    if !Regex::new(r"[^A-Za-z0-9]").unwrap().is_match(password) {
        messages.push("Password must contain at least one special character.".to_string());
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("Sup3r$ecret").unwrap();
        assert!(verify_password("Sup3r$ecret", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn claims_roundtrip() {
        let user_id = Uuid::new_v4();
        let (token, claims) = Claims::new(user_id, "alice".to_string(), "test-secret").unwrap();

        let decoded = Claims::verify(&token, "test-secret").unwrap();
        assert_eq!(decoded.sub, user_id.to_string());
        assert_eq!(decoded.username, "alice");
        assert_eq!(decoded.jti, claims.jti);
    }

    #[test]
    fn claims_reject_wrong_secret() {
        let (token, _) = Claims::new(Uuid::new_v4(), "alice".to_string(), "test-secret").unwrap();
        assert!(Claims::verify(&token, "other-secret").is_err());
    }

    #[test]
    fn password_strength_accepts_strong_password() {
        assert!(validate_password_strength("Str0ng!pass").is_empty());
    }

    #[test]
    fn password_strength_reports_every_failed_rule() {
        let messages = validate_password_strength("abc");
        assert_eq!(messages.len(), 4);

        assert_eq!(
            validate_password_strength("lowercase1!"),
            vec!["Password must contain at least one uppercase letter.".to_string()]
        );
        assert_eq!(
            validate_password_strength("Uppercase!"),
            vec!["Password must contain at least one number.".to_string()]
        );
        assert_eq!(
            validate_password_strength("Uppercase1"),
            vec!["Password must contain at least one special character.".to_string()]
        );
    }
}
