use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, Claims, hash_password, validate_password_strength, verify_password},
    error::{AppError, Result},
    models::{DEFAULT_BIO, User, UserResponse},
    services::auth_service,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Please enter a username."))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentifierRequest {
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    // Validate input
    payload.validate()?;

    // Rate limiting
    let rate_limit_key = format!("register_attempt:{}", payload.email);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 5, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    if payload.password != payload.password_confirm {
        return Err(AppError::Validation(
            "The two password fields didn't match.".to_string(),
        ));
    }

    let strength_errors = validate_password_strength(&payload.password);
    if !strength_errors.is_empty() {
        return Err(AppError::Validation(strength_errors.join(" ")));
    }

    // Username uniqueness is case-sensitive
    let existing_username =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE username = $1")
            .bind(&payload.username)
            .fetch_optional(&state.db)
            .await?;

    if existing_username.is_some() {
        return Err(AppError::Conflict(
            "That username is already taken.".to_string(),
        ));
    }

    // Email uniqueness is case-insensitive
    let existing_email =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(&payload.email)
            .fetch_optional(&state.db)
            .await?;

    if existing_email.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists.".to_string(),
        ));
    }

    // Hash password
    let password_hash = hash_password(&payload.password)?;

    // Create user, inactive until the email is verified
    let user_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, is_active, date_joined)
        VALUES ($1, $2, $3, $4, false, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    // Create the profile with the default bio
    sqlx::query(
        r#"
        INSERT INTO profiles (id, user_id, bio, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(DEFAULT_BIO)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    // Send the verification email; delivery failure must not fail signup
    let token = auth_service::create_email_verification_token(&state.db, user_id).await?;

    let message = match state
        .email_service
        .send_verification_email(&user.email, &user.username, &token, &state.config.base_url)
        .await
    {
        Ok(()) => "Account created! Check your email to verify your address before logging in.",
        Err(e) => {
            tracing::warn!("Failed to send verification email to {}: {}", user.email, e);
            "Account created, but we could not send a verification email."
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": message,
            "user": UserResponse::from(user)
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    // Rate limiting
    let rate_limit_key = format!("login_attempt:{}", payload.identifier);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 10, 900)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let user = auth_service::find_user_by_identifier(&state.db, &payload.identifier)
        .await?
        .ok_or_else(|| {
            AppError::Authentication("Invalid email/username or password.".to_string())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Authentication(
            "Invalid email/username or password.".to_string(),
        ));
    }

    if !user.is_active {
        return Err(AppError::Authentication(
            "Your account is not active yet. Please verify your email before logging in."
                .to_string(),
        ));
    }

    // Update last login
    sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
        .bind(chrono::Utc::now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    // Generate JWT token
    let (token, claims) = Claims::new(user.id, user.username.clone(), &state.config.jwt_secret)?;

    // Store session in Redis
    state
        .redis
        .store_session(&claims.jti, &user.id.to_string(), 86400)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Login successful",
            "token": token,
            "user": UserResponse::from(user)
        })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<(StatusCode, Json<Value>)> {
    // Remove session from Redis
    state.redis.delete_session(&auth_user.jti).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Logout successful"
        })),
    ))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let user_id = auth_service::consume_email_verification_token(&state.db, &payload.token)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("The verification link is invalid or has expired.".to_string())
        })?;

    let already_active =
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?
            .unwrap_or(false);

    if already_active {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Your email is already verified. You can log in."
            })),
        ));
    }

    sqlx::query("UPDATE users SET is_active = true WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Your email has been verified. You can now log in."
        })),
    ))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<IdentifierRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let identifier = payload.identifier.trim();
    if identifier.is_empty() {
        return Err(AppError::BadRequest(
            "Enter your email or username.".to_string(),
        ));
    }

    // Rate limiting
    let rate_limit_key = format!("resend_verification:{}", identifier);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 3, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    // A missing account gets the same response as a real one
    let Some(user) = auth_service::find_user_by_identifier(&state.db, identifier).await? else {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "If an account exists, a verification link has been sent."
            })),
        ));
    };

    if user.is_active {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Your email is already verified. You can log in."
            })),
        ));
    }

    let token = auth_service::create_email_verification_token(&state.db, user.id).await?;

    let message = match state
        .email_service
        .send_verification_email(&user.email, &user.username, &token, &state.config.base_url)
        .await
    {
        Ok(()) => "Verification email sent. Please check your inbox.",
        Err(e) => {
            tracing::warn!("Failed to send verification email to {}: {}", user.email, e);
            "Could not send the verification email. Please try again later."
        }
    };

    Ok((StatusCode::OK, Json(json!({ "message": message }))))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<IdentifierRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let identifier = payload.identifier.trim();
    if identifier.is_empty() {
        return Err(AppError::BadRequest(
            "Enter your email or username.".to_string(),
        ));
    }

    // Rate limiting
    let rate_limit_key = format!("forgot_password:{}", identifier);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 3, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let Some(user) = auth_service::find_user_by_identifier(&state.db, identifier).await? else {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "If an account exists, a reset link has been sent."
            })),
        ));
    };

    if !user.is_active {
        return Err(AppError::BadRequest(
            "Your account isn't active yet. Verify your email first.".to_string(),
        ));
    }

    let token = auth_service::create_password_reset_token(&state.db, user.id).await?;

    let message = match state
        .email_service
        .send_password_reset_email(&user.email, &user.username, &token, &state.config.base_url)
        .await
    {
        Ok(()) => "We've sent a password reset link. It expires in 15 minutes.",
        Err(e) => {
            tracing::warn!("Failed to send reset email to {}: {}", user.email, e);
            "Could not send the reset email. Please try again later."
        }
    };

    Ok((StatusCode::OK, Json(json!({ "message": message }))))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if payload.new_password != payload.new_password_confirm {
        return Err(AppError::Validation("Passwords do not match.".to_string()));
    }

    let strength_errors = validate_password_strength(&payload.new_password);
    if !strength_errors.is_empty() {
        return Err(AppError::Validation(strength_errors.join(" ")));
    }

    let user_id = auth_service::consume_password_reset_token(&state.db, &payload.token)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("This password reset link is invalid or has expired.".to_string())
        })?;

    let password_hash = hash_password(&payload.new_password)?;

    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&password_hash)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Your password has been reset. You can now log in."
        })),
    ))
}
