pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod redis;
pub mod services;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post, put},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, redis::RedisClient, services::email_service::EmailService};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: Arc<RedisClient>,
    pub config: Arc<Config>,
    pub email_service: Arc<EmailService>,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .map(|origin| origin.parse::<HeaderValue>().unwrap())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/verify-email", post(handlers::auth::verify_email))
        .route(
            "/api/auth/resend-verification",
            post(handlers::auth::resend_verification),
        )
        .route(
            "/api/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        .route("/api/posts", get(handlers::posts::get_posts))
        .route("/api/search", get(handlers::search::search));

    // Protected routes
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Post routes
        .route("/api/posts", post(handlers::posts::create_post))
        .route("/api/posts/{post_id}", get(handlers::posts::get_post))
        .route("/api/posts/{post_id}", put(handlers::posts::update_post))
        .route("/api/posts/{post_id}", delete(handlers::posts::delete_post))
        .route("/api/posts/{post_id}/like", post(handlers::posts::like_post))
        .route(
            "/api/posts/{post_id}/downvote",
            post(handlers::posts::downvote_post),
        )
        // Comment routes
        .route(
            "/api/posts/{post_id}/comments",
            post(handlers::comments::create_comment),
        )
        .route(
            "/api/comments/{comment_id}/like",
            post(handlers::comments::like_comment),
        )
        .route(
            "/api/comments/{comment_id}/downvote",
            post(handlers::comments::downvote_comment),
        )
        // Profile routes
        .route("/api/users/{user_id}", get(handlers::users::get_profile))
        .route(
            "/api/users/me/profile",
            put(handlers::users::update_profile),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
