use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub host: String,
    pub base_url: String,
    pub allowed_origins: Vec<String>,
    pub sendgrid_api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jwt_secret: env::var("JWT_SECRET")?,
            // Public URL used when building verification/reset links
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| format!("http://{}:{}", host, port)),
            port,
            host,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            sendgrid_api_key: env::var("SENDGRID_API_KEY").ok(),
            from_email: env::var("FROM_EMAIL").unwrap_or_else(|_| "noreply@ublog.app".to_string()),
            from_name: env::var("FROM_NAME").unwrap_or_else(|_| "UBlog".to_string()),
        })
    }
}
