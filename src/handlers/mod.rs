pub mod auth;
pub mod comments;
pub mod posts;
pub mod search;
pub mod users;
