use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::OptionalAuthUser,
    error::Result,
    services::post_service,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
    auth_user: OptionalAuthUser,
) -> Result<Json<Value>> {
    let query = params.q.as_deref().unwrap_or_default().trim().to_string();

    // A blank query returns no results
    if query.is_empty() {
        return Ok(Json(json!({
            "query": query,
            "results": [],
            "total": 0
        })));
    }

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(25).clamp(1, 100);
    let offset = (page - 1) * limit;

    let viewer_id = auth_user.0.as_ref().map(|user| user.user_id);

    let results = post_service::search_posts(&state.db, viewer_id, &query, limit, offset).await?;

    let total = post_service::search_posts_count(&state.db, &query).await?;

    Ok(Json(json!({
        "query": query,
        "results": results,
        "total": total
    })))
}
