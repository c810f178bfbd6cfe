/// Search endpoints
use crate::{
    api::{
        extract::{Json, Query},
        Pagination,
    },
    context::AppContext,
    db::TitleSuggestion,
    error::WikiResult,
    search::SearchResults,
};
use axum::{extract::State, routing::get, Router};
use serde::Deserialize;

const DEFAULT_SUGGESTIONS: i64 = 10;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/search", get(search))
        .route("/search/suggest", get(suggest))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SuggestQuery {
    #[serde(default)]
    q: String,
    limit: Option<i64>,
}

/// Always 200; a failed search reports itself in the `error` field
async fn search(
    State(ctx): State<AppContext>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResults> {
    let (limit, offset) = Pagination::new(query.page, query.per_page).limit_offset();
    Json(ctx.search.full_text_search(&query.q, limit, offset).await)
}

async fn suggest(
    State(ctx): State<AppContext>,
    Query(query): Query<SuggestQuery>,
) -> WikiResult<Json<Vec<TitleSuggestion>>> {
    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTIONS);
    Ok(Json(ctx.search.suggest(&query.q, limit).await?))
}
