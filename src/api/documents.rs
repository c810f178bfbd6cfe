/// Document, comment and category endpoints
use crate::{
    api::{
        extract::{Json, Path, Query},
        Pagination,
    },
    auth::AuthUser,
    content::{CreateDocument, DocumentPage, DocumentView, UpdateDocument},
    context::AppContext,
    db::{CategoryCount, Comment, Document},
    error::WikiResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route("/documents/popular", get(popular_documents))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route(
            "/documents/:id/comments",
            get(list_comments).post(add_comment),
        )
        .route("/comments/:id", delete(delete_comment))
        .route("/categories", get(list_categories))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    category: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PopularQuery {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    content: String,
}

async fn list_documents(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> WikiResult<Json<DocumentPage>> {
    let (limit, offset) = Pagination::new(query.page, query.per_page).limit_offset();
    let page = ctx
        .content
        .list_documents(query.category.as_deref(), limit, offset)
        .await?;
    Ok(Json(page))
}

async fn create_document(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateDocument>,
) -> WikiResult<(StatusCode, Json<Document>)> {
    let document = ctx.content.create_document(&user, req).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn get_document(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> WikiResult<Json<DocumentView>> {
    Ok(Json(ctx.content.get_document(id).await?))
}

async fn update_document(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDocument>,
) -> WikiResult<Json<Document>> {
    Ok(Json(ctx.content.update_document(&user, id, req).await?))
}

async fn delete_document(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> WikiResult<StatusCode> {
    ctx.content.delete_document(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn popular_documents(
    State(ctx): State<AppContext>,
    Query(query): Query<PopularQuery>,
) -> WikiResult<Json<Vec<Document>>> {
    let limit = query.limit.unwrap_or(10);
    Ok(Json(ctx.search.popular(limit).await?))
}

async fn list_comments(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> WikiResult<Json<Vec<Comment>>> {
    Ok(Json(ctx.content.list_comments(id).await?))
}

async fn add_comment(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> WikiResult<(StatusCode, Json<Comment>)> {
    let comment = ctx.content.add_comment(&user, id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> WikiResult<StatusCode> {
    ctx.content.delete_comment(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_categories(State(ctx): State<AppContext>) -> WikiResult<Json<Vec<CategoryCount>>> {
    Ok(Json(ctx.content.categories().await?))
}
