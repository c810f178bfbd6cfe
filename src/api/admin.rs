/// Admin API Endpoints
use crate::{
    admin::{AdminAction, AdminReport, ModerationRequest},
    api::{
        extract::{Json, Path, Query},
        Pagination,
    },
    auth::AdminUser,
    cache::CacheStats,
    context::AppContext,
    db::{SiteStats, User, UserLog},
    error::{WikiError, WikiResult},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/stats", get(get_stats))
        .route("/admin/check", get(check_admins))
        .route("/admin/cache", get(cache_stats))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/users/:id/:action", post(moderate_user))
        .route("/admin/logs", get(list_logs))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<i64>,
}

async fn get_stats(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
) -> WikiResult<Json<SiteStats>> {
    Ok(Json(ctx.admin.stats().await?))
}

async fn check_admins(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
) -> WikiResult<Json<AdminReport>> {
    Ok(Json(ctx.admin.check().await?))
}

async fn cache_stats(State(ctx): State<AppContext>, _admin: AdminUser) -> Json<CacheStats> {
    Json(ctx.cache.stats())
}

async fn list_users(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Query(page): Query<Pagination>,
) -> WikiResult<Json<Vec<User>>> {
    let (limit, offset) = page.limit_offset();
    Ok(Json(ctx.admin.list_users(limit, offset).await?))
}

async fn list_logs(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Query(query): Query<LogsQuery>,
) -> WikiResult<Json<Vec<UserLog>>> {
    Ok(Json(ctx.admin.list_logs(query.limit.unwrap_or(100)).await?))
}

/// Blacklist, unblacklist, promote or demote a user
async fn moderate_user(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path((id, action)): Path<(i64, String)>,
    body: Option<Json<ModerationRequest>>,
) -> WikiResult<Json<User>> {
    let action: AdminAction = action.parse()?;
    if action == AdminAction::Delete {
        return Err(WikiError::Validation(
            "Use DELETE /api/v1/admin/users/{id} to delete a user".to_string(),
        ));
    }
    let reason = body.and_then(|Json(req)| req.reason);
    let user = ctx
        .admin
        .perform(&admin, id, action, reason)
        .await?
        .ok_or_else(|| WikiError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(user))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    body: Option<Json<ModerationRequest>>,
) -> WikiResult<StatusCode> {
    let reason = body.and_then(|Json(req)| req.reason);
    ctx.admin.delete_user(&admin, id, reason).await?;
    Ok(StatusCode::NO_CONTENT)
}
