/// Registration and login endpoints
use crate::{
    account::{LoginRequest, LoginResponse, Registration},
    api::extract::Json,
    auth::AuthUser,
    context::AppContext,
    db::User,
    error::WikiResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<Registration>,
) -> WikiResult<(StatusCode, Json<User>)> {
    let user = ctx.accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> WikiResult<Json<LoginResponse>> {
    let response = ctx.accounts.login(&req.identifier, &req.password).await?;
    Ok(Json(response))
}

async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
