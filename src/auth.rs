/// Authentication extractors
use crate::{api::middleware::extract_bearer_token, context::AppContext, db::User, error::WikiError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated user - rejects requests without a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = WikiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| WikiError::Authentication("Missing authorization header".to_string()))?;

        let user = state.accounts.authenticate(&token).await?;

        Ok(AuthUser(user))
    }
}

/// Admin user - requires a valid token belonging to an admin
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = WikiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            tracing::debug!("Admin access denied for {}", user.username);
            return Err(WikiError::Authorization("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}
