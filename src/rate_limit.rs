/// Rate Limiting System
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{WikiError, WikiResult},
};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Authenticated callers get this multiple of the anonymous quota
const AUTHENTICATED_MULTIPLIER: u32 = 5;

fn quota(requests_per_second: u32, burst_size: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN))
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    anonymous: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let anonymous = quota(config.requests_per_second, config.burst_size);
        let authenticated = quota(
            config
                .requests_per_second
                .saturating_mul(AUTHENTICATED_MULTIPLIER),
            config.burst_size.saturating_mul(2),
        );

        Self {
            enabled: config.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(authenticated)),
            anonymous: Arc::new(GovernorLimiter::direct(anonymous)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check(&self, limiter: &DirectLimiter) -> WikiResult<()> {
        if !self.enabled {
            return Ok(());
        }
        limiter.check().map_err(|_| WikiError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }

    /// Check rate limit for a caller presenting credentials
    pub fn check_authenticated(&self) -> WikiResult<()> {
        self.check(&self.authenticated)
    }

    /// Check rate limit for an anonymous caller
    pub fn check_anonymous(&self) -> WikiResult<()> {
        self.check(&self.anonymous)
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let has_auth_header = request.headers().contains_key(AUTHORIZATION);

    let result = if has_auth_header {
        ctx.rate_limiter.check_authenticated()
    } else {
        ctx.rate_limiter.check_anonymous()
    };

    match result {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::debug!("Rate limit exceeded for {}", request.uri().path());
            e.into_response()
        }
    }
}
