/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod documents;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod search;

use crate::context::AppContext;
use axum::Router;
use serde::Deserialize;

pub const DEFAULT_PER_PAGE: i64 = 20;

/// Page-based paging parameters (`page` starts at 1)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn first_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: first_page(),
            per_page: default_per_page(),
        }
    }
}

impl Pagination {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or_else(first_page),
            per_page: per_page.unwrap_or_else(default_per_page),
        }
    }

    /// `(limit, offset)` for the requested page
    pub fn limit_offset(&self) -> (i64, i64) {
        let (limit, _) = crate::content::clamp_page(self.per_page, 0);
        let page = self.page.max(1);
        (limit, (page - 1).saturating_mul(limit))
    }
}

/// Build the `/api/v1` routes
///
/// Health and metrics routes live in [`health::routes`] and are mounted
/// separately so the rate limiter never applies to them.
pub fn routes() -> Router<AppContext> {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::routes())
                .merge(documents::routes())
                .merge(search::routes())
                .merge(admin::routes()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_limit_offset() {
        assert_eq!(Pagination::default().limit_offset(), (20, 0));
        assert_eq!(
            Pagination {
                page: 3,
                per_page: 10
            }
            .limit_offset(),
            (10, 20)
        );
        assert_eq!(
            Pagination {
                page: 0,
                per_page: 1000
            }
            .limit_offset(),
            (100, 0)
        );
    }
}
