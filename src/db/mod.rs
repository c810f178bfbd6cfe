/// Database layer for the wiki
///
/// A single `DatabaseAdapter` trait fronts the persistence operations; the
/// SQLite and PostgreSQL implementations differ only in connection setup and
/// in how search matches text.
pub mod models;
mod queries;
#[macro_use]
mod shared;
pub mod postgres;
pub mod sqlite;

pub use models::*;
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

use crate::error::WikiResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Persistence operations used by the services
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Short backend name for logs and metrics
    fn backend_name(&self) -> &'static str;

    /// Run a trivial query to check connectivity
    async fn ping(&self) -> WikiResult<()>;

    // ========== Users ==========

    async fn create_user(&self, user: NewUser) -> WikiResult<User>;
    async fn get_user(&self, id: i64) -> WikiResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> WikiResult<Option<User>>;
    /// Look a user up by username or (case-insensitive) email
    async fn find_user_by_identifier(&self, identifier: &str) -> WikiResult<Option<User>>;
    async fn username_or_email_taken(&self, username: &str, email: &str) -> WikiResult<bool>;
    async fn list_users(&self, limit: i64, offset: i64) -> WikiResult<Vec<User>>;
    async fn list_admins(&self) -> WikiResult<Vec<User>>;
    async fn count_admins(&self) -> WikiResult<i64>;
    /// Returns false when no such user exists
    async fn set_user_admin(&self, id: i64, is_admin: bool) -> WikiResult<bool>;
    /// Returns false when no such user exists
    async fn set_user_blacklisted(&self, id: i64, blacklisted: bool) -> WikiResult<bool>;
    async fn delete_user(&self, id: i64) -> WikiResult<bool>;

    // ========== Documents ==========

    async fn create_document(&self, document: NewDocument) -> WikiResult<Document>;
    async fn get_document(&self, id: i64) -> WikiResult<Option<Document>>;
    async fn increment_view_count(&self, id: i64) -> WikiResult<()>;
    async fn update_document(
        &self,
        id: i64,
        changes: DocumentChanges,
    ) -> WikiResult<Option<Document>>;
    async fn delete_document(&self, id: i64) -> WikiResult<bool>;
    async fn list_documents(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> WikiResult<Vec<Document>>;
    async fn count_documents(&self, category: Option<&str>) -> WikiResult<i64>;
    async fn list_categories(&self) -> WikiResult<Vec<CategoryCount>>;
    async fn popular_documents(&self, limit: i64) -> WikiResult<Vec<Document>>;

    // ========== Comments ==========

    async fn create_comment(&self, document_id: i64, user_id: i64, content: &str)
        -> WikiResult<Comment>;
    async fn get_comment(&self, id: i64) -> WikiResult<Option<Comment>>;
    async fn list_comments(&self, document_id: i64) -> WikiResult<Vec<Comment>>;
    async fn delete_comment(&self, id: i64) -> WikiResult<bool>;

    // ========== Audit log ==========

    async fn insert_user_log(&self, entry: NewUserLog) -> WikiResult<()>;
    async fn list_user_logs(&self, limit: i64) -> WikiResult<Vec<UserLog>>;

    // ========== Search ==========

    /// Ranked search rows for one page plus the total number of matches
    async fn search_documents(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> WikiResult<(Vec<SearchRow>, i64)>;
    /// Titles containing `prefix`, titles starting with it first
    async fn suggest_titles(&self, prefix: &str, limit: i64) -> WikiResult<Vec<TitleSuggestion>>;

    // ========== Stats ==========

    async fn site_stats(&self) -> WikiResult<SiteStats>;
}

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Which backend a connection string selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Postgres,
}

impl BackendKind {
    pub fn from_url(url: &str) -> Self {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            BackendKind::Postgres
        } else {
            BackendKind::Sqlite
        }
    }
}

/// Opens the configured backend and prepares its schema
pub struct DatabaseManager;

impl DatabaseManager {
    /// Connect to the database named by `url` and run migrations
    pub async fn connect(
        url: &str,
        options: DatabaseOptions,
    ) -> WikiResult<Arc<dyn DatabaseAdapter>> {
        let adapter: Arc<dyn DatabaseAdapter> = match BackendKind::from_url(url) {
            BackendKind::Postgres => Arc::new(PostgresAdapter::connect(url, &options).await?),
            BackendKind::Sqlite => Arc::new(SqliteAdapter::connect(url, &options).await?),
        };

        adapter.ping().await?;
        info!("✓ Database ready ({})", adapter.backend_name());

        Ok(adapter)
    }
}

/// Build a `LIKE` pattern matching `needle` anywhere, with wildcards escaped
pub(crate) fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like(needle))
}

/// Build a `LIKE` pattern matching values that start with `needle`
pub(crate) fn prefix_pattern(needle: &str) -> String {
    format!("{}%", escape_like(needle))
}

/// Escape `LIKE` metacharacters using `\` as the escape character
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
