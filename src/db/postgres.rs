/// PostgreSQL backend
///
/// Search admits rows matched by PostgreSQL text search
/// (`to_tsvector`/`plainto_tsquery`) as well as plain `ILIKE` substring
/// matches, and scores them with the same static ranking as SQLite.
use super::{
    contains_pattern, prefix_pattern, queries, shared::map_user_insert_error, CategoryCount,
    Comment, DatabaseAdapter, DatabaseOptions, Document, DocumentChanges, NewDocument, NewUser,
    NewUserLog, SearchRow, SiteStats, TitleSuggestion, User, UserLog,
};
use crate::error::{WikiError, WikiResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, error, info};

const SEARCH_DOCUMENTS: &str = r#"
    SELECT d.id, d.title, d.content, d.category, u.username AS author_name,
           d.created_at, d.view_count,
           CAST(CASE
               WHEN d.title ILIKE $1 ESCAPE '\' THEN 10
               WHEN d.category ILIKE $1 ESCAPE '\' THEN 5
               WHEN d.content ILIKE $1 ESCAPE '\' THEN 1
               ELSE 0
           END AS BIGINT) AS relevance_score
    FROM documents d
    LEFT JOIN users u ON u.id = d.author_id
    WHERE to_tsvector('simple', d.title || ' ' || d.category || ' ' || d.content)
              @@ plainto_tsquery('simple', $2)
       OR d.title ILIKE $1 ESCAPE '\'
       OR d.category ILIKE $1 ESCAPE '\'
       OR d.content ILIKE $1 ESCAPE '\'
    ORDER BY relevance_score DESC, d.created_at DESC, d.id DESC
    LIMIT $3 OFFSET $4
"#;

const COUNT_SEARCH_MATCHES: &str = r#"
    SELECT COUNT(*)
    FROM documents d
    WHERE to_tsvector('simple', d.title || ' ' || d.category || ' ' || d.content)
              @@ plainto_tsquery('simple', $2)
       OR d.title ILIKE $1 ESCAPE '\'
       OR d.category ILIKE $1 ESCAPE '\'
       OR d.content ILIKE $1 ESCAPE '\'
"#;

const SUGGEST_TITLES: &str = r#"
    SELECT id, title
    FROM documents
    WHERE title ILIKE $1 ESCAPE '\'
    ORDER BY CASE WHEN title ILIKE $2 ESCAPE '\' THEN 0 ELSE 1 END, title, id
    LIMIT $3
"#;

/// Pool tuning for PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresPoolSettings {
    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout: u64,

    /// Maximum lifetime of a connection in seconds
    pub max_lifetime: u64,

    /// Idle timeout for connections in seconds
    pub idle_timeout: u64,
}

impl Default for PostgresPoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 1,
            connect_timeout: 30,
            max_lifetime: 1800, // 30 minutes
            idle_timeout: 600,  // 10 minutes
        }
    }
}

/// PostgreSQL-backed adapter
#[derive(Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Connect to PostgreSQL and run migrations
    pub async fn connect(url: &str, options: &DatabaseOptions) -> WikiResult<Self> {
        let settings = PostgresPoolSettings::default();

        info!("Connecting to PostgreSQL database...");
        info!("  Max connections: {}", options.max_connections);

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(settings.min_connections.min(options.max_connections))
            .acquire_timeout(Duration::from_secs(settings.connect_timeout))
            .max_lifetime(Duration::from_secs(settings.max_lifetime))
            .idle_timeout(Duration::from_secs(settings.idle_timeout))
            .connect(url)
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                WikiError::Database(e)
            })?;

        info!("✓ PostgreSQL connection established");

        sqlx::migrate!("./migrations/postgres")
            .run(&pool)
            .await
            .map_err(|e| {
                error!("Failed to run migrations: {}", e);
                WikiError::Migration(e)
            })?;

        info!("✓ PostgreSQL migrations completed");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> WikiResult<(Vec<SearchRow>, i64)> {
        let pattern = contains_pattern(query);

        let rows = sqlx::query_as::<_, SearchRow>(SEARCH_DOCUMENTS)
            .bind(&pattern)
            .bind(query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(COUNT_SEARCH_MATCHES)
            .bind(&pattern)
            .bind(query)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn suggest(&self, prefix: &str, limit: i64) -> WikiResult<Vec<TitleSuggestion>> {
        let suggestions = sqlx::query_as::<_, TitleSuggestion>(SUGGEST_TITLES)
            .bind(contains_pattern(prefix))
            .bind(prefix_pattern(prefix))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(suggestions)
    }
}

impl_database_adapter!(PostgresAdapter, "postgres");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_settings_default() {
        let settings = PostgresPoolSettings::default();
        assert_eq!(settings.min_connections, 1);
        assert_eq!(settings.connect_timeout, 30);
        assert_eq!(settings.max_lifetime, 1800);
    }

    #[test]
    fn test_search_sql_uses_text_search_and_ilike() {
        assert!(SEARCH_DOCUMENTS.contains("plainto_tsquery"));
        assert!(SEARCH_DOCUMENTS.contains("ILIKE"));
        assert!(COUNT_SEARCH_MATCHES.contains("to_tsvector"));
    }
}
