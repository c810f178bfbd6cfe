/// SQLite backend
///
/// Search uses `LIKE`, which SQLite evaluates case-insensitively for ASCII.
use super::{
    contains_pattern, prefix_pattern, queries, shared::map_user_insert_error, CategoryCount,
    Comment, DatabaseAdapter, DatabaseOptions, Document, DocumentChanges, NewDocument, NewUser,
    NewUserLog, SearchRow, SiteStats, TitleSuggestion, User, UserLog,
};
use crate::error::{WikiError, WikiResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SEARCH_DOCUMENTS: &str = r#"
    SELECT d.id, d.title, d.content, d.category, u.username AS author_name,
           d.created_at, d.view_count,
           CASE
               WHEN d.title LIKE $1 ESCAPE '\' THEN 10
               WHEN d.category LIKE $1 ESCAPE '\' THEN 5
               WHEN d.content LIKE $1 ESCAPE '\' THEN 1
               ELSE 0
           END AS relevance_score
    FROM documents d
    LEFT JOIN users u ON u.id = d.author_id
    WHERE d.title LIKE $1 ESCAPE '\'
       OR d.category LIKE $1 ESCAPE '\'
       OR d.content LIKE $1 ESCAPE '\'
    ORDER BY relevance_score DESC, d.created_at DESC, d.id DESC
    LIMIT $2 OFFSET $3
"#;

const COUNT_SEARCH_MATCHES: &str = r#"
    SELECT COUNT(*)
    FROM documents d
    WHERE d.title LIKE $1 ESCAPE '\'
       OR d.category LIKE $1 ESCAPE '\'
       OR d.content LIKE $1 ESCAPE '\'
"#;

const SUGGEST_TITLES: &str = r#"
    SELECT id, title
    FROM documents
    WHERE title LIKE $1 ESCAPE '\'
    ORDER BY CASE WHEN title LIKE $2 ESCAPE '\' THEN 0 ELSE 1 END, title, id
    LIMIT $3
"#;

/// SQLite-backed adapter
#[derive(Clone)]
pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Open (creating if missing) the database at `url` and run migrations
    ///
    /// Accepts `sqlite://path`, `sqlite::memory:` or a bare file path.
    pub async fn connect(url: &str, options: &DatabaseOptions) -> WikiResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let connect_options = if url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(url)?
        } else {
            SqliteConnectOptions::new().filename(url)
        };

        if !in_memory {
            // Ensure parent directory exists
            if let Some(parent) = connect_options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let connect_options = connect_options
            .create_if_missing(true)
            .journal_mode(if in_memory {
                SqliteJournalMode::Memory
            } else if options.enable_wal {
                SqliteJournalMode::Wal
            } else {
                SqliteJournalMode::Delete
            })
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to `:memory:` is a separate database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(options.max_connections)
        };

        let pool = pool_options.connect_with(connect_options).await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running migrations on it
    pub async fn from_pool(pool: SqlitePool) -> WikiResult<Self> {
        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        info!("✓ SQLite migrations completed");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
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
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(COUNT_SEARCH_MATCHES)
            .bind(&pattern)
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

impl_database_adapter!(SqliteAdapter, "sqlite");

#[cfg(test)]
mod tests {
    use super::*;

    async fn adapter() -> SqliteAdapter {
        SqliteAdapter::connect("sqlite::memory:", &DatabaseOptions::default())
            .await
            .unwrap()
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "hash".to_string(),
            is_admin: false,
        }
    }

    fn new_document(title: &str, content: &str, category: &str, author: i64) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            author_id: Some(author),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = adapter().await;
        let alice = db.create_user(new_user("alice")).await.unwrap();

        let by_name = db.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);
        assert!(!by_name.is_admin);
        assert!(!by_name.is_blacklisted);

        let by_email = db
            .find_user_by_identifier("ALICE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, alice.id);

        assert!(db.username_or_email_taken("alice", "x@y.z").await.unwrap());
        assert!(!db.username_or_email_taken("bob", "bob@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_user_is_conflict() {
        let db = adapter().await;
        db.create_user(new_user("alice")).await.unwrap();

        let err = db.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, WikiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_admin_and_blacklist_flags() {
        let db = adapter().await;
        let user = db.create_user(new_user("carol")).await.unwrap();

        assert_eq!(db.count_admins().await.unwrap(), 0);
        assert!(db.set_user_admin(user.id, true).await.unwrap());
        assert_eq!(db.count_admins().await.unwrap(), 1);
        assert_eq!(db.list_admins().await.unwrap()[0].username, "carol");

        assert!(db.set_user_blacklisted(user.id, true).await.unwrap());
        assert!(db.get_user(user.id).await.unwrap().unwrap().is_blacklisted);

        assert!(!db.set_user_admin(9999, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let db = adapter().await;
        let author = db.create_user(new_user("writer")).await.unwrap();

        let doc = db
            .create_document(new_document("ROS2 Intro", "Nodes and topics", "Basics", author.id))
            .await
            .unwrap();
        assert_eq!(doc.author_name.as_deref(), Some("writer"));
        assert_eq!(doc.view_count, 0);

        db.increment_view_count(doc.id).await.unwrap();
        db.increment_view_count(doc.id).await.unwrap();
        assert_eq!(db.get_document(doc.id).await.unwrap().unwrap().view_count, 2);

        let updated = db
            .update_document(
                doc.id,
                DocumentChanges {
                    category: Some("Advanced".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.category, "Advanced");
        assert_eq!(updated.title, "ROS2 Intro");

        assert!(db
            .update_document(9999, DocumentChanges::default())
            .await
            .unwrap()
            .is_none());

        assert_eq!(db.count_documents(None).await.unwrap(), 1);
        assert_eq!(db.count_documents(Some("Basics")).await.unwrap(), 0);
        assert!(db.delete_document(doc.id).await.unwrap());
        assert!(db.get_document(doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comments_cascade_with_document() {
        let db = adapter().await;
        let author = db.create_user(new_user("writer")).await.unwrap();
        let doc = db
            .create_document(new_document("Doc", "Body", "General", author.id))
            .await
            .unwrap();

        let first = db.create_comment(doc.id, author.id, "first").await.unwrap();
        db.create_comment(doc.id, author.id, "second").await.unwrap();
        assert_eq!(first.author_name.as_deref(), Some("writer"));

        let comments = db.list_comments(doc.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "first");

        db.delete_document(doc.id).await.unwrap();
        assert!(db.get_comment(first.id).await.unwrap().is_none());
        assert!(db.list_comments(doc.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_categories_and_stats() {
        let db = adapter().await;
        let author = db.create_user(new_user("writer")).await.unwrap();
        db.create_document(new_document("A", "x", "Basics", author.id))
            .await
            .unwrap();
        db.create_document(new_document("B", "x", "Basics", author.id))
            .await
            .unwrap();
        let c = db
            .create_document(new_document("C", "x", "Tools", author.id))
            .await
            .unwrap();
        db.increment_view_count(c.id).await.unwrap();

        let categories = db.list_categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].category, "Basics");
        assert_eq!(categories[0].document_count, 2);

        let popular = db.popular_documents(1).await.unwrap();
        assert_eq!(popular[0].id, c.id);

        let stats = db.site_stats().await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.total_views, 1);
    }

    #[tokio::test]
    async fn test_search_scores_and_escaping() {
        let db = adapter().await;
        let author = db.create_user(new_user("writer")).await.unwrap();
        db.create_document(new_document("ROS2 Intro", "text", "Basics", author.id))
            .await
            .unwrap();
        db.create_document(new_document("Launch", "text", "ros2-tools", author.id))
            .await
            .unwrap();
        db.create_document(new_document("Params", "uses ros2 params", "Misc", author.id))
            .await
            .unwrap();
        db.create_document(new_document("Discount", "save 100% now", "Misc", author.id))
            .await
            .unwrap();

        let (rows, total) = db.search_documents("ros2", 10, 0).await.unwrap();
        assert_eq!(total, 3);
        let scores: Vec<i64> = rows.iter().map(|r| r.relevance_score).collect();
        assert_eq!(scores, vec![10, 5, 1]);

        let (rows, total) = db.search_documents("0%", 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title, "Discount");

        let (rows, _) = db.search_documents("_", 10, 0).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_titles_prefers_prefix() {
        let db = adapter().await;
        let author = db.create_user(new_user("writer")).await.unwrap();
        db.create_document(new_document("Intro to Nav2", "x", "Nav", author.id))
            .await
            .unwrap();
        db.create_document(new_document("Nav2 Basics", "x", "Nav", author.id))
            .await
            .unwrap();

        let suggestions = db.suggest_titles("nav2", 10).await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].title, "Nav2 Basics");
    }

    #[tokio::test]
    async fn test_user_logs() {
        let db = adapter().await;
        let admin = db.create_user(new_user("root")).await.unwrap();
        let target = db.create_user(new_user("spammer")).await.unwrap();

        db.insert_user_log(NewUserLog {
            admin_id: admin.id,
            target_user_id: Some(target.id),
            action: "blacklist".to_string(),
            reason: Some("spam".to_string()),
        })
        .await
        .unwrap();

        let logs = db.list_user_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "blacklist");
        assert_eq!(logs[0].target_user_id, Some(target.id));

        db.delete_user(target.id).await.unwrap();
        let logs = db.list_user_logs(10).await.unwrap();
        assert_eq!(logs[0].target_user_id, None);
    }
}
