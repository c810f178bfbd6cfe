/// Backend-independent parts of the SQL adapters
use crate::error::WikiError;

/// `DatabaseAdapter` operations whose SQL is identical on every backend
///
/// Expands to the full trait impl for an adapter holding a `pool` field.
/// The adapter supplies `search` and `suggest` with its own SQL. Names are
/// resolved where the macro is invoked.
macro_rules! impl_database_adapter {
    ($adapter:ty, $backend:literal) => {
        #[async_trait]
        impl DatabaseAdapter for $adapter {
            fn backend_name(&self) -> &'static str {
                $backend
            }

            async fn search_documents(
                &self,
                query: &str,
                limit: i64,
                offset: i64,
            ) -> WikiResult<(Vec<SearchRow>, i64)> {
                self.search(query, limit, offset).await
            }

            async fn suggest_titles(
                &self,
                prefix: &str,
                limit: i64,
            ) -> WikiResult<Vec<TitleSuggestion>> {
                self.suggest(prefix, limit).await
            }

            async fn ping(&self) -> WikiResult<()> {
                sqlx::query("SELECT 1").execute(&self.pool).await?;
                Ok(())
            }

            async fn create_user(&self, user: NewUser) -> WikiResult<User> {
                let now = Utc::now();
                let id: i64 = sqlx::query_scalar(queries::INSERT_USER)
                    .bind(&user.username)
                    .bind(&user.email)
                    .bind(&user.password_hash)
                    .bind(user.is_admin)
                    .bind(now)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_user_insert_error)?;

                debug!("Created user {} ({})", user.username, id);

                Ok(User {
                    id,
                    username: user.username,
                    email: user.email,
                    password_hash: user.password_hash,
                    is_admin: user.is_admin,
                    is_blacklisted: false,
                    created_at: now,
                })
            }

            async fn get_user(&self, id: i64) -> WikiResult<Option<User>> {
                let user = sqlx::query_as::<_, User>(queries::GET_USER)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(user)
            }

            async fn find_user_by_username(&self, username: &str) -> WikiResult<Option<User>> {
                let user = sqlx::query_as::<_, User>(queries::FIND_USER_BY_USERNAME)
                    .bind(username)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(user)
            }

            async fn find_user_by_identifier(&self, identifier: &str) -> WikiResult<Option<User>> {
                let user = sqlx::query_as::<_, User>(queries::FIND_USER_BY_IDENTIFIER)
                    .bind(identifier)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(user)
            }

            async fn username_or_email_taken(&self, username: &str, email: &str) -> WikiResult<bool> {
                let count: i64 = sqlx::query_scalar(queries::COUNT_USERS_WITH_NAME_OR_EMAIL)
                    .bind(username)
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(count > 0)
            }

            async fn list_users(&self, limit: i64, offset: i64) -> WikiResult<Vec<User>> {
                let users = sqlx::query_as::<_, User>(queries::LIST_USERS)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(users)
            }

            async fn list_admins(&self) -> WikiResult<Vec<User>> {
                let users = sqlx::query_as::<_, User>(queries::LIST_ADMINS)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(users)
            }

            async fn count_admins(&self) -> WikiResult<i64> {
                let count: i64 = sqlx::query_scalar(queries::COUNT_ADMINS)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(count)
            }

            async fn set_user_admin(&self, id: i64, is_admin: bool) -> WikiResult<bool> {
                let result = sqlx::query(queries::SET_USER_ADMIN)
                    .bind(is_admin)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn set_user_blacklisted(&self, id: i64, blacklisted: bool) -> WikiResult<bool> {
                let result = sqlx::query(queries::SET_USER_BLACKLISTED)
                    .bind(blacklisted)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn delete_user(&self, id: i64) -> WikiResult<bool> {
                let result = sqlx::query(queries::DELETE_USER)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn create_document(&self, document: NewDocument) -> WikiResult<Document> {
                let id: i64 = sqlx::query_scalar(queries::INSERT_DOCUMENT)
                    .bind(&document.title)
                    .bind(&document.content)
                    .bind(&document.category)
                    .bind(document.author_id)
                    .bind(Utc::now())
                    .fetch_one(&self.pool)
                    .await?;

                self.get_document(id)
                    .await?
                    .ok_or_else(|| WikiError::Internal(format!("Document {} vanished after insert", id)))
            }

            async fn get_document(&self, id: i64) -> WikiResult<Option<Document>> {
                let document = sqlx::query_as::<_, Document>(queries::GET_DOCUMENT)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(document)
            }

            async fn increment_view_count(&self, id: i64) -> WikiResult<()> {
                sqlx::query(queries::INCREMENT_VIEW_COUNT)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }

            async fn update_document(
                &self,
                id: i64,
                changes: DocumentChanges,
            ) -> WikiResult<Option<Document>> {
                let result = sqlx::query(queries::UPDATE_DOCUMENT)
                    .bind(changes.title)
                    .bind(changes.content)
                    .bind(changes.category)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(&self.pool)
                    .await?;

                if result.rows_affected() == 0 {
                    return Ok(None);
                }

                self.get_document(id).await
            }

            async fn delete_document(&self, id: i64) -> WikiResult<bool> {
                let result = sqlx::query(queries::DELETE_DOCUMENT)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn list_documents(
                &self,
                category: Option<&str>,
                limit: i64,
                offset: i64,
            ) -> WikiResult<Vec<Document>> {
                let documents = match category {
                    Some(category) => {
                        sqlx::query_as::<_, Document>(queries::LIST_DOCUMENTS_IN_CATEGORY)
                            .bind(category)
                            .bind(limit)
                            .bind(offset)
                            .fetch_all(&self.pool)
                            .await?
                    }
                    None => {
                        sqlx::query_as::<_, Document>(queries::LIST_DOCUMENTS)
                            .bind(limit)
                            .bind(offset)
                            .fetch_all(&self.pool)
                            .await?
                    }
                };
                Ok(documents)
            }

            async fn count_documents(&self, category: Option<&str>) -> WikiResult<i64> {
                let count: i64 = match category {
                    Some(category) => {
                        sqlx::query_scalar(queries::COUNT_DOCUMENTS_IN_CATEGORY)
                            .bind(category)
                            .fetch_one(&self.pool)
                            .await?
                    }
                    None => {
                        sqlx::query_scalar(queries::COUNT_DOCUMENTS)
                            .fetch_one(&self.pool)
                            .await?
                    }
                };
                Ok(count)
            }

            async fn list_categories(&self) -> WikiResult<Vec<CategoryCount>> {
                let categories = sqlx::query_as::<_, CategoryCount>(queries::LIST_CATEGORIES)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(categories)
            }

            async fn popular_documents(&self, limit: i64) -> WikiResult<Vec<Document>> {
                let documents = sqlx::query_as::<_, Document>(queries::POPULAR_DOCUMENTS)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(documents)
            }

            async fn create_comment(
                &self,
                document_id: i64,
                user_id: i64,
                content: &str,
            ) -> WikiResult<Comment> {
                let id: i64 = sqlx::query_scalar(queries::INSERT_COMMENT)
                    .bind(document_id)
                    .bind(user_id)
                    .bind(content)
                    .bind(Utc::now())
                    .fetch_one(&self.pool)
                    .await?;

                self.get_comment(id)
                    .await?
                    .ok_or_else(|| WikiError::Internal(format!("Comment {} vanished after insert", id)))
            }

            async fn get_comment(&self, id: i64) -> WikiResult<Option<Comment>> {
                let comment = sqlx::query_as::<_, Comment>(queries::GET_COMMENT)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(comment)
            }

            async fn list_comments(&self, document_id: i64) -> WikiResult<Vec<Comment>> {
                let comments = sqlx::query_as::<_, Comment>(queries::LIST_COMMENTS)
                    .bind(document_id)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(comments)
            }

            async fn delete_comment(&self, id: i64) -> WikiResult<bool> {
                let result = sqlx::query(queries::DELETE_COMMENT)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn insert_user_log(&self, entry: NewUserLog) -> WikiResult<()> {
                sqlx::query(queries::INSERT_USER_LOG)
                    .bind(entry.admin_id)
                    .bind(entry.target_user_id)
                    .bind(&entry.action)
                    .bind(&entry.reason)
                    .bind(Utc::now())
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }

            async fn list_user_logs(&self, limit: i64) -> WikiResult<Vec<UserLog>> {
                let logs = sqlx::query_as::<_, UserLog>(queries::LIST_USER_LOGS)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(logs)
            }

            async fn site_stats(&self) -> WikiResult<SiteStats> {
                let stats = sqlx::query_as::<_, SiteStats>(queries::SITE_STATS)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(stats)
            }
        }
    };
}

/// Map unique-constraint failures on user rows to a conflict
pub(crate) fn map_user_insert_error(e: sqlx::Error) -> WikiError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            WikiError::Conflict("Username or email already registered".to_string())
        }
        _ => WikiError::Database(e),
    }
}
