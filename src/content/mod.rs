/// Wiki content: documents and their comments
///
/// Writes check that the acting user is the author or an admin, and drop every
/// cached search, suggestion, category and popularity result.
mod markdown;

pub use markdown::render_markdown;

use crate::{
    cache::{namespaces, CacheManager},
    db::{CategoryCount, Comment, DatabaseAdapter, Document, DocumentChanges, NewDocument, User},
    error::{WikiError, WikiResult},
    validation::{clean_required, sanitize_text},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_CATEGORY: &str = "General";
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CATEGORY_CHARS: usize = 100;
pub const MAX_COMMENT_CHARS: usize = 2000;
pub const MAX_CONTENT_CHARS: usize = 500_000;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Create document request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocument {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial document update request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocument {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

/// Single document with its rendered body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub content_html: String,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        let content_html = render_markdown(&document.content);
        Self {
            document,
            content_html,
        }
    }
}

/// One page of a document listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Clamp paging parameters to sane bounds
pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

fn may_modify(actor: &User, author_id: Option<i64>) -> bool {
    actor.is_admin || author_id == Some(actor.id)
}

fn clean_category(category: Option<&str>) -> WikiResult<String> {
    match category.map(sanitize_text) {
        Some(category) if !category.is_empty() => {
            clean_required("category", &category, MAX_CATEGORY_CHARS)
        }
        _ => Ok(DEFAULT_CATEGORY.to_string()),
    }
}

/// Document and comment service
pub struct ContentManager {
    db: Arc<dyn DatabaseAdapter>,
    cache: Arc<CacheManager>,
}

impl ContentManager {
    pub fn new(db: Arc<dyn DatabaseAdapter>, cache: Arc<CacheManager>) -> Self {
        Self { db, cache }
    }

    /// Drop every cached view derived from document content
    async fn invalidate(&self) {
        let mut cleared = 0;
        for namespace in [
            namespaces::SEARCH,
            namespaces::SUGGEST,
            namespaces::CATEGORIES,
            namespaces::POPULAR,
        ] {
            cleared += self.cache.invalidate_namespace(namespace).await;
        }
        debug!("Invalidated {} cached content entries", cleared);
    }

    // ========== Documents ==========

    /// Create a document authored by `author`
    pub async fn create_document(
        &self,
        author: &User,
        request: CreateDocument,
    ) -> WikiResult<Document> {
        let title = clean_required("title", &request.title, MAX_TITLE_CHARS)?;
        let content = clean_required("content", &request.content, MAX_CONTENT_CHARS)?;
        let category = clean_category(request.category.as_deref())?;

        let document = self
            .db
            .create_document(NewDocument {
                title,
                content,
                category,
                author_id: Some(author.id),
            })
            .await?;

        self.invalidate().await;
        info!(document_id = document.id, author = %author.username, "document created");

        Ok(document)
    }

    /// Fetch a document for reading; counts as a view
    pub async fn get_document(&self, id: i64) -> WikiResult<DocumentView> {
        self.db.increment_view_count(id).await?;
        let document = self
            .db
            .get_document(id)
            .await?
            .ok_or_else(|| WikiError::NotFound(format!("Document {} not found", id)))?;

        Ok(DocumentView::from(document))
    }

    /// Apply a partial update
    pub async fn update_document(
        &self,
        actor: &User,
        id: i64,
        request: UpdateDocument,
    ) -> WikiResult<Document> {
        let existing = self
            .db
            .get_document(id)
            .await?
            .ok_or_else(|| WikiError::NotFound(format!("Document {} not found", id)))?;

        if !may_modify(actor, existing.author_id) {
            return Err(WikiError::Authorization(
                "Only the author or an admin can edit this document".to_string(),
            ));
        }

        let changes = DocumentChanges {
            title: request
                .title
                .as_deref()
                .map(|title| clean_required("title", title, MAX_TITLE_CHARS))
                .transpose()?,
            content: request
                .content
                .as_deref()
                .map(|content| clean_required("content", content, MAX_CONTENT_CHARS))
                .transpose()?,
            category: request
                .category
                .as_deref()
                .map(|category| clean_category(Some(category)))
                .transpose()?,
        };

        let document = self
            .db
            .update_document(id, changes)
            .await?
            .ok_or_else(|| WikiError::NotFound(format!("Document {} not found", id)))?;

        self.invalidate().await;
        info!(document_id = id, editor = %actor.username, "document updated");

        Ok(document)
    }

    /// Delete a document and, through the schema, its comments
    pub async fn delete_document(&self, actor: &User, id: i64) -> WikiResult<()> {
        let existing = self
            .db
            .get_document(id)
            .await?
            .ok_or_else(|| WikiError::NotFound(format!("Document {} not found", id)))?;

        if !may_modify(actor, existing.author_id) {
            return Err(WikiError::Authorization(
                "Only the author or an admin can delete this document".to_string(),
            ));
        }

        self.db.delete_document(id).await?;
        self.invalidate().await;
        info!(document_id = id, actor = %actor.username, "document deleted");

        Ok(())
    }

    /// List documents, newest first, optionally within one category
    pub async fn list_documents(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> WikiResult<DocumentPage> {
        let (limit, offset) = clamp_page(limit, offset);
        let category = category
            .map(sanitize_text)
            .filter(|category| !category.is_empty());

        let documents = self
            .db
            .list_documents(category.as_deref(), limit, offset)
            .await?;
        let total = self.db.count_documents(category.as_deref()).await?;

        Ok(DocumentPage {
            documents,
            total,
            limit,
            offset,
        })
    }

    /// Distinct categories with document counts
    pub async fn categories(&self) -> WikiResult<Vec<CategoryCount>> {
        self.cache
            .cached(namespaces::CATEGORIES, "all", None, || {
                self.db.list_categories()
            })
            .await
    }

    // ========== Comments ==========

    pub async fn add_comment(
        &self,
        author: &User,
        document_id: i64,
        content: &str,
    ) -> WikiResult<Comment> {
        let content = clean_required("content", content, MAX_COMMENT_CHARS)?;

        if self.db.get_document(document_id).await?.is_none() {
            return Err(WikiError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }

        let comment = self
            .db
            .create_comment(document_id, author.id, &content)
            .await?;
        debug!(comment_id = comment.id, document_id, "comment added");

        Ok(comment)
    }

    /// Comments on a document, oldest first
    pub async fn list_comments(&self, document_id: i64) -> WikiResult<Vec<Comment>> {
        if self.db.get_document(document_id).await?.is_none() {
            return Err(WikiError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }
        self.db.list_comments(document_id).await
    }

    pub async fn delete_comment(&self, actor: &User, comment_id: i64) -> WikiResult<()> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| WikiError::NotFound(format!("Comment {} not found", comment_id)))?;

        if !may_modify(actor, Some(comment.user_id)) {
            return Err(WikiError::Authorization(
                "Only the author or an admin can delete this comment".to_string(),
            ));
        }

        self.db.delete_comment(comment_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::db::{DatabaseOptions, NewUser, SqliteAdapter};

    async fn setup() -> (ContentManager, Arc<dyn DatabaseAdapter>) {
        let db: Arc<dyn DatabaseAdapter> = Arc::new(
            SqliteAdapter::connect("sqlite::memory:", &DatabaseOptions::default())
                .await
                .unwrap(),
        );
        let cache = Arc::new(CacheManager::in_memory(&ServerConfig::default().cache));
        (ContentManager::new(db.clone(), cache), db)
    }

    async fn user(db: &Arc<dyn DatabaseAdapter>, name: &str, is_admin: bool) -> User {
        db.create_user(NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "x".to_string(),
            is_admin,
        })
        .await
        .unwrap()
    }

    fn doc(title: &str, category: Option<&str>) -> CreateDocument {
        CreateDocument {
            title: title.to_string(),
            content: "Some **markdown** body".to_string(),
            category: category.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_category_and_renders() {
        let (content, db) = setup().await;
        let alice = user(&db, "alice", false).await;

        let created = content
            .create_document(&alice, doc("  Intro  ", None))
            .await
            .unwrap();
        assert_eq!(created.title, "Intro");
        assert_eq!(created.category, DEFAULT_CATEGORY);

        let view = content.get_document(created.id).await.unwrap();
        assert_eq!(view.document.view_count, 1);
        assert_eq!(view.document.author_name.as_deref(), Some("alice"));
        assert!(view.content_html.contains("<strong>markdown</strong>"));
    }

    #[tokio::test]
    async fn test_title_validation() {
        let (content, db) = setup().await;
        let alice = user(&db, "alice", false).await;

        let err = content
            .create_document(&alice, doc("   ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Validation(_)));

        let long = "t".repeat(MAX_TITLE_CHARS + 1);
        let err = content
            .create_document(&alice, doc(&long, None))
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_only_author_or_admin_may_modify() {
        let (content, db) = setup().await;
        let alice = user(&db, "alice", false).await;
        let bob = user(&db, "bob", false).await;
        let root = user(&db, "root", true).await;

        let created = content
            .create_document(&alice, doc("Intro", Some("Basics")))
            .await
            .unwrap();

        let update = UpdateDocument {
            title: Some("Hijacked".to_string()),
            ..Default::default()
        };
        let err = content
            .update_document(&bob, created.id, update.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Authorization(_)));

        let updated = content
            .update_document(&root, created.id, update)
            .await
            .unwrap();
        assert_eq!(updated.title, "Hijacked");
        assert_eq!(updated.category, "Basics");

        let err = content
            .delete_document(&bob, created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Authorization(_)));
        content.delete_document(&alice, created.id).await.unwrap();

        let err = content.get_document(created.id).await.unwrap_err();
        assert!(matches!(err, WikiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deleting_document_removes_comments() {
        let (content, db) = setup().await;
        let alice = user(&db, "alice", false).await;
        let bob = user(&db, "bob", false).await;

        let created = content
            .create_document(&alice, doc("Intro", None))
            .await
            .unwrap();
        let first = content
            .add_comment(&bob, created.id, "first!")
            .await
            .unwrap();
        content
            .add_comment(&alice, created.id, "second")
            .await
            .unwrap();

        let comments = content.list_comments(created.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, first.id);
        assert_eq!(comments[0].author_name.as_deref(), Some("bob"));

        content.delete_document(&alice, created.id).await.unwrap();
        assert!(db.get_comment(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comment_rules() {
        let (content, db) = setup().await;
        let alice = user(&db, "alice", false).await;
        let bob = user(&db, "bob", false).await;

        let err = content.add_comment(&bob, 999, "hello").await.unwrap_err();
        assert!(matches!(err, WikiError::NotFound(_)));

        let created = content
            .create_document(&alice, doc("Intro", None))
            .await
            .unwrap();
        let long = "c".repeat(MAX_COMMENT_CHARS + 1);
        let err = content
            .add_comment(&bob, created.id, &long)
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Validation(_)));

        let comment = content
            .add_comment(&bob, created.id, "nice")
            .await
            .unwrap();
        let err = content
            .delete_comment(&alice, comment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Authorization(_)));
        content.delete_comment(&bob, comment.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_and_categories() {
        let (content, db) = setup().await;
        let alice = user(&db, "alice", false).await;

        for (title, category) in [("A", "Basics"), ("B", "Basics"), ("C", "Advanced")] {
            content
                .create_document(&alice, doc(title, Some(category)))
                .await
                .unwrap();
        }

        let page = content
            .list_documents(Some("Basics"), 10, 0)
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.documents.len(), 2);

        let categories = content.categories().await.unwrap();
        assert_eq!(categories.len(), 2);

        // Category list is refreshed after a write
        content
            .create_document(&alice, doc("D", Some("Howto")))
            .await
            .unwrap();
        assert_eq!(content.categories().await.unwrap().len(), 3);
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, -5), (1, 0));
        assert_eq!(clamp_page(1000, 20), (MAX_PAGE_SIZE, 20));
    }
}
