/// Database models shared by both backends
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_blacklisted: bool,
    pub created_at: DateTime<Utc>,
}

/// Values for a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Document record joined with its author's username
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub view_count: i64,
}

/// Values for a new document row
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_id: Option<i64>,
}

/// Partial document update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

/// Comment record joined with its author's username
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub document_id: i64,
    pub user_id: i64,
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Admin audit trail entry
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserLog {
    pub id: i64,
    pub admin_id: Option<i64>,
    pub target_user_id: Option<i64>,
    pub action: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values for a new audit trail entry
#[derive(Debug, Clone)]
pub struct NewUserLog {
    pub admin_id: i64,
    pub target_user_id: Option<i64>,
    pub action: String,
    pub reason: Option<String>,
}

/// Raw ranked search hit, before snippets are built
#[derive(Debug, Clone, FromRow)]
pub struct SearchRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub view_count: i64,
    pub relevance_score: i64,
}

/// Document title offered as a search suggestion
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TitleSuggestion {
    pub id: i64,
    pub title: String,
}

/// Category name with its document count
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub document_count: i64,
}

/// Site-wide counters for the admin dashboard
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct SiteStats {
    pub total_users: i64,
    pub total_admins: i64,
    pub blacklisted_users: i64,
    pub total_documents: i64,
    pub total_comments: i64,
    pub total_views: i64,
}
