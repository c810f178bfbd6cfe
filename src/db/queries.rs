/// SQL shared by the SQLite and PostgreSQL adapters
///
/// Placeholders use the `$N` form, which both drivers accept. Booleans are
/// compared against `TRUE` and aggregates are cast to BIGINT so rows decode
/// into the same Rust types on either backend.

// ========== Users ==========

pub const INSERT_USER: &str = r#"
    INSERT INTO users (username, email, password_hash, is_admin, is_blacklisted, created_at)
    VALUES ($1, $2, $3, $4, FALSE, $5)
    RETURNING id
"#;

pub const GET_USER: &str = r#"
    SELECT id, username, email, password_hash, is_admin, is_blacklisted, created_at
    FROM users
    WHERE id = $1
"#;

pub const FIND_USER_BY_USERNAME: &str = r#"
    SELECT id, username, email, password_hash, is_admin, is_blacklisted, created_at
    FROM users
    WHERE username = $1
"#;

pub const FIND_USER_BY_IDENTIFIER: &str = r#"
    SELECT id, username, email, password_hash, is_admin, is_blacklisted, created_at
    FROM users
    WHERE username = $1 OR LOWER(email) = LOWER($1)
    ORDER BY id
    LIMIT 1
"#;

pub const COUNT_USERS_WITH_NAME_OR_EMAIL: &str = r#"
    SELECT COUNT(*) FROM users WHERE username = $1 OR LOWER(email) = LOWER($2)
"#;

pub const LIST_USERS: &str = r#"
    SELECT id, username, email, password_hash, is_admin, is_blacklisted, created_at
    FROM users
    ORDER BY id
    LIMIT $1 OFFSET $2
"#;

pub const LIST_ADMINS: &str = r#"
    SELECT id, username, email, password_hash, is_admin, is_blacklisted, created_at
    FROM users
    WHERE is_admin = TRUE
    ORDER BY id
"#;

pub const COUNT_ADMINS: &str = "SELECT COUNT(*) FROM users WHERE is_admin = TRUE";

pub const SET_USER_ADMIN: &str = "UPDATE users SET is_admin = $1 WHERE id = $2";

pub const SET_USER_BLACKLISTED: &str = "UPDATE users SET is_blacklisted = $1 WHERE id = $2";

pub const DELETE_USER: &str = "DELETE FROM users WHERE id = $1";

// ========== Documents ==========

pub const INSERT_DOCUMENT: &str = r#"
    INSERT INTO documents (title, content, category, author_id, created_at, updated_at, view_count)
    VALUES ($1, $2, $3, $4, $5, $5, 0)
    RETURNING id
"#;

pub const GET_DOCUMENT: &str = r#"
    SELECT d.id, d.title, d.content, d.category, d.author_id, u.username AS author_name,
           d.created_at, d.updated_at, d.view_count
    FROM documents d
    LEFT JOIN users u ON u.id = d.author_id
    WHERE d.id = $1
"#;

pub const INCREMENT_VIEW_COUNT: &str =
    "UPDATE documents SET view_count = view_count + 1 WHERE id = $1";

pub const UPDATE_DOCUMENT: &str = r#"
    UPDATE documents
    SET title = COALESCE($1, title),
        content = COALESCE($2, content),
        category = COALESCE($3, category),
        updated_at = $4
    WHERE id = $5
"#;

pub const DELETE_DOCUMENT: &str = "DELETE FROM documents WHERE id = $1";

pub const LIST_DOCUMENTS: &str = r#"
    SELECT d.id, d.title, d.content, d.category, d.author_id, u.username AS author_name,
           d.created_at, d.updated_at, d.view_count
    FROM documents d
    LEFT JOIN users u ON u.id = d.author_id
    ORDER BY d.updated_at DESC, d.id DESC
    LIMIT $1 OFFSET $2
"#;

pub const LIST_DOCUMENTS_IN_CATEGORY: &str = r#"
    SELECT d.id, d.title, d.content, d.category, d.author_id, u.username AS author_name,
           d.created_at, d.updated_at, d.view_count
    FROM documents d
    LEFT JOIN users u ON u.id = d.author_id
    WHERE d.category = $1
    ORDER BY d.updated_at DESC, d.id DESC
    LIMIT $2 OFFSET $3
"#;

pub const COUNT_DOCUMENTS: &str = "SELECT COUNT(*) FROM documents";

pub const COUNT_DOCUMENTS_IN_CATEGORY: &str = "SELECT COUNT(*) FROM documents WHERE category = $1";

pub const LIST_CATEGORIES: &str = r#"
    SELECT category, COUNT(*) AS document_count
    FROM documents
    GROUP BY category
    ORDER BY category
"#;

pub const POPULAR_DOCUMENTS: &str = r#"
    SELECT d.id, d.title, d.content, d.category, d.author_id, u.username AS author_name,
           d.created_at, d.updated_at, d.view_count
    FROM documents d
    LEFT JOIN users u ON u.id = d.author_id
    ORDER BY d.view_count DESC, d.id DESC
    LIMIT $1
"#;

// ========== Comments ==========

pub const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (document_id, user_id, content, created_at)
    VALUES ($1, $2, $3, $4)
    RETURNING id
"#;

pub const GET_COMMENT: &str = r#"
    SELECT c.id, c.document_id, c.user_id, u.username AS author_name, c.content, c.created_at
    FROM comments c
    LEFT JOIN users u ON u.id = c.user_id
    WHERE c.id = $1
"#;

pub const LIST_COMMENTS: &str = r#"
    SELECT c.id, c.document_id, c.user_id, u.username AS author_name, c.content, c.created_at
    FROM comments c
    LEFT JOIN users u ON u.id = c.user_id
    WHERE c.document_id = $1
    ORDER BY c.created_at ASC, c.id ASC
"#;

pub const DELETE_COMMENT: &str = "DELETE FROM comments WHERE id = $1";

// ========== Audit log ==========

pub const INSERT_USER_LOG: &str = r#"
    INSERT INTO user_logs (admin_id, target_user_id, action, reason, created_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

pub const LIST_USER_LOGS: &str = r#"
    SELECT id, admin_id, target_user_id, action, reason, created_at
    FROM user_logs
    ORDER BY created_at DESC, id DESC
    LIMIT $1
"#;

// ========== Stats ==========

pub const SITE_STATS: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM users) AS total_users,
        (SELECT COUNT(*) FROM users WHERE is_admin = TRUE) AS total_admins,
        (SELECT COUNT(*) FROM users WHERE is_blacklisted = TRUE) AS blacklisted_users,
        (SELECT COUNT(*) FROM documents) AS total_documents,
        (SELECT COUNT(*) FROM comments) AS total_comments,
        CAST((SELECT COALESCE(SUM(view_count), 0) FROM documents) AS BIGINT) AS total_views
"#;
