/// Admin manager: bootstrap, recovery and moderation
use crate::{
    account::{hash_password, verify_password},
    admin::{AdminAction, AdminReport, AdminStatus},
    config::ServerConfig,
    db::{DatabaseAdapter, NewUser, NewUserLog, SiteStats, User, UserLog},
    error::{WikiError, WikiResult},
    metrics,
    validation::sanitize_text,
};
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Length of generated temporary admin passwords
pub const CREDENTIALS_PASSWORD_LENGTH: usize = 16;

const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%^&*-_";

fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..CREDENTIALS_PASSWORD_LENGTH)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

/// Write bootstrap credentials readable by the owner only
async fn write_credentials(path: &Path, username: &str, password: &str) -> WikiResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let body = format!(
        "username: {}\npassword: {}\n\nChange this password after first login and delete this file.\n",
        username, password
    );

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;

    // A pre-existing file keeps its old mode through open()
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }

    file.write_all(body.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Admin service
pub struct AdminManager {
    db: Arc<dyn DatabaseAdapter>,
    config: Arc<ServerConfig>,
}

impl AdminManager {
    pub fn new(db: Arc<dyn DatabaseAdapter>, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Make sure at least one admin account exists
    ///
    /// Safe to call on every start: an existing admin leaves everything as is.
    pub async fn ensure_admin_exists(&self) -> WikiResult<AdminStatus> {
        let admins = self.db.list_admins().await?;
        if !admins.is_empty() {
            return Ok(AdminStatus::Existing {
                admins: admins.into_iter().map(|user| user.username).collect(),
            });
        }

        let settings = &self.config.admin;

        let existing = match self.db.find_user_by_username(&settings.username).await? {
            Some(user) => Some(user),
            None => self.db.find_user_by_identifier(&settings.email).await?,
        };

        if let Some(user) = existing {
            self.db.set_user_admin(user.id, true).await?;
            warn!("Promoted existing user '{}' to admin", user.username);
            return Ok(AdminStatus::Promoted {
                username: user.username,
            });
        }

        let (password, generated) = match &settings.password {
            Some(password) => (password.clone(), false),
            None => (generate_password(), true),
        };

        // The credentials file goes first so a failed write never leaves an
        // admin behind whose password nobody knows
        if generated {
            write_credentials(&settings.credentials_file, &settings.username, &password).await?;
        }

        let password_hash =
            hash_password(&password, self.config.authentication.bcrypt_cost).await?;
        let created = self
            .db
            .create_user(NewUser {
                username: settings.username.clone(),
                email: settings.email.trim().to_lowercase(),
                password_hash,
                is_admin: true,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                if generated {
                    if let Err(remove_err) =
                        tokio::fs::remove_file(&settings.credentials_file).await
                    {
                        warn!("Failed to remove unused credentials file: {}", remove_err);
                    }
                }
                return Err(e);
            }
        };

        let credentials_file = if generated {
            warn!(
                "Created admin '{}' with a temporary password; credentials written to {}",
                user.username,
                settings.credentials_file.display()
            );
            Some(settings.credentials_file.clone())
        } else {
            info!("Created admin '{}' from configured credentials", user.username);
            None
        };

        Ok(AdminStatus::Created {
            username: user.username,
            credentials_file,
        })
    }

    /// Report on admin accounts
    pub async fn check(&self) -> WikiResult<AdminReport> {
        let admins = self.db.list_admins().await?;
        Ok(AdminReport {
            admin_count: admins.len() as i64,
            admins: admins.into_iter().map(|user| user.username).collect(),
        })
    }

    /// True when `username` is an admin and `password` matches
    pub async fn verify(&self, username: &str, password: &str) -> WikiResult<bool> {
        match self.db.find_user_by_username(username).await? {
            Some(user) if user.is_admin => verify_password(password, &user.password_hash).await,
            _ => Ok(false),
        }
    }

    /// One-off token for an operator to quote during manual recovery
    pub fn generate_recovery_token(&self) -> String {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        let token = hex::encode(bytes);
        warn!("Admin recovery token generated: {}", token);
        token
    }

    pub async fn stats(&self) -> WikiResult<SiteStats> {
        self.db.site_stats().await
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> WikiResult<Vec<User>> {
        self.db.list_users(limit, offset).await
    }

    pub async fn list_logs(&self, limit: i64) -> WikiResult<Vec<UserLog>> {
        self.db.list_user_logs(limit.clamp(1, 500)).await
    }

    // ========== Moderation ==========

    pub async fn blacklist_user(
        &self,
        admin: &User,
        target_id: i64,
        reason: Option<String>,
    ) -> WikiResult<User> {
        self.apply(admin, target_id, AdminAction::Blacklist, reason).await
    }

    pub async fn unblacklist_user(
        &self,
        admin: &User,
        target_id: i64,
        reason: Option<String>,
    ) -> WikiResult<User> {
        self.apply(admin, target_id, AdminAction::Unblacklist, reason).await
    }

    pub async fn promote_user(
        &self,
        admin: &User,
        target_id: i64,
        reason: Option<String>,
    ) -> WikiResult<User> {
        self.apply(admin, target_id, AdminAction::Promote, reason).await
    }

    pub async fn demote_user(
        &self,
        admin: &User,
        target_id: i64,
        reason: Option<String>,
    ) -> WikiResult<User> {
        self.apply(admin, target_id, AdminAction::Demote, reason).await
    }

    /// Delete a user; their documents stay with no author
    pub async fn delete_user(
        &self,
        admin: &User,
        target_id: i64,
        reason: Option<String>,
    ) -> WikiResult<()> {
        let target = self.target(admin, target_id).await?;

        // The log row outlives the user, so name them in the reason
        let reason = match clean_reason(reason) {
            Some(reason) => format!("{} ({})", target.username, reason),
            None => target.username.clone(),
        };
        self.log(admin, &target, AdminAction::Delete, Some(reason)).await?;
        self.db.delete_user(target.id).await?;

        Ok(())
    }

    /// Run a user-level moderation action by name
    pub async fn perform(
        &self,
        admin: &User,
        target_id: i64,
        action: AdminAction,
        reason: Option<String>,
    ) -> WikiResult<Option<User>> {
        match action {
            AdminAction::Delete => {
                self.delete_user(admin, target_id, reason).await?;
                Ok(None)
            }
            other => self.apply(admin, target_id, other, reason).await.map(Some),
        }
    }

    async fn target(&self, admin: &User, target_id: i64) -> WikiResult<User> {
        if !admin.is_admin {
            return Err(WikiError::Authorization("Admin access required".to_string()));
        }
        if admin.id == target_id {
            return Err(WikiError::Validation(
                "Admins cannot moderate their own account".to_string(),
            ));
        }
        self.db
            .get_user(target_id)
            .await?
            .ok_or_else(|| WikiError::NotFound(format!("User {} not found", target_id)))
    }

    async fn apply(
        &self,
        admin: &User,
        target_id: i64,
        action: AdminAction,
        reason: Option<String>,
    ) -> WikiResult<User> {
        let target = self.target(admin, target_id).await?;

        match action {
            AdminAction::Blacklist => self.db.set_user_blacklisted(target.id, true).await?,
            AdminAction::Unblacklist => self.db.set_user_blacklisted(target.id, false).await?,
            AdminAction::Promote => self.db.set_user_admin(target.id, true).await?,
            AdminAction::Demote => self.db.set_user_admin(target.id, false).await?,
            AdminAction::Delete => {
                return Err(WikiError::Internal(
                    "delete is not a flag update".to_string(),
                ))
            }
        };

        self.log(admin, &target, action, clean_reason(reason)).await?;

        self.db
            .get_user(target.id)
            .await?
            .ok_or_else(|| WikiError::NotFound(format!("User {} not found", target.id)))
    }

    async fn log(
        &self,
        admin: &User,
        target: &User,
        action: AdminAction,
        reason: Option<String>,
    ) -> WikiResult<()> {
        self.db
            .insert_user_log(NewUserLog {
                admin_id: admin.id,
                target_user_id: Some(target.id),
                action: action.as_str().to_string(),
                reason,
            })
            .await?;

        metrics::record_admin_action(action.as_str());
        info!(
            admin = %admin.username,
            target = %target.username,
            action = action.as_str(),
            "admin action"
        );
        Ok(())
    }
}

fn clean_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|reason| sanitize_text(&reason))
        .filter(|reason| !reason.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseOptions, SqliteAdapter};

    async fn setup(password: Option<&str>, credentials: &Path) -> AdminManager {
        let db: Arc<dyn DatabaseAdapter> = Arc::new(
            SqliteAdapter::connect("sqlite::memory:", &DatabaseOptions::default())
                .await
                .unwrap(),
        );
        let mut config = ServerConfig::default();
        config.authentication.bcrypt_cost = 4;
        config.admin.password = password.map(str::to_string);
        config.admin.credentials_file = credentials.to_path_buf();
        AdminManager::new(db, Arc::new(config))
    }

    async fn plain_user(admin: &AdminManager, name: &str) -> User {
        admin
            .db
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: hash_password("password123", 4).await.unwrap(),
                is_admin: false,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(Some("configured-pass"), &dir.path().join("creds.txt")).await;

        let first = admin.ensure_admin_exists().await.unwrap();
        assert_eq!(
            first,
            AdminStatus::Created {
                username: "admin".to_string(),
                credentials_file: None,
            }
        );

        let second = admin.ensure_admin_exists().await.unwrap();
        assert!(matches!(second, AdminStatus::Existing { .. }));
        assert_eq!(admin.check().await.unwrap().admin_count, 1);
        assert!(admin.verify("admin", "configured-pass").await.unwrap());
        assert!(!admin.verify("admin", "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn test_existing_user_is_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(None, &dir.path().join("creds.txt")).await;
        plain_user(&admin, "admin").await;

        let status = admin.ensure_admin_exists().await.unwrap();
        assert_eq!(
            status,
            AdminStatus::Promoted {
                username: "admin".to_string()
            }
        );
        let report = admin.check().await.unwrap();
        assert_eq!(report.admins, vec!["admin".to_string()]);
        assert!(!dir.path().join("creds.txt").exists());
    }

    #[tokio::test]
    async fn test_generated_password_written_to_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("admin_credentials.txt");
        let admin = setup(None, &path).await;

        let status = admin.ensure_admin_exists().await.unwrap();
        assert!(matches!(
            status,
            AdminStatus::Created {
                credentials_file: Some(_),
                ..
            }
        ));

        let contents = std::fs::read_to_string(&path).unwrap();
        let password = contents
            .lines()
            .find_map(|line| line.strip_prefix("password: "))
            .unwrap();
        assert_eq!(password.chars().count(), CREDENTIALS_PASSWORD_LENGTH);
        assert!(admin.verify("admin", password).await.unwrap());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_unwritable_credentials_creates_no_admin() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let admin = setup(None, &blocker.join("creds.txt")).await;

        assert!(admin.ensure_admin_exists().await.is_err());
        assert_eq!(admin.check().await.unwrap().admin_count, 0);
        assert!(admin.db.find_user_by_username("admin").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_credentials_file_is_restricted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.txt");
        std::fs::write(&path, "stale").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_credentials(&path, "admin", "secret-pass").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("password: secret-pass"));
        assert!(!contents.contains("stale"));
    }

    #[tokio::test]
    async fn test_recovery_token_format() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(None, &dir.path().join("creds.txt")).await;
        let token = admin.generate_recovery_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, admin.generate_recovery_token());
    }

    #[tokio::test]
    async fn test_moderation_actions_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(Some("configured-pass"), &dir.path().join("creds.txt")).await;
        admin.ensure_admin_exists().await.unwrap();
        let root = admin.db.find_user_by_username("admin").await.unwrap().unwrap();
        let bob = plain_user(&admin, "bob").await;

        let updated = admin
            .blacklist_user(&root, bob.id, Some("spam".to_string()))
            .await
            .unwrap();
        assert!(updated.is_blacklisted);
        let updated = admin.unblacklist_user(&root, bob.id, None).await.unwrap();
        assert!(!updated.is_blacklisted);
        let updated = admin.promote_user(&root, bob.id, None).await.unwrap();
        assert!(updated.is_admin);
        let updated = admin.demote_user(&root, bob.id, None).await.unwrap();
        assert!(!updated.is_admin);
        admin.delete_user(&root, bob.id, None).await.unwrap();
        assert!(admin.db.get_user(bob.id).await.unwrap().is_none());

        let logs = admin.list_logs(50).await.unwrap();
        assert_eq!(logs.len(), 5);
        let mut actions: Vec<_> = logs.iter().map(|log| log.action.as_str()).collect();
        actions.sort_unstable();
        assert_eq!(
            actions,
            vec!["blacklist", "delete", "demote", "promote", "unblacklist"]
        );
        assert!(logs
            .iter()
            .any(|log| log.action == "blacklist" && log.reason.as_deref() == Some("spam")));
        assert!(logs.iter().all(|log| log.admin_id == Some(root.id)));
    }

    #[tokio::test]
    async fn test_admin_cannot_act_on_self() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(Some("configured-pass"), &dir.path().join("creds.txt")).await;
        admin.ensure_admin_exists().await.unwrap();
        let root = admin.db.find_user_by_username("admin").await.unwrap().unwrap();

        let err = admin.demote_user(&root, root.id, None).await.unwrap_err();
        assert!(matches!(err, WikiError::Validation(_)));
        let err = admin.delete_user(&root, root.id, None).await.unwrap_err();
        assert!(matches!(err, WikiError::Validation(_)));
        assert!(admin.list_logs(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(Some("configured-pass"), &dir.path().join("creds.txt")).await;
        admin.ensure_admin_exists().await.unwrap();
        let root = admin.db.find_user_by_username("admin").await.unwrap().unwrap();

        let err = admin.blacklist_user(&root, 9999, None).await.unwrap_err();
        assert!(matches!(err, WikiError::NotFound(_)));
    }
}
