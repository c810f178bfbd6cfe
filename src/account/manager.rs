/// Account manager: registration, login and token handling
use crate::{
    account::{hash_password, verify_password, Claims, LoginResponse, Registration},
    config::ServerConfig,
    db::{DatabaseAdapter, NewUser, User},
    error::{WikiError, WikiResult},
    validation::{self, PasswordPolicy},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

/// Account manager service
pub struct AccountManager {
    db: Arc<dyn DatabaseAdapter>,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: Arc<dyn DatabaseAdapter>, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::from(&self.config.password_policy)
    }

    /// Register a new (non-admin) user
    pub async fn register(&self, registration: Registration) -> WikiResult<User> {
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_lowercase();
        let registration = Registration {
            username,
            email,
            password: registration.password,
        };

        registration.validate()?;
        validation::validate_username(&registration.username)
            .map_err(validation::into_wiki_error)?;
        self.password_policy()
            .check(&registration.password)
            .map_err(validation::into_wiki_error)?;

        if self
            .db
            .username_or_email_taken(&registration.username, &registration.email)
            .await?
        {
            return Err(WikiError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(
            &registration.password,
            self.config.authentication.bcrypt_cost,
        )
        .await?;

        let user = self
            .db
            .create_user(NewUser {
                username: registration.username,
                email: registration.email,
                password_hash,
                is_admin: false,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "user registered");

        Ok(user)
    }

    /// Check credentials and issue an access token
    pub async fn login(&self, identifier: &str, password: &str) -> WikiResult<LoginResponse> {
        let user = self
            .db
            .find_user_by_identifier(identifier.trim())
            .await?
            .ok_or_else(|| WikiError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(password, &user.password_hash).await? {
            warn!(username = %user.username, "failed login");
            return Err(WikiError::Authentication("Invalid credentials".to_string()));
        }

        if user.is_blacklisted {
            return Err(WikiError::Authorization(
                "Account has been blacklisted".to_string(),
            ));
        }

        let access_token = self.issue_token(&user)?;
        let expires_in = self.config.authentication.token_ttl_hours.saturating_mul(3600);

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        })
    }

    /// Sign an access token for a user
    pub fn issue_token(&self, user: &User) -> WikiResult<String> {
        let now = Utc::now();
        let expires_at = Duration::try_hours(self.config.authentication.token_ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| WikiError::Internal("Token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.secret_key.as_bytes()),
        )
        .map_err(|e| WikiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token's signature and expiry
    pub fn verify_token(&self, token: &str) -> WikiResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.authentication.secret_key.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| WikiError::Authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Resolve a token to its (still existing, not blacklisted) user
    pub async fn authenticate(&self, token: &str) -> WikiResult<User> {
        let claims = self.verify_token(token)?;
        let user = self
            .db
            .get_user(claims.user_id()?)
            .await?
            .ok_or_else(|| WikiError::Authentication("User no longer exists".to_string()))?;

        if user.is_blacklisted {
            return Err(WikiError::Authorization(
                "Account has been blacklisted".to_string(),
            ));
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseOptions, SqliteAdapter};

    async fn setup() -> (AccountManager, Arc<dyn DatabaseAdapter>) {
        let db: Arc<dyn DatabaseAdapter> = Arc::new(
            SqliteAdapter::connect("sqlite::memory:", &DatabaseOptions::default())
                .await
                .unwrap(),
        );
        let mut config = ServerConfig::default();
        config.authentication.secret_key = "k".repeat(32);
        config.authentication.bcrypt_cost = 4;
        (AccountManager::new(db.clone(), Arc::new(config)), db)
    }

    fn registration(username: &str, password: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: format!("{}@Example.com", username),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (accounts, _) = setup().await;
        let user = accounts
            .register(registration("alice", "password123"))
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.is_admin);

        let login = accounts.login("alice", "password123").await.unwrap();
        assert_eq!(login.token_type, "Bearer");
        assert_eq!(login.user.id, user.id);

        let by_email = accounts
            .login("ALICE@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(by_email.user.id, user.id);

        let authed = accounts.authenticate(&login.access_token).await.unwrap();
        assert_eq!(authed.username, "alice");
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (accounts, _) = setup().await;
        accounts
            .register(registration("alice", "password123"))
            .await
            .unwrap();

        let err = accounts.login("alice", "nope").await.unwrap_err();
        assert!(matches!(err, WikiError::Authentication(_)));
        let err = accounts.login("nobody", "password123").await.unwrap_err();
        assert!(matches!(err, WikiError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let (accounts, _) = setup().await;
        accounts
            .register(registration("alice", "password123"))
            .await
            .unwrap();
        let err = accounts
            .register(registration("alice", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_weak_password_and_bad_username_rejected() {
        let (accounts, _) = setup().await;
        let err = accounts
            .register(registration("alice", "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Validation(_)));

        let err = accounts
            .register(registration("bad name", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, WikiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blacklisted_user_cannot_login() {
        let (accounts, db) = setup().await;
        let user = accounts
            .register(registration("mallory", "password123"))
            .await
            .unwrap();
        let token = accounts.issue_token(&user).unwrap();

        db.set_user_blacklisted(user.id, true).await.unwrap();

        let err = accounts.login("mallory", "password123").await.unwrap_err();
        assert!(matches!(err, WikiError::Authorization(_)));
        let err = accounts.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, WikiError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let (accounts, _) = setup().await;
        let user = accounts
            .register(registration("alice", "password123"))
            .await
            .unwrap();
        let mut token = accounts.issue_token(&user).unwrap();
        token.push('x');
        assert!(accounts.verify_token(&token).is_err());
    }

    #[tokio::test]
    async fn test_oversized_token_lifetime_is_an_error() {
        let (accounts, db) = setup().await;
        let user = accounts
            .register(registration("alice", "password123"))
            .await
            .unwrap();

        let mut config = (*accounts.config).clone();
        config.authentication.token_ttl_hours = i64::MAX;
        let accounts = AccountManager::new(db, Arc::new(config));

        let err = accounts.issue_token(&user).unwrap_err();
        assert!(matches!(err, WikiError::Internal(_)));
    }
}
