/// Account management system
///
/// Handles user registration, login, password hashing and access tokens.
mod manager;

pub use manager::AccountManager;

use crate::{
    db::User,
    error::{WikiError, WikiResult},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String, // username or email
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> WikiResult<i64> {
        self.sub
            .parse()
            .map_err(|_| WikiError::Authentication("Invalid token subject".to_string()))
    }
}

/// Hash a password with bcrypt off the async runtime
pub async fn hash_password(password: &str, cost: u32) -> WikiResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| WikiError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| WikiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a bcrypt hash; malformed hashes never match
pub async fn verify_password(password: &str, hash: &str) -> WikiResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| WikiError::Internal(format!("Verification task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse", 4).await.unwrap();
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
        assert!(!verify_password("anything", "not-a-hash").await.unwrap());
    }

    #[test]
    fn test_registration_validation() {
        let valid = Registration {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "password".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = Registration {
            email: "not-an-email".to_string(),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_claims_user_id() {
        let claims = Claims {
            sub: "42".to_string(),
            username: "alice".to_string(),
            iat: 0,
            exp: 0,
        };
        assert_eq!(claims.user_id().unwrap(), 42);
    }
}
