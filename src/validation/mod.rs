/// Input validation and sanitation
///
/// Username and password rules for accounts, and the cleanup applied to all
/// user-supplied text before it is stored.
use crate::{config::PasswordPolicyConfig, error::WikiError};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validation result with detailed errors
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Collapse detailed errors into the service error type
pub fn into_wiki_error(errors: Vec<ValidationError>) -> WikiError {
    let message = errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    WikiError::Validation(message)
}

/// Password rules
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_special_chars: bool,
}

impl From<&PasswordPolicyConfig> for PasswordPolicy {
    fn from(config: &PasswordPolicyConfig) -> Self {
        Self {
            min_length: config.min_length,
            require_special_chars: config.require_special_chars,
        }
    }
}

impl PasswordPolicy {
    /// Check a password against the policy
    pub fn check(&self, password: &str) -> ValidationResult {
        let mut errors = Vec::new();

        let length = password.chars().count();
        if length < self.min_length {
            errors.push(ValidationError::new(
                "password",
                format!("must be at least {} characters", self.min_length),
            ));
        }

        if password.chars().all(char::is_whitespace) && !password.is_empty() {
            errors.push(ValidationError::new("password", "cannot be only whitespace"));
        }

        if self.require_special_chars && password.chars().all(char::is_alphanumeric) {
            errors.push(ValidationError::new(
                "password",
                "must contain at least one special character",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Usernames: 3-32 ASCII letters, digits, `_` or `-`
pub fn validate_username(username: &str) -> ValidationResult {
    let length = username.chars().count();
    let mut errors = Vec::new();

    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&length) {
        errors.push(ValidationError::new(
            "username",
            format!(
                "must be between {} and {} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            ),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.push(ValidationError::new(
            "username",
            "may only contain letters, digits, '_' and '-'",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Strip control characters (newline and tab survive) and trim
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitize and require a non-empty value of bounded length
pub fn clean_required(field: &str, input: &str, max_chars: usize) -> Result<String, WikiError> {
    let cleaned = sanitize_text(input);
    if cleaned.is_empty() {
        return Err(into_wiki_error(vec![ValidationError::new(
            field,
            "cannot be empty",
        )]));
    }
    if cleaned.chars().count() > max_chars {
        return Err(into_wiki_error(vec![ValidationError::new(
            field,
            format!("exceeds maximum length of {} characters", max_chars),
        )]));
    }
    Ok(cleaned)
}
