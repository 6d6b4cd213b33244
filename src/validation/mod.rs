/// Input normalization and policy checks shared by the account flows
use crate::error::ApiError;

/// Symbols accepted by the password strength policy
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Validation result with detailed errors
pub type ValidationResult = Result<(), Vec<ValidationIssue>>;

/// Lower-case and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lower-case and trim a username
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Basic shape check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// The part of an email before `@`, or the whole string when there is none
pub fn email_local_part(email: &str) -> &str {
    email.split_once('@').map(|(local, _)| local).unwrap_or(email)
}

/// Check a new password against the strength policy
pub fn check_password_strength(password: &str) -> ValidationResult {
    let mut issues = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        issues.push(ValidationIssue {
            path: "password".to_string(),
            message: format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        });
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        issues.push(ValidationIssue {
            path: "password".to_string(),
            message: "must contain an uppercase letter".to_string(),
        });
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push(ValidationIssue {
            path: "password".to_string(),
            message: "must contain a digit".to_string(),
        });
    }

    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        issues.push(ValidationIssue {
            path: "password".to_string(),
            message: format!("must contain one of {}", PASSWORD_SYMBOLS),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Strength check mapped straight onto an API error
pub fn validate_password_strength(password: &str) -> Result<(), ApiError> {
    check_password_strength(password).map_err(issues_to_api_error)
}

/// Reject malformed email addresses
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid email address".to_string()))
    }
}

/// Convert validation issues to a single API error
pub fn issues_to_api_error(issues: Vec<ValidationIssue>) -> ApiError {
    let message = issues
        .iter()
        .map(|i| format!("{} {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ");

    ApiError::Validation(message)
}
