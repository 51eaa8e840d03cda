//! Input validation for registration.

use thiserror::Error;

use crate::FileShareError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum display name length.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Password is too short.
    #[error("Password should be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    /// Password is too long.
    #[error("Password should be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    /// Display name is too long.
    #[error("Display name should be at most {MAX_DISPLAY_NAME_LENGTH} characters")]
    DisplayNameTooLong,

    /// Display name contains control characters.
    #[error("Display name contains invalid characters")]
    DisplayNameInvalidChars,

    /// Email is missing.
    #[error("Email is required")]
    EmailEmpty,

    /// Email is too long.
    #[error("Email should be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("Unable to validate email address: invalid format")]
    EmailInvalidFormat,
}

impl From<ValidationError> for FileShareError {
    fn from(e: ValidationError) -> Self {
        FileShareError::Validation(e.to_string())
    }
}

/// Validate a password (6 to 128 characters).
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Validate a display name.
///
/// Empty is allowed. At most 100 characters, no control characters.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::DisplayNameTooLong);
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::DisplayNameInvalidChars);
    }
    Ok(())
}

/// Validate an email address.
///
/// # Examples
///
/// ```
/// use fileshare::auth::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if email.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::EmailInvalidFormat);
    }
    if !domain.contains('.') || domain.split('.').any(|p| p.is_empty()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Validate all registration fields at once.
///
/// Returns the first error encountered.
pub fn validate_sign_up(
    email: &str,
    password: &str,
    display_name: &str,
) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_password(password)?;
    validate_display_name(display_name)?;
    Ok(())
}
