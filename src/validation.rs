//! Input validation for identifiers and credentials.

use crate::crypto::Password;
use crate::error::{Result, SealdropError};

/// Maximum allowed user id length
pub const MAX_USER_ID_LENGTH: usize = 128;

/// Maximum allowed password length in bytes
pub const MAX_PASSWORD_LENGTH: usize = 1024;

/// Validation functions for input data
pub struct Validator;

impl Validator {
    /// Validate a user id.
    ///
    /// User ids name storage directories, so they are limited to ASCII
    /// letters, digits and `@ . _ + -`, and may not be `.` or `..`.
    pub fn validate_user_id(user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Err(SealdropError::validation("User ID cannot be empty"));
        }

        if user_id.len() > MAX_USER_ID_LENGTH {
            return Err(SealdropError::validation(format!(
                "User ID too long: {} bytes exceeds maximum of {} bytes",
                user_id.len(),
                MAX_USER_ID_LENGTH
            )));
        }

        if user_id == "." || user_id == ".." {
            return Err(SealdropError::validation("User ID cannot be a path component"));
        }

        if let Some(c) = user_id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '+' | '-')))
        {
            return Err(SealdropError::validation(format!(
                "User ID contains invalid character {:?}",
                c
            )));
        }

        Ok(())
    }

    /// Validate a password before it is used to wrap a key
    pub fn validate_password(password: &Password) -> Result<()> {
        if password.is_empty() {
            return Err(SealdropError::password("Password cannot be empty"));
        }

        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(SealdropError::password(format!(
                "Password too long: maximum is {} bytes",
                MAX_PASSWORD_LENGTH
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_user_ids() {
        for id in ["alice", "bob@example.com", "user_42", "first.last+tag", "7"] {
            assert!(Validator::validate_user_id(id).is_ok(), "{} should be valid", id);
        }
    }

    #[test]
    fn test_invalid_user_ids() {
        let too_long = "a".repeat(MAX_USER_ID_LENGTH + 1);
        for id in ["", ".", "..", "a/b", "a\\b", "name with space", "tab\t", too_long.as_str()] {
            assert!(Validator::validate_user_id(id).is_err(), "{:?} should be invalid", id);
        }
    }

    #[test]
    fn test_password_validation() {
        assert!(Validator::validate_password(&Password::from("ok")).is_ok());
        assert!(matches!(
            Validator::validate_password(&Password::from("")),
            Err(SealdropError::Password(_))
        ));
        let huge = Password::new("x".repeat(MAX_PASSWORD_LENGTH + 1));
        assert!(Validator::validate_password(&huge).is_err());
    }
}
