//! Input validation shared by [`Command`]s.
//!
//! Performed before any [`Backend`] operation, so invalid input never reaches
//! the network.
//!
//! [`Backend`]: crate::infra::Backend

use derive_more::{Display, Error};

#[cfg(doc)]
use crate::Command;
use crate::domain::user;

/// Error of [`Command`] input validation.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum ValidationError {
    /// Email or password is not provided.
    #[display("Email and password are required")]
    MissingCredentials,

    /// Email is not provided.
    #[display("Email is required")]
    MissingEmail,

    /// Email doesn't have a valid shape.
    #[display("Invalid email")]
    InvalidEmail,

    /// Password is shorter than [`user::Password::MIN_LENGTH`].
    #[display("Password must be at least 6 characters long")]
    PasswordTooShort,

    /// Password lacks an uppercase letter, a lowercase letter or a digit.
    #[display(
        "Password must contain at least one uppercase letter, one lowercase \
         letter and one number"
    )]
    WeakPassword,

    /// Profile update contains no fields.
    #[display("No data provided for the update")]
    NothingToUpdate,
}

/// Validates sign-in credentials, returning the parsed [`user::Email`].
///
/// # Errors
///
/// If any credential is missing, or the email is malformed, or the password
/// is too short.
pub fn credentials(
    email: &str,
    password: &user::Password,
) -> Result<user::Email, ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    let email = user::Email::new(email).ok_or(ValidationError::InvalidEmail)?;
    if !password.is_long_enough() {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(email)
}

/// Validates an email address, returning the parsed [`user::Email`].
///
/// # Errors
///
/// If the email is missing or malformed.
pub fn email(email: &str) -> Result<user::Email, ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    user::Email::new(email).ok_or(ValidationError::InvalidEmail)
}

/// Validates a password being set.
///
/// # Errors
///
/// If the password is too short or not strong enough.
pub fn new_password(password: &user::Password) -> Result<(), ValidationError> {
    if !password.is_long_enough() {
        return Err(ValidationError::PasswordTooShort);
    }
    if !password.is_strong() {
        return Err(ValidationError::WeakPassword);
    }
    Ok(())
}

#[cfg(test)]
mod spec {
    use crate::domain::user::Password;

    use super::{credentials, email, new_password, ValidationError as E};

    #[test]
    fn checks_credentials() {
        let pass = Password::from("123456");

        assert_eq!(credentials("", &pass), Err(E::MissingCredentials));
        assert_eq!(
            credentials("demo@teste.com", &Password::from("")),
            Err(E::MissingCredentials),
        );
        assert_eq!(credentials("demo", &pass), Err(E::InvalidEmail));
        assert_eq!(
            credentials("demo@teste.com", &Password::from("12345")),
            Err(E::PasswordTooShort),
        );
        assert_eq!(
            credentials(" demo@teste.com ", &pass),
            Err(E::InvalidEmail),
        );
        assert_eq!(
            credentials("demo@teste.com", &pass).unwrap().as_ref(),
            "demo@teste.com",
        );
    }

    #[test]
    fn checks_email() {
        assert_eq!(email(""), Err(E::MissingEmail));
        assert_eq!(email("  "), Err(E::InvalidEmail));
        assert_eq!(email("x@y.z "), Err(E::InvalidEmail));
        assert_eq!(email("x@y"), Err(E::InvalidEmail));
        assert!(email("x@y.z").is_ok());
    }

    #[test]
    fn checks_new_password() {
        assert_eq!(new_password(&"Ab1".into()), Err(E::PasswordTooShort));
        assert_eq!(new_password(&"abc123".into()), Err(E::WeakPassword));
        assert_eq!(new_password(&"Abc123".into()), Ok(()));
    }
}
