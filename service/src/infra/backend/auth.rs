//! Authentication operations of a [`Backend`].
//!
//! Besides the operations defined here, a [`Backend`] resolves the [`User`]
//! owning a [`session::Token`] via
//! `Select<By<Option<User>, session::Token>>` and reports [`Session`]
//! transitions via `Subscribe<By<session::Change, ()>>`.

use secrecy::SecretBox;

use crate::domain::{
    user::{self, session, Session},
    User,
};

#[cfg(doc)]
use super::Backend;

/// Signs a [`User`] in with an email and a password, issuing a new
/// [`Session`].
#[derive(Debug)]
pub struct SignIn {
    /// [`user::Email`] of the [`User`].
    pub email: user::Email,

    /// [`user::Password`] of the [`User`].
    pub password: SecretBox<user::Password>,
}

/// Registers a new [`User`].
///
/// Results in a [`Session`] if the [`Backend`] signs the new [`User`] in
/// right away, or in the bare [`User`] if its email must be confirmed first.
#[derive(Debug)]
pub struct SignUp {
    /// [`user::Email`] of the new [`User`].
    pub email: user::Email,

    /// [`user::Password`] of the new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`user::Metadata`] to attach to the new [`User`].
    pub metadata: user::Metadata,
}

/// Outcome of a [`SignUp`].
#[derive(Clone, Debug)]
pub enum SignedUp {
    /// New [`User`] has been signed in right away.
    Session(Box<Session>),

    /// New [`User`] must confirm its email before signing in.
    Unconfirmed(User),
}

impl SignedUp {
    /// Returns the registered [`User`].
    #[must_use]
    pub fn user(&self) -> &User {
        match self {
            Self::Session(s) => &s.user,
            Self::Unconfirmed(u) => u,
        }
    }
}

/// Revokes the [`Session`] with the provided [`session::Token`].
#[derive(Clone, Debug)]
pub struct SignOut(pub session::Token);

/// Exchanges a [`session::RefreshToken`] for a new [`Session`].
#[derive(Clone, Debug)]
pub struct RefreshSession(pub session::RefreshToken);

/// Requests a password recovery email to be sent.
#[derive(Clone, Debug)]
pub struct RecoverPassword {
    /// [`user::Email`] to send the recovery link to.
    pub email: user::Email,

    /// Location the recovery link should redirect to.
    pub redirect_to: Option<String>,
}

/// Updates attributes of the [`User`] owning the provided
/// [`session::Token`].
#[derive(Debug)]
pub struct UpdateUser {
    /// [`session::Token`] of the signed-in [`User`].
    pub token: session::Token,

    /// New [`user::Email`], if it should be changed.
    pub email: Option<user::Email>,

    /// New [`user::Password`], if it should be changed.
    pub password: Option<SecretBox<user::Password>>,

    /// [`user::Metadata`] to merge into the existing one, if any.
    pub metadata: Option<user::Metadata>,
}
