//! Administrative operations of a [`Backend`].
//!
//! These operations require the elevated credentials and fail with
//! [`Error::AdminUnavailable`] when the [`Backend`] is configured without
//! them. Deleting a [`User`] is expressed as `Delete<By<User, user::Id>>`.

use secrecy::SecretBox;

#[cfg(doc)]
use super::{Backend, Error};
use crate::domain::{user, User};

/// Selector of all the registered [`User`]s.
#[derive(Clone, Copy, Debug)]
pub struct All;

/// New [`User`] created on behalf of an administrator.
///
/// Its email is considered confirmed right away.
#[derive(Debug)]
pub struct NewUser {
    /// [`user::Email`] of the new [`User`].
    pub email: user::Email,

    /// [`user::Password`] of the new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`user::Metadata`] to attach to the new [`User`].
    pub metadata: user::Metadata,
}
