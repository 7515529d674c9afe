//! [`Session`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, FromStr};
use strum::{AsRefStr, Display as StrumDisplay};

use crate::domain::{user, User};

/// Authenticated session of a [`User`] issued by the backend.
#[derive(Clone, Debug)]
pub struct Session {
    /// Access [`Token`] of this [`Session`].
    pub token: Token,

    /// [`RefreshToken`] to prolong this [`Session`] with.
    pub refresh_token: Option<RefreshToken>,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,

    /// [`User`] this [`Session`] belongs to.
    pub user: User,
}

/// Access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, FromStr, Hash, PartialEq)]
#[as_ref(str)]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// Token allowing to refresh an expiring [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, FromStr, PartialEq)]
#[as_ref(str)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Creates a new [`RefreshToken`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`RefreshToken`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

/// Transition of a [`Session`] reported by the backend.
#[derive(Clone, Debug)]
pub struct Change {
    /// [`Event`] that happened.
    pub event: Event,

    /// ID of the [`User`] whose [`Session`] has changed.
    pub user_id: user::Id,

    /// [`User`] after the transition.
    ///
    /// [`None`] once signed out.
    pub user: Option<User>,
}

/// Kind of a [`Session`] transition.
#[derive(AsRefStr, Clone, Copy, Debug, Eq, PartialEq, StrumDisplay)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// [`User`] has signed in.
    SignedIn,

    /// [`User`] has signed out, or the [`Session`] expired.
    SignedOut,

    /// [`Session`] access [`Token`] has been refreshed.
    TokenRefreshed,

    /// [`User`] attributes have been updated.
    UserUpdated,
}
