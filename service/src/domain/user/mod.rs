//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Deref, DerefMut, Display, From, Into};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};

pub use self::session::Session;

/// Platform user, as known by the hosted auth provider.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Email`] of this [`User`].
    pub email: Email,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: Option<CreationDateTime>,

    /// [`DateTime`] when the [`Email`] of this [`User`] was confirmed.
    pub email_confirmed_at: Option<ConfirmationDateTime>,

    /// [`Phone`] of this [`User`].
    pub phone: Option<Phone>,

    /// Free-form [`Metadata`] of this [`User`].
    pub metadata: Metadata,
}

/// ID of a [`User`], assigned by the backend.
#[derive(
    AsRef,
    Clone,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[as_ref(str)]
#[from(&str, String)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Email address of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    ///
    /// Only the shape is checked: no whitespace, a single `@` and a `.` after
    /// it.
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] shape.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
        });

        REGEX.is_match(address.as_ref())
    }
}

impl std::str::FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Password of a [`User`].
///
/// Not validated on construction: the requirements differ between signing in
/// and signing up, see [`Password::is_long_enough()`] and
/// [`Password::is_strong()`].
#[derive(Clone, Debug, Eq, From, PartialEq)]
#[from(&str, String)]
pub struct Password(String);

impl Password {
    /// Minimal number of characters in a [`Password`].
    pub const MIN_LENGTH: usize = 6;

    /// Indicates whether this [`Password`] is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indicates whether this [`Password`] has at least
    /// [`Password::MIN_LENGTH`] characters.
    #[must_use]
    pub fn is_long_enough(&self) -> bool {
        self.0.chars().count() >= Self::MIN_LENGTH
    }

    /// Indicates whether this [`Password`] contains at least one uppercase
    /// letter, one lowercase letter and one digit.
    #[must_use]
    pub fn is_strong(&self) -> bool {
        self.0.chars().any(|c| c.is_ascii_uppercase())
            && self.0.chars().any(|c| c.is_ascii_lowercase())
            && self.0.chars().any(|c| c.is_ascii_digit())
    }
}

impl AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Phone number of a [`User`].
///
/// Kept in whatever format the backend reports it.
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str)]
#[from(&str, String)]
pub struct Phone(String);

/// Free-form metadata attached to a [`User`].
#[derive(
    Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, From, PartialEq,
    Serialize,
)]
#[serde(transparent)]
pub struct Metadata(serde_json::Map<String, serde_json::Value>);

impl Metadata {
    /// Merges the `other` [`Metadata`] into this one, overwriting the keys
    /// present in both.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTime`] when an [`Email`] of a [`User`] was confirmed.
pub type ConfirmationDateTime = DateTimeOf<(Email, unit::Confirmation)>;

#[cfg(test)]
mod spec {
    use super::{Email, Metadata, Password};

    #[test]
    fn email_shape() {
        assert!(Email::new("demo@teste.com").is_some());
        assert!(Email::new("a.b+c@sub.example.org").is_some());

        assert!(Email::new("").is_none());
        assert!(Email::new("demo").is_none());
        assert!(Email::new("demo@teste").is_none());
        assert!(Email::new("@teste.com").is_none());
        assert!(Email::new("de mo@teste.com").is_none());
        assert!(Email::new("demo@@teste.com").is_none());
    }

    #[test]
    fn password_length() {
        assert!(!Password::from("12345").is_long_enough());
        assert!(Password::from("123456").is_long_enough());
        assert!(Password::from("").is_empty());
    }

    #[test]
    fn password_strength() {
        assert!(!Password::from("abc123").is_strong());
        assert!(!Password::from("ABC123").is_strong());
        assert!(!Password::from("Abcdef").is_strong());
        assert!(Password::from("Abc123").is_strong());
    }

    #[test]
    fn metadata_merge_overwrites() {
        let mut base: Metadata = serde_json::from_str(
            r#"{"full_name":"Demo","avatar_url":"a.png"}"#,
        )
        .unwrap();
        let update: Metadata =
            serde_json::from_str(r#"{"full_name":"Renamed"}"#).unwrap();

        base.merge(update);

        assert_eq!(base["full_name"], "Renamed");
        assert_eq!(base["avatar_url"], "a.png");
    }
}
