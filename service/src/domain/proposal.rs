//! [`Proposal`] definitions.

use derive_more::{AsRef, Display, From, Into};

/// Commercial proposal published by the remote backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Proposal {
    /// ID of this [`Proposal`].
    pub id: Id,

    /// [`Title`] of this [`Proposal`].
    pub title: Title,

    /// [`Url`] this [`Proposal`] is published at.
    pub url: Url,
}

/// ID of a [`Proposal`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, Into, PartialEq)]
#[as_ref(str)]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`] if the given `id` is not blank.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.trim().is_empty()).then_some(Self(id))
    }
}

impl std::str::FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `proposal::Id`")
    }
}

/// Title of a [`Proposal`].
#[derive(AsRef, Clone, Debug, Default, Display, Eq, From, Into, PartialEq)]
#[as_ref(str)]
#[from(&str, String)]
pub struct Title(String);

/// Location a [`Proposal`] is published at.
///
/// Not validated: empty or malformed values are kept as they are and rendered
/// as a plain text.
#[derive(AsRef, Clone, Debug, Default, Display, Eq, From, Into, PartialEq)]
#[as_ref(str)]
#[from(&str, String)]
pub struct Url(String);

/// Change of a [`Proposal`] reported by the remote backend change-feed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Change {
    /// New [`Proposal`] has been inserted.
    Inserted(Proposal),

    /// Existing [`Proposal`] has been updated.
    Updated(Proposal),

    /// [`Proposal`] with the provided [`Id`] has been deleted.
    Deleted(Id),
}

impl Change {
    /// Returns the [`Id`] of the [`Proposal`] this [`Change`] is about.
    #[must_use]
    pub fn id(&self) -> &Id {
        match self {
            Self::Inserted(p) | Self::Updated(p) => &p.id,
            Self::Deleted(id) => id,
        }
    }
}
