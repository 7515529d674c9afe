//! [`Remote`] [`Backend`] selected at startup.

use derive_more::From;
use tracerr::Traced;

use super::{Backend, Error, InMemory, Sessions, Supabase};

/// [`Backend`] selected once at startup: either the live [`Supabase`]
/// project, or the [`InMemory`] demo dataset when no live credentials are
/// configured.
#[derive(Clone, Debug, From)]
pub enum Remote {
    /// Live [`Supabase`] project.
    Supabase(Supabase),

    /// [`InMemory`] demo dataset.
    InMemory(InMemory),
}

impl Remote {
    /// Indicates whether this [`Remote`] talks to a live project.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Supabase(_))
    }

    /// Indicates whether administrative operations are available.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        match self {
            Self::Supabase(s) => s.is_admin(),
            Self::InMemory(_) => false,
        }
    }

    /// Returns the [`Sessions`] issued via this [`Remote`].
    #[must_use]
    pub fn sessions(&self) -> &Sessions {
        match self {
            Self::Supabase(s) => s.sessions(),
            Self::InMemory(m) => m.sessions(),
        }
    }
}

impl<Op, T> Backend<Op> for Remote
where
    Supabase: Backend<Op, Ok = T, Err = Traced<Error>>,
    InMemory: Backend<Op, Ok = T, Err = Traced<Error>>,
{
    type Ok = T;
    type Err = Traced<Error>;

    async fn execute(&self, op: Op) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Supabase(s) => s.execute(op).await,
            Self::InMemory(m) => m.execute(op).await,
        }
    }
}
