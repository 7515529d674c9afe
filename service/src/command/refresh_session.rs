//! [`Command`] for refreshing a [`Session`].

use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::{
        backend::{self, auth},
        Backend,
    },
    Service,
};

use super::Command;

/// [`Command`] for exchanging a [`session::RefreshToken`] for a new
/// [`Session`].
#[derive(Clone, Debug)]
pub struct RefreshSession {
    /// [`session::RefreshToken`] of the expiring [`Session`].
    pub refresh_token: session::RefreshToken,
}

impl<B> Command<RefreshSession> for Service<B>
where
    B: Backend<
        auth::RefreshSession,
        Ok = Session,
        Err = Traced<backend::Error>,
    >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RefreshSession,
    ) -> Result<Self::Ok, Self::Err> {
        self.backend()
            .execute(auth::RefreshSession(cmd.refresh_token))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`RefreshSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Backend`] error.
    #[display("{_0}")]
    Backend(backend::Error),
}
