//! [`Command`] for deleting a [`User`] on behalf of an administrator.

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{backend, Backend},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`] on behalf of an administrator.
#[derive(Clone, Debug)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub user_id: user::Id,
}

impl<B> Command<DeleteUser> for Service<B>
where
    B: Backend<
        Delete<By<User, user::Id>>,
        Ok = (),
        Err = Traced<backend::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        self.backend()
            .execute(Delete(By::new(cmd.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Backend`] error.
    #[display("{_0}")]
    Backend(backend::Error),
}
