//! [`Command`] for creating a new [`User`] on behalf of an administrator.

use common::operations::Insert;
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        backend::{self, admin},
        Backend,
    },
    Service,
};

use super::{validation, Command, ValidationError};

/// [`Command`] for creating a new [`User`] on behalf of an administrator.
///
/// The email of the created [`User`] is considered confirmed right away.
#[derive(Debug)]
pub struct CreateUser {
    /// Email of the new [`User`], as typed.
    pub email: String,

    /// [`user::Password`] of the new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`user::Metadata`] to attach to the new [`User`].
    pub metadata: user::Metadata,
}

impl<B> Command<CreateUser> for Service<B>
where
    B: Backend<
        Insert<admin::NewUser>,
        Ok = User,
        Err = Traced<backend::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            email,
            password,
            metadata,
        } = cmd;
        let email = validation::credentials(&email, password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        self.backend()
            .execute(Insert(admin::NewUser {
                email,
                password,
                metadata,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Provided data is invalid.
    #[display("{_0}")]
    Validation(ValidationError),

    /// [`Backend`] error.
    #[display("{_0}")]
    Backend(backend::Error),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{domain::user, infra::backend, Command as _};

    use super::{CreateUser, ExecutionError};

    #[tokio::test]
    async fn unavailable_without_admin_client() {
        let err = crate::spec::service()
            .execute(CreateUser {
                email: "new@teste.com".into(),
                password: SecretBox::new(Box::new("Abc123".into())),
                metadata: user::Metadata::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Backend(backend::Error::AdminUnavailable),
        ));
    }
}
