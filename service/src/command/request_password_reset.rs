//! [`Command`] for requesting a password reset.

use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    infra::{
        backend::{self, auth::RecoverPassword},
        Backend,
    },
    Service,
};

use super::{validation, Command, ValidationError};

/// [`Command`] for requesting a password reset link to be emailed.
///
/// Once the email is valid, this [`Command`] always succeeds: [`Backend`]
/// failures are only logged, so the caller cannot learn whether a [`User`]
/// with the provided email exists.
#[derive(Clone, Debug)]
pub struct RequestPasswordReset {
    /// Email to send the link to, as typed.
    pub email: String,

    /// Location the link should redirect to.
    ///
    /// [`Backend`] default is used if [`None`].
    pub redirect_to: Option<String>,
}

impl<B> Command<RequestPasswordReset> for Service<B>
where
    B: Backend<RecoverPassword, Ok = (), Err = Traced<backend::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RequestPasswordReset,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestPasswordReset { email, redirect_to } = cmd;
        let email = validation::email(&email)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        if let Err(e) = self
            .backend()
            .execute(RecoverPassword { email, redirect_to })
            .await
        {
            log::error!("failed to request password reset: {e}");
        }
        Ok(())
    }
}

/// Error of [`RequestPasswordReset`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Provided email is invalid.
    #[display("{_0}")]
    Validation(ValidationError),
}

#[cfg(test)]
mod spec {
    use crate::{command::ValidationError, Command as _};

    use super::{ExecutionError, RequestPasswordReset};

    fn reset(email: &str) -> RequestPasswordReset {
        RequestPasswordReset {
            email: email.into(),
            redirect_to: None,
        }
    }

    #[tokio::test]
    async fn always_resolves_for_valid_email() {
        crate::spec::service()
            .execute(reset("nobody@teste.com"))
            .await
            .unwrap();
        crate::spec::failing()
            .execute(reset("nobody@teste.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validates_email() {
        let svc = crate::spec::failing();

        let err = svc.execute(reset("")).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(ValidationError::MissingEmail),
        ));

        let err = svc.execute(reset("nobody")).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(ValidationError::InvalidEmail),
        ));
    }
}
