//! [`Command`] for signing a [`User`] in.

use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::user::{self, Session},
    infra::{
        backend::{self, auth::SignIn},
        Backend,
    },
    Service,
};

use super::{validation, Command, ValidationError};

/// [`Command`] for signing a [`User`] in with its credentials.
#[derive(Debug)]
pub struct Login {
    /// Email of the [`User`], as typed.
    pub email: String,

    /// [`user::Password`] of the [`User`].
    pub password: SecretBox<user::Password>,
}

impl<B> Command<Login> for Service<B>
where
    B: Backend<SignIn, Ok = Session, Err = Traced<backend::Error>>,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: Login) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Login { email, password } = cmd;
        let email = validation::credentials(&email, password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        self.backend()
            .execute(SignIn { email, password })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`Login`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Provided credentials are invalid.
    #[display("{_0}")]
    Validation(ValidationError),

    /// [`Backend`] doesn't recognize the credentials.
    #[display("Email or password is incorrect")]
    InvalidCredentials,

    /// [`Backend`] error.
    #[display("{_0}")]
    #[from(ignore)]
    Backend(backend::Error),
}

impl From<backend::Error> for ExecutionError {
    fn from(e: backend::Error) -> Self {
        if e.is_rejected_with("Invalid login credentials") {
            Self::InvalidCredentials
        } else {
            Self::Backend(e)
        }
    }
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{infra::InMemory, Command as _};

    use super::{ExecutionError, Login};

    fn login(email: &str, password: &str) -> Login {
        Login {
            email: email.into(),
            password: SecretBox::new(Box::new(password.into())),
        }
    }

    #[tokio::test]
    async fn signs_in_with_demo_credentials() {
        let svc = crate::spec::service();

        let session = svc
            .execute(login(InMemory::DEMO_EMAIL, InMemory::DEMO_PASSWORD))
            .await
            .unwrap();

        assert_eq!(session.user.email.as_ref(), InMemory::DEMO_EMAIL);
    }

    #[tokio::test]
    async fn reports_incorrect_credentials() {
        let svc = crate::spec::service();

        let err = svc
            .execute(login("other@teste.com", "654321"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidCredentials));
        assert_eq!(
            err.as_ref().to_string(),
            "Email or password is incorrect",
        );
    }

    #[tokio::test]
    async fn validates_before_backend() {
        let svc = crate::spec::failing();

        for (email, password, expected) in [
            ("", "123456", "Email and password are required"),
            ("demo@teste.com", "", "Email and password are required"),
            ("demo", "123456", "Invalid email"),
            ("demo@teste.com", "123", "Password must be at least 6"),
        ] {
            let err = svc.execute(login(email, password)).await.unwrap_err();

            assert!(
                matches!(err.as_ref(), ExecutionError::Validation(_)),
                "`{email}`/`{password}` reached backend",
            );
            assert!(err.as_ref().to_string().starts_with(expected));
        }
    }

    #[tokio::test]
    async fn passes_other_backend_errors_through() {
        let svc = crate::spec::failing();

        let err = svc
            .execute(login("demo@teste.com", "123456"))
            .await
            .unwrap_err();

        assert_eq!(err.as_ref().to_string(), crate::spec::FAILURE);
    }
}
