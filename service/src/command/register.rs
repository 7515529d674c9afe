//! [`Command`] for registering a new [`User`].

use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{user::Session, User};
use crate::{
    domain::user,
    infra::{
        backend::{
            self,
            auth::{SignUp, SignedUp},
        },
        Backend,
    },
    Service,
};

use super::{validation, Command, ValidationError};

/// [`Command`] for registering a new [`User`].
///
/// Results in a new [`Session`] if the [`User`] is signed in right away.
#[derive(Debug)]
pub struct Register {
    /// Email of the new [`User`], as typed.
    pub email: String,

    /// [`user::Password`] of the new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`user::Metadata`] to attach to the new [`User`].
    pub metadata: user::Metadata,
}

impl<B> Command<Register> for Service<B>
where
    B: Backend<SignUp, Ok = SignedUp, Err = Traced<backend::Error>>,
{
    type Ok = SignedUp;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: Register) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Register {
            email,
            password,
            metadata,
        } = cmd;
        let email = validation::credentials(&email, password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        validation::new_password(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        self.backend()
            .execute(SignUp {
                email,
                password,
                metadata,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`Register`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Provided data is invalid.
    #[display("{_0}")]
    Validation(ValidationError),

    /// [`User`] with the provided email exists already.
    #[display("This email is already registered")]
    AlreadyRegistered,

    /// [`Backend`] refuses the provided email.
    #[display("Invalid email")]
    EmailRefused,

    /// [`Backend`] error.
    #[display("{_0}")]
    #[from(ignore)]
    Backend(backend::Error),
}

impl From<backend::Error> for ExecutionError {
    fn from(e: backend::Error) -> Self {
        if e.is_rejected_with("User already registered") {
            Self::AlreadyRegistered
        } else if e.is_rejected_with("Invalid email") {
            Self::EmailRefused
        } else {
            Self::Backend(e)
        }
    }
}
