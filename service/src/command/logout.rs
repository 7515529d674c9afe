//! [`Command`] for signing a [`User`] out.

use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{user::Session, User};
use crate::{
    domain::user::session,
    infra::{
        backend::{self, auth::SignOut},
        Backend,
    },
    Service,
};

use super::Command;

/// [`Command`] for signing a [`User`] out, revoking its [`Session`].
#[derive(Clone, Debug)]
pub struct Logout {
    /// [`session::Token`] of the [`Session`] to revoke.
    pub token: session::Token,
}

impl<B> Command<Logout> for Service<B>
where
    B: Backend<SignOut, Ok = (), Err = Traced<backend::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: Logout) -> Result<Self::Ok, Self::Err> {
        self.backend()
            .execute(SignOut(cmd.token))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`Logout`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Backend`] error.
    #[display("Failed to log out: {_0}")]
    Backend(backend::Error),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::user::session,
        infra::{backend::auth::SignIn, Backend as _, InMemory},
        Command as _,
    };

    use super::Logout;

    #[tokio::test]
    async fn revokes_session() {
        let svc = crate::spec::service();
        let session = svc
            .backend()
            .execute(SignIn {
                email: InMemory::DEMO_EMAIL.parse().unwrap(),
                password: secrecy::SecretBox::new(Box::new(
                    InMemory::DEMO_PASSWORD.into(),
                )),
            })
            .await
            .unwrap();
        assert!(svc.backend().sessions().owner(&session.token).is_some());

        svc.execute(Logout {
            token: session.token.clone(),
        })
        .await
        .unwrap();

        assert!(svc.backend().sessions().owner(&session.token).is_none());
    }

    #[tokio::test]
    async fn reports_failure() {
        let svc = crate::spec::failing();
        // SAFETY: Any token is fine for a failing backend.
        #[expect(unsafe_code, reason = "test")]
        let token = unsafe { session::Token::new_unchecked("t".into()) };

        let err = svc.execute(Logout { token }).await.unwrap_err();

        assert_eq!(
            err.as_ref().to_string(),
            format!("Failed to log out: {}", crate::spec::FAILURE),
        );
    }
}
