//! [`Query`]s of the current [`User`].

use std::convert::Infallible;

use common::operations::{By, Select};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user::session, User},
    infra::{backend, Backend},
    Service,
};

use super::{FeedQuery, Query};

/// [`Query`] subscribing to [`session::Change`]s.
pub type SessionChanges = FeedQuery<By<session::Change, ()>>;

/// [`Query`] resolving the [`User`] signed in with the provided
/// [`session::Token`].
///
/// Never fails: backend errors are logged and resolved to [`None`].
#[derive(Clone, Debug)]
pub struct Current(pub session::Token);

impl<B> Query<Current> for Service<B>
where
    B: Backend<
        Select<By<Option<User>, session::Token>>,
        Ok = Option<User>,
        Err = Traced<backend::Error>,
    >,
{
    type Ok = Option<User>;
    type Err = Infallible;

    async fn execute(
        &self,
        Current(token): Current,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .backend()
            .execute(Select(By::new(token)))
            .await
            .unwrap_or_else(|e| {
                log::warn!("failed to resolve current user: {e}");
                None
            }))
    }
}

/// [`Query`] checking whether the provided [`session::Token`] belongs to an
/// active session.
#[derive(Clone, Debug)]
pub struct HasActiveSession(pub Option<session::Token>);

impl<B> Query<HasActiveSession> for Service<B>
where
    Self: Query<Current, Ok = Option<User>, Err = Infallible>,
{
    type Ok = bool;
    type Err = Infallible;

    async fn execute(
        &self,
        HasActiveSession(token): HasActiveSession,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(token) = token else {
            return Ok(false);
        };
        Ok(self.execute(Current(token)).await?.is_some())
    }
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{command::Login, infra::InMemory, Command as _, Query as _};

    use super::{Current, HasActiveSession};

    #[tokio::test]
    async fn resolves_signed_in_user() {
        let svc = crate::spec::service();
        let session = svc
            .execute(Login {
                email: InMemory::DEMO_EMAIL.into(),
                password: SecretBox::new(Box::new(
                    InMemory::DEMO_PASSWORD.into(),
                )),
            })
            .await
            .unwrap();

        let user = svc.execute(Current(session.token.clone())).await.unwrap();
        assert_eq!(
            user.map(|u| u.id.to_string()).as_deref(),
            Some(InMemory::DEMO_USER_ID),
        );
        assert!(svc
            .execute(HasActiveSession(Some(session.token)))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn resolves_garbage_to_none() {
        let svc = crate::spec::service();
        let token = "garbage".parse().unwrap();

        assert!(svc.execute(Current(token)).await.unwrap().is_none());
        assert!(!svc.execute(HasActiveSession(None)).await.unwrap());
    }

    #[tokio::test]
    async fn resolves_errors_to_none() {
        let token = "whatever".parse().unwrap();

        let user = crate::spec::failing().execute(Current(token)).await;

        assert!(user.unwrap().is_none());
    }
}
