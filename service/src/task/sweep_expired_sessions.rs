//! [`SweepExpiredSessions`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::user::{session, Session},
    infra::{backend, Backend},
    Service,
};

use super::Task;

/// Configuration of [`SweepExpiredSessions`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between sweeps of expired [`Session`]s.
    #[default(time::Duration::from_secs(60))]
    pub interval: time::Duration,
}

/// [`Task`] dropping expired [`Session`]s, so their owners are reported as
/// signed out.
#[derive(Clone, Copy, Debug)]
pub struct SweepExpiredSessions<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<B> Task<Start<By<SweepExpiredSessions<Self>, Config>>> for Service<B>
where
    SweepExpiredSessions<Service<B>>: Task<Perform<()>, Ok = usize, Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<SweepExpiredSessions<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let task = SweepExpiredSessions {
            config: by.into_inner(),
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("{n} expired session(s) swept"),
                Err(e) => {
                    log::error!("`task::SweepExpiredSessions` failed: {e}");
                }
            }
        }
    }
}

impl<B> Task<Perform<()>> for SweepExpiredSessions<Service<B>>
where
    B: Backend<
        Delete<By<Session, session::ExpirationDateTime>>,
        Ok = usize,
        Err = Traced<backend::Error>,
    >,
{
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        self.service
            .backend()
            .execute(Delete(By::new(session::ExpirationDateTime::now())))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`SweepExpiredSessions`] execution.
pub type ExecutionError = Traced<backend::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::Perform;
    use futures::StreamExt as _;
    use secrecy::SecretBox;

    use crate::{
        command::Login,
        domain::user::session,
        infra::{in_memory, InMemory},
        Command as _, Service, Task as _,
    };

    use super::{Config, SweepExpiredSessions};

    #[tokio::test]
    async fn signs_out_expired_sessions() {
        let svc = Service::from_parts(
            crate::Config::default(),
            InMemory::new(&in_memory::Config {
                session_ttl: Duration::ZERO,
                ..in_memory::Config::default()
            }),
        );
        let session = svc
            .execute(Login {
                email: InMemory::DEMO_EMAIL.into(),
                password: SecretBox::new(Box::new(
                    InMemory::DEMO_PASSWORD.into(),
                )),
            })
            .await
            .unwrap();
        let mut changes = svc.backend().sessions().subscribe();
        let task = SweepExpiredSessions {
            config: Config::default(),
            service: svc.clone(),
        };

        assert_eq!(svc.backend().refresh_tokens_count(), 1);

        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);
        assert_eq!(svc.backend().refresh_tokens_count(), 0);

        let change = changes.next().await.unwrap();
        assert_eq!(change.event, session::Event::SignedOut);
        assert_eq!(change.user_id, session.user.id);
        assert!(svc.backend().sessions().owner(&session.token).is_none());
    }

    #[tokio::test]
    async fn keeps_live_sessions() {
        let svc = crate::spec::service();
        _ = svc
            .execute(Login {
                email: InMemory::DEMO_EMAIL.into(),
                password: SecretBox::new(Box::new(
                    InMemory::DEMO_PASSWORD.into(),
                )),
            })
            .await
            .unwrap();
        let task = SweepExpiredSessions {
            config: Config::default(),
            service: svc.clone(),
        };

        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);
        assert_eq!(svc.backend().refresh_tokens_count(), 1);
    }
}
