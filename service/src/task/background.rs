//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Boxed error of a failed [`Task`].
pub type TaskError = Box<dyn Error + 'static>;

/// Background environment for running [`Task`]s on the current thread.
///
/// Spawned [`Task`]s make no progress until this [`Background`] is awaited.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set the [`Task`]s are spawned onto.
    set: task::LocalSet,

    /// Names and handles of the spawned [`Task`]s.
    tasks: Vec<(&'static str, task::JoinHandle<Result<(), TaskError>>)>,
}

impl Background {
    /// Spawns a new named [`Task`] inside this [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::debug!("spawning `{name}` background task");
        let handle = self
            .set
            .spawn_local(future.map_err(TaskError::from));
        self.tasks.push((name, handle));
    }

    /// Returns the number of [`Task`]s spawned in this [`Background`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Indicates whether no [`Task`] has been spawned in this [`Background`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), TaskError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    /// Runs all the spawned [`Task`]s, resolving once all of them complete,
    /// or with the first error.
    fn into_future(self) -> Self::IntoFuture {
        let Self { set, tasks } = self;
        let tasks = tasks.into_iter().map(|(name, handle)| {
            handle
                .map(move |res| {
                    res.map_err(TaskError::from)
                        .and_then(|r| r)
                        .inspect_err(|e| {
                            log::error!("`{name}` background task failed: {e}");
                        })
                })
                .boxed_local()
        });
        let driver = set.map(Ok::<_, TaskError>).boxed_local();
        future::try_join(driver, future::try_join_all(tasks))
            .map_ok(drop)
            .boxed_local()
    }
}

#[cfg(test)]
mod spec {
    use std::io;

    use derive_more::{Display, Error};

    use super::Background;

    #[derive(Debug, Display, Error)]
    #[display("failure")]
    struct Failure;

    #[tokio::test]
    async fn runs_spawned_tasks() {
        let mut bg = Background::default();
        assert!(bg.is_empty());

        bg.spawn("ok", async { Ok::<_, io::Error>(()) });
        bg.spawn("ok too", async { Ok::<_, io::Error>(()) });
        assert_eq!(bg.len(), 2);

        bg.await.unwrap();
    }

    #[tokio::test]
    async fn reports_failed_task() {
        let mut bg = Background::default();
        bg.spawn("failing", async { Err::<(), _>(Failure) });

        let err = bg.await.unwrap_err();

        assert_eq!(err.to_string(), "failure");
    }
}
