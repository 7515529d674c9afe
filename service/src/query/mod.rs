//! [`Query`] definition.

pub mod proposals;
pub mod user;
pub mod users;

use common::operations::{By, Select, Subscribe};
use tracerr::Traced;

use crate::{
    infra::{backend, Backend},
    Service,
};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;

/// [`Query`] [`Select`]ing a `T`ype from a [`Backend`].
#[derive(Clone, Copy, Debug)]
#[expect(clippy::module_name_repetitions, reason = "more readable")]
pub struct BackendQuery<T>(T);

impl<W, B> BackendQuery<By<W, B>> {
    /// Creates a new [`BackendQuery`] selecting a `W` by the provided `B`.
    #[must_use]
    pub fn by(by: B) -> Self {
        Self(By::new(by))
    }
}

impl<Db, W, B> Query<BackendQuery<By<W, B>>> for Service<Db>
where
    Db: Backend<Select<By<W, B>>, Ok = W, Err = Traced<backend::Error>>,
{
    type Ok = W;
    type Err = Traced<backend::Error>;

    async fn execute(
        &self,
        BackendQuery(by): BackendQuery<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.backend()
            .execute(Select(by))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// [`Query`] [`Subscribe`]ing to a feed of `T`ype changes from a
/// [`Backend`].
#[derive(Clone, Copy, Debug)]
pub struct FeedQuery<T>(T);

impl<W, B> FeedQuery<By<W, B>> {
    /// Creates a new [`FeedQuery`] subscribing to `W` changes scoped by the
    /// provided `B`.
    #[must_use]
    pub fn by(by: B) -> Self {
        Self(By::new(by))
    }
}

impl<Db, W, B> Query<FeedQuery<By<W, B>>> for Service<Db>
where
    Db: Backend<
        Subscribe<By<W, B>>,
        Ok = backend::Subscription<W>,
        Err = Traced<backend::Error>,
    >,
{
    type Ok = backend::Subscription<W>;
    type Err = Traced<backend::Error>;

    async fn execute(
        &self,
        FeedQuery(by): FeedQuery<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.backend()
            .execute(Subscribe(by))
            .await
            .map_err(tracerr::wrap!())
    }
}
