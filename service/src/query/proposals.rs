//! [`Query`]s of [`Proposal`]s.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{proposal, user::session, Proposal},
    infra::{backend, Backend},
    read, Service,
};

use super::{BackendQuery, FeedQuery, Query};

/// [`Query`] selecting a single [`Proposal`] by its [`proposal::Id`].
///
/// Resolves to [`None`] if there is no such [`Proposal`].
pub type ById = BackendQuery<By<Option<Proposal>, read::proposal::Selector>>;

/// [`Query`] subscribing to [`proposal::Change`]s.
pub type Changes = FeedQuery<By<proposal::Change, Option<session::Token>>>;

/// [`Query`] fetching a [`Proposal`]s list.
#[derive(Clone, Debug, Default)]
pub struct List(pub read::proposal::list::Selector);

impl<B> Query<List> for Service<B>
where
    B: Backend<
        Select<By<Vec<Proposal>, read::proposal::list::Selector>>,
        Ok = Vec<Proposal>,
        Err = Traced<backend::Error>,
    >,
{
    type Ok = Vec<Proposal>;
    type Err = Traced<FetchError>;

    async fn execute(&self, List(selector): List) -> Result<Self::Ok, Self::Err> {
        self.backend()
            .execute(Select(By::new(selector)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of fetching a [`Proposal`]s list.
#[derive(Debug, Display, Error, From)]
#[display("Failed to fetch proposals: {_0}")]
pub struct FetchError(backend::Error);
