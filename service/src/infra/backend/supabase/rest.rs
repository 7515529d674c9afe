//! Row store operations of the [`Supabase`] [`Backend`].

use common::operations::{By, Select};
use reqwest::{header, Method};
use tracerr::Traced;

use crate::{
    domain::Proposal,
    infra::backend::{Backend, Error},
    read,
};

use super::{dto, Auth, Supabase};

/// Path of the `propostas_saas` table in the row store.
pub(super) const TABLE: &str = "rest/v1/propostas_saas";

/// Code of the row store error reporting a missing single row.
const NOT_FOUND_CODE: &str = "PGRST116";

impl Backend<Select<By<Vec<Proposal>, read::proposal::list::Selector>>>
    for Supabase
{
    type Ok = Vec<Proposal>;
    type Err = Traced<Error>;

    /// Fetches all the stored [`Proposal`]s.
    ///
    /// The result is taken as the full set, so neither the search term nor
    /// the sort order is applied here.
    async fn execute(
        &self,
        Select(by): Select<By<Vec<Proposal>, read::proposal::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        let auth = selector.token.as_ref().map_or(Auth::Anon, Auth::User);
        let req = self
            .request(Method::GET, TABLE, auth)?
            .query(&[("select", "*")]);

        Ok(Self::send::<Vec<dto::ProposalRow>>(req)
            .await?
            .into_iter()
            .filter_map(dto::ProposalRow::into_proposal)
            .collect())
    }
}

impl Backend<Select<By<Option<Proposal>, read::proposal::Selector>>>
    for Supabase
{
    type Ok = Option<Proposal>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Proposal>, read::proposal::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        let auth = selector.token.as_ref().map_or(Auth::Anon, Auth::User);
        let req = self
            .request(Method::GET, TABLE, auth)?
            .header(header::ACCEPT, "application/vnd.pgrst.object+json")
            .query(&[
                ("select", "*".to_owned()),
                ("id", format!("eq.{}", selector.id)),
            ]);

        match Self::send::<dto::ProposalRow>(req).await {
            Ok(row) => Ok(row.into_proposal()),
            Err(e) if is_not_found(e.as_ref()) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Indicates whether the provided [`Error`] reports a missing single row.
fn is_not_found(err: &Error) -> bool {
    err.rejection()
        .and_then(|r| r.code.as_deref())
        .is_some_and(|c| c == NOT_FOUND_CODE)
}
