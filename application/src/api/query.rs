//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{
    query::{self, proposals::FetchError},
    read, Query as _,
};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently signed-in `User`.
    ///
    /// `null` if no valid access token is provided.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BAD_REQUEST` - the `Authorization` header is malformed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "me",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn me(ctx: &Context) -> Result<Option<api::User>, Error> {
        Ok(ctx
            .try_authenticated()
            .await?
            .map(|a| a.user.clone().into()))
    }

    /// Indicates whether the provided access token belongs to an active
    /// `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "hasActiveSession",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn has_active_session(ctx: &Context) -> Result<bool, Error> {
        let token = ctx.token().await?;
        match ctx
            .service()
            .execute(query::user::HasActiveSession(token))
            .await
        {
            Ok(active) => Ok(active),
            Err(e) => match e {},
        }
    }

    /// Fetches the `Proposal`s matching the provided `search` term, ordered
    /// by their titles.
    ///
    /// The `search` term is matched case-insensitively against both the
    /// title and the ID of a `Proposal`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPOSALS_FETCH_FAILED` - the remote backend failed to provide the
    ///                              `Proposal`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "proposals",
            order = ?order,
            otel.name = Self::SPAN_NAME,
            search = ?search,
        ),
    )]
    pub async fn proposals(
        search: Option<String>,
        order: Option<api::proposal::SortOrder>,
        ctx: &Context,
    ) -> Result<Vec<api::Proposal>, Error> {
        let token = ctx.token().await?;
        ctx.service()
            .execute(query::proposals::List(read::proposal::list::Selector {
                filter: api::proposal::filter(search.as_deref(), order),
                token,
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|list| list.into_iter().map(Into::into).collect())
    }

    /// Returns the `Proposal` with the specified ID.
    ///
    /// `null` if there is no such `Proposal`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "proposal",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn proposal(
        id: api::proposal::Id,
        ctx: &Context,
    ) -> Result<Option<api::Proposal>, Error> {
        let token = ctx.token().await?;
        ctx.service()
            .execute(query::proposals::ById::by(read::proposal::Selector {
                id: id.into(),
                token,
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|p| p.map(Into::into))
    }
}

impl AsError for FetchError {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::new(
            "PROPOSALS_FETCH_FAILED",
            http::StatusCode::BAD_GATEWAY,
            self.to_string(),
        ))
    }
}
