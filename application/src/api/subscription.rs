//! GraphQL [`Subscription`]s definitions.

use futures::{future, stream::BoxStream, StreamExt as _};
use juniper::graphql_subscription;
use service::{auth, sync};

use crate::{api, Context, Error};

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

impl Subscription {
    /// Name of the [`tracing::Span`] for the subscriptions.
    const SPAN_NAME: &'static str = "GraphQL subscription";
}

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Live list of the `Proposal`s matching the provided `search` term,
    /// ordered by their titles.
    ///
    /// Starts with a `LOADING` snapshot, followed by the fetched one, and
    /// then emits a new snapshot on every remote change affecting the list.
    /// To change the `search` term or the order, re-subscribe.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BAD_REQUEST` - the `Authorization` header is malformed.
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
        &self,
        search: Option<String>,
        order: Option<api::proposal::SortOrder>,
        ctx: &Context,
    ) -> Result<BoxStream<'static, api::proposal::List>, Error> {
        let token = ctx.token().await?;
        // Arguments are fixed for the subscription lifetime.
        let (_, snapshots) = sync::watch(
            ctx.service().clone(),
            token,
            api::proposal::filter(search.as_deref(), order),
        );
        Ok(snapshots.map(Into::into).boxed())
    }

    /// Current `User`, re-emitted on every change of its `Session`.
    ///
    /// Emits `null` once the `User` signs out, or its `Session` expires.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BAD_REQUEST` - the `Authorization` header is malformed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "session",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn session(
        &self,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Option<api::User>>, Error> {
        let token = ctx.token().await?;
        Ok(auth::State::new(ctx.service().clone())
            .watch(token)
            .filter_map(|status| {
                future::ready(match status {
                    auth::Status::Loading => None,
                    auth::Status::Resolved(user) => Some(user.map(Into::into)),
                })
            })
            .boxed())
    }
}
