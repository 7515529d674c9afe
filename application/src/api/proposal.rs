//! [`Proposal`]-related definitions.

// `GraphQLEnum` derive expands `Self::Error`, which is ambiguous with the
// `ListStatus::Error` variant.
#![allow(ambiguous_associated_items)]

use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, read::proposal::list, sync};

use crate::{
    api::{self, scalar},
    Context,
};

/// A commercial [`Proposal`].
#[derive(Clone, Debug, From, Into)]
pub struct Proposal(domain::Proposal);

/// A commercial `Proposal`.
#[graphql_object(context = Context)]
impl Proposal {
    /// Unique identifier of this `Proposal`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Proposal.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.clone().into()
    }

    /// Title of this `Proposal`.
    pub fn title(&self) -> &str {
        self.0.title.as_ref()
    }

    /// URL this `Proposal` is published at.
    ///
    /// Not validated, so may be empty or malformed.
    pub fn url(&self) -> &str {
        self.0.url.as_ref()
    }
}

/// Unique identifier of a `Proposal`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ProposalId",
    with = scalar::Via::<domain::proposal::Id>,
)]
pub struct Id(domain::proposal::Id);

/// Order of a `Proposal`s list by their titles.
#[derive(Clone, Copy, Debug, Default, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ProposalSortOrder")]
pub enum SortOrder {
    /// From A to Z.
    #[default]
    Asc,

    /// From Z to A.
    Desc,
}

impl From<SortOrder> for list::SortOrder {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Self::Asc,
            SortOrder::Desc => Self::Desc,
        }
    }
}

impl From<list::SortOrder> for SortOrder {
    fn from(order: list::SortOrder) -> Self {
        match order {
            list::SortOrder::Asc => Self::Asc,
            list::SortOrder::Desc => Self::Desc,
        }
    }
}

/// Builds a [`list::Filter`] out of the provided GraphQL arguments.
///
/// A blank `search` term disables searching.
#[must_use]
pub fn filter(search: Option<&str>, order: Option<SortOrder>) -> list::Filter {
    list::Filter {
        search: search.and_then(list::SearchTerm::new),
        order: order.unwrap_or_default().into(),
    }
}

/// Status of a live `Proposal`s list.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ProposalListStatus")]
pub enum ListStatus {
    /// Nothing has been requested yet.
    Idle,

    /// Snapshot of the list is being fetched.
    Loading,

    /// Snapshot has been fetched, and the list follows the changes.
    Ready,

    /// Snapshot fetching failed.
    Error,
}

/// Point-in-time view of a live [`Proposal`]s list.
#[derive(Clone, Debug, From)]
pub struct List(sync::Snapshot);

/// Point-in-time view of a live `Proposal`s list.
#[graphql_object(name = "ProposalList", context = Context)]
impl List {
    /// Status of this `ProposalList`.
    pub fn status(&self) -> ListStatus {
        match &self.0.status {
            sync::Status::Idle => ListStatus::Idle,
            sync::Status::Loading => ListStatus::Loading,
            sync::Status::Ready => ListStatus::Ready,
            sync::Status::Error(_) => ListStatus::Error,
        }
    }

    /// Message of the failure, if the `status` is `ERROR`.
    pub fn error(&self) -> Option<&str> {
        match &self.0.status {
            sync::Status::Error(msg) => Some(msg.as_str()),
            sync::Status::Idle
            | sync::Status::Loading
            | sync::Status::Ready => None,
        }
    }

    /// Search term this `ProposalList` is filtered with, if any.
    pub fn search(&self) -> Option<&str> {
        self.0.filter.search.as_ref().map(AsRef::as_ref)
    }

    /// Order of this `ProposalList`.
    pub fn order(&self) -> SortOrder {
        self.0.filter.order.into()
    }

    /// Listed `Proposal`s.
    ///
    /// Kept while reloading, so the previous items stay visible.
    pub fn proposals(&self) -> Vec<Proposal> {
        self.0.proposals.iter().cloned().map(Into::into).collect()
    }
}

#[cfg(test)]
mod spec {
    use service::{read::proposal::list, sync};

    use super::{filter, List, ListStatus, SortOrder};

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(filter(Some("  "), None), list::Filter::default());
        assert_eq!(
            filter(Some("web"), Some(SortOrder::Desc)),
            list::Filter {
                search: list::SearchTerm::new("web"),
                order: list::SortOrder::Desc,
            },
        );
    }

    #[test]
    fn exposes_error_message() {
        let snapshot = List::from(sync::Snapshot {
            status: sync::Status::Error("Failed to fetch proposals".into()),
            ..sync::Snapshot::default()
        });

        assert_eq!(snapshot.status(), ListStatus::Error);
        assert_eq!(snapshot.error(), Some("Failed to fetch proposals"));
        assert_eq!(snapshot.order(), SortOrder::Asc);
    }
}
