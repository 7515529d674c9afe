//! [`ProposalList`] state machine.

use std::mem;

use crate::{
    domain::{proposal, Proposal},
    read::proposal::list::Filter,
};

/// Status of a [`ProposalList`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Status {
    /// Nothing has been requested yet.
    #[default]
    Idle,

    /// Snapshot is being fetched.
    Loading,

    /// Snapshot has been fetched and the list is live.
    Ready,

    /// Snapshot fetching failed with the provided message.
    Error(String),
}

/// Point-in-time view of a [`ProposalList`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Snapshot {
    /// [`Status`] of the list.
    pub status: Status,

    /// [`Filter`] the list is built with.
    pub filter: Filter,

    /// Listed [`Proposal`]s.
    pub proposals: Vec<Proposal>,
}

/// In-memory ordered list of [`Proposal`]s, built from a fetched snapshot
/// and incrementally updated with [`proposal::Change`]s.
///
/// No two listed [`Proposal`]s ever share the same [`proposal::Id`].
///
/// [`proposal::Change`]s applied while [`Status::Loading`] are also
/// journaled, and replayed onto the fetched snapshot once it arrives, so none
/// of them is lost regardless of whether the fetch observed it.
#[derive(Clone, Debug, Default)]
pub struct ProposalList {
    /// [`Status`] of this [`ProposalList`].
    status: Status,

    /// [`Filter`] of this [`ProposalList`].
    filter: Filter,

    /// Currently listed [`Proposal`]s.
    proposals: Vec<Proposal>,

    /// [`proposal::Change`]s received since the last [`ProposalList::begin()`].
    journal: Vec<proposal::Change>,
}

impl ProposalList {
    /// Creates a new [`Status::Idle`] [`ProposalList`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current [`Status`] of this [`ProposalList`].
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Returns the [`Filter`] of this [`ProposalList`].
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Returns the currently listed [`Proposal`]s.
    #[must_use]
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Returns a [`Snapshot`] of this [`ProposalList`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status.clone(),
            filter: self.filter.clone(),
            proposals: self.proposals.clone(),
        }
    }

    /// Starts loading this [`ProposalList`] with the provided [`Filter`].
    ///
    /// Currently listed [`Proposal`]s are kept until the fetched snapshot
    /// arrives.
    pub fn begin(&mut self, filter: Filter) {
        self.status = Status::Loading;
        self.filter = filter;
        self.journal.clear();
    }

    /// Resolves the loading of this [`ProposalList`] with the fetched
    /// snapshot or an error message.
    ///
    /// The snapshot becomes the new base and the journaled
    /// [`proposal::Change`]s are replayed onto it in their arrival order.
    ///
    /// Ignored unless [`Status::Loading`].
    pub fn resolve(&mut self, fetched: Result<Vec<Proposal>, String>) {
        if self.status != Status::Loading {
            return;
        }
        let journal = mem::take(&mut self.journal);
        match fetched {
            Ok(snapshot) => {
                let mut proposals = Vec::with_capacity(snapshot.len());
                for p in snapshot {
                    if !proposals.iter().any(|e: &Proposal| e.id == p.id) {
                        proposals.push(p);
                    }
                }
                for change in journal {
                    _ = apply(&mut proposals, &self.filter, change);
                }
                self.proposals = proposals;
                self.status = Status::Ready;
            }
            Err(msg) => self.status = Status::Error(msg),
        }
    }

    /// Applies the provided [`proposal::Change`] to this [`ProposalList`].
    ///
    /// Returns whether the listed [`Proposal`]s have changed.
    pub fn apply(&mut self, change: proposal::Change) -> bool {
        if self.status == Status::Loading {
            self.journal.push(change.clone());
        }
        apply(&mut self.proposals, &self.filter, change)
    }
}

/// Applies the provided [`proposal::Change`] to the `proposals` listed with
/// the provided [`Filter`].
///
/// Returns whether the `proposals` have changed.
fn apply(
    proposals: &mut Vec<Proposal>,
    filter: &Filter,
    change: proposal::Change,
) -> bool {
    let pos = proposals.iter().position(|p| &p.id == change.id());
    match (change, pos) {
        (proposal::Change::Inserted(p), None) => {
            if !filter.matches(&p) {
                return false;
            }
            proposals.push(p);
            filter.sort(proposals);
            true
        }
        (proposal::Change::Updated(p), Some(i)) => {
            // Position is kept even if the title has changed.
            proposals[i] = p;
            true
        }
        (proposal::Change::Deleted(_), Some(i)) => {
            _ = proposals.remove(i);
            true
        }
        (proposal::Change::Inserted(_), Some(_))
        | (proposal::Change::Updated(_) | proposal::Change::Deleted(_), None) => {
            false
        }
    }
}
