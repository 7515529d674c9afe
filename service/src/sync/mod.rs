//! Realtime synchronization of a [`Proposal`]s list.
//!
//! [`watch()`] drives a [`ProposalList`]: it opens the change-feed, fetches
//! the snapshot concurrently, and yields a [`Snapshot`] on every transition.
//! The [`Filter`] may be changed at any time via [`Control`], which cancels
//! the current change-feed subscription and starts over.

mod list;

use std::mem;

use futures::{future, stream, Stream, StreamExt as _};
use tokio::sync::mpsc;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{proposal, user::session, Proposal},
    infra::backend::{self, Subscription},
    query::{self, proposals},
    read::proposal::list::{Filter, Selector},
    Query,
};

pub use self::list::{ProposalList, Snapshot, Status};

/// Handle controlling a [`watch()`]ed [`ProposalList`].
#[derive(Clone, Debug)]
pub struct Control(mpsc::UnboundedSender<Filter>);

impl Control {
    /// Restarts the [`watch()`]ed [`ProposalList`] with the provided
    /// [`Filter`].
    ///
    /// Returns `false` if the [`ProposalList`] is not watched anymore.
    pub fn set_filter(&self, filter: Filter) -> bool {
        self.0.send(filter).is_ok()
    }
}

/// Watches a [`ProposalList`] with the provided [`Filter`], on behalf of the
/// provided [`session::Token`] (if any).
///
/// The returned [`Stream`] starts with a [`Status::Loading`] [`Snapshot`] and
/// ends once both the change-feed and the [`Control`] are gone. Dropping the
/// [`Control`] fixes the [`Filter`] for the rest of the watch, while the
/// change-feed is still followed.
pub fn watch<S>(
    service: S,
    token: Option<session::Token>,
    filter: Filter,
) -> (Control, impl Stream<Item = Snapshot>)
where
    S: Query<
            proposals::List,
            Ok = Vec<Proposal>,
            Err = Traced<proposals::FetchError>,
        > + Query<
            proposals::Changes,
            Ok = Subscription<proposal::Change>,
            Err = Traced<backend::Error>,
        >,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let driver = Driver {
        service,
        token,
        state: State {
            list: ProposalList::new(),
            feed: None,
            control: Some(rx),
            phase: Phase::Restart(filter),
        },
    };
    (Control(tx), stream::unfold(driver, Driver::step))
}

/// Phase of a [`Driver`].
#[derive(Debug)]
enum Phase {
    /// [`ProposalList`] is to be restarted with the provided [`Filter`].
    Restart(Filter),

    /// Snapshot is to be fetched.
    Fetch,

    /// [`ProposalList`] is live.
    Live,
}

/// Driver of a [`watch()`]ed [`ProposalList`].
#[derive(Debug)]
struct Driver<S> {
    /// Service to fetch [`Proposal`]s and their changes from.
    service: S,

    /// [`session::Token`] to access the row store on behalf of.
    token: Option<session::Token>,

    /// [`State`] of this [`Driver`].
    state: State,
}

/// Mutable state of a [`Driver`].
#[derive(Debug)]
struct State {
    /// Driven [`ProposalList`].
    list: ProposalList,

    /// Current change-feed [`Subscription`].
    feed: Option<Subscription<proposal::Change>>,

    /// Receiver of the [`Control`] commands.
    control: Option<mpsc::UnboundedReceiver<Filter>>,

    /// Current [`Phase`].
    phase: Phase,
}

/// Event awaited by a [`Driver`].
enum Event {
    /// Snapshot has been fetched.
    Fetched(Result<Vec<Proposal>, String>),

    /// Change-feed delivered a [`proposal::Change`], or ended.
    Changed(Option<proposal::Change>),

    /// [`Control`] requested a new [`Filter`], or is gone.
    Control(Option<Filter>),
}

impl<S> Driver<S>
where
    S: Query<
            proposals::List,
            Ok = Vec<Proposal>,
            Err = Traced<proposals::FetchError>,
        > + Query<
            proposals::Changes,
            Ok = Subscription<proposal::Change>,
            Err = Traced<backend::Error>,
        >,
{
    /// Drives this [`Driver`] until the next [`Snapshot`] is ready.
    async fn step(mut self) -> Option<(Snapshot, Self)> {
        loop {
            let st = &mut self.state;
            match mem::replace(&mut st.phase, Phase::Live) {
                Phase::Restart(filter) => {
                    if let Some(feed) = st.feed.take() {
                        feed.cancel();
                    }
                    st.list.begin(filter);
                    st.phase = Phase::Fetch;
                    let snapshot = st.list.snapshot();
                    return Some((snapshot, self));
                }
                Phase::Fetch => {
                    if let Some(snapshot) = self.fetch().await {
                        return Some((snapshot, self));
                    }
                }
                Phase::Live => {
                    if st.feed.is_none() && st.control.is_none() {
                        return None;
                    }
                    let ev = tokio::select! {
                        ch = next(&mut st.feed) => Event::Changed(ch),
                        f = recv(&mut st.control) => Event::Control(f),
                    };
                    if let Some(snapshot) = st.handle(ev) {
                        return Some((snapshot, self));
                    }
                }
            }
        }
    }

    /// Subscribes to the change-feed and fetches the snapshot, applying the
    /// changes delivered meanwhile.
    ///
    /// Returns [`None`] if restarted before the snapshot is fetched.
    async fn fetch(&mut self) -> Option<Snapshot> {
        let Self {
            service,
            token,
            state: st,
        } = self;

        st.feed = <S as Query<proposals::Changes>>::execute(
            service,
            query::FeedQuery::by(token.clone()),
        )
        .await
        .map_err(|e| log::error!("failed to subscribe to proposals: {e}"))
        .ok();

        let selector = Selector {
            filter: st.list.filter().clone(),
            token: token.clone(),
        };
        let fetch = <S as Query<proposals::List>>::execute(
            service,
            proposals::List(selector),
        );
        tokio::pin!(fetch);

        loop {
            let ev = tokio::select! {
                res = &mut fetch => Event::Fetched(
                    res.map_err(|e| e.as_ref().to_string()),
                ),
                ch = next(&mut st.feed) => Event::Changed(ch),
                f = recv(&mut st.control) => Event::Control(f),
            };
            if let Event::Fetched(res) = ev {
                if let Err(e) = &res {
                    log::error!("{e}");
                }
                st.list.resolve(res);
                return Some(st.list.snapshot());
            }
            _ = st.handle(ev);
            if matches!(st.phase, Phase::Restart(_)) {
                return None;
            }
        }
    }
}

impl State {
    /// Handles the provided [`Event`], returning a new [`Snapshot`] if the
    /// [`ProposalList`] has visibly changed.
    fn handle(&mut self, ev: Event) -> Option<Snapshot> {
        match ev {
            Event::Changed(Some(change)) => {
                let changed = self.list.apply(change);
                (changed && *self.list.status() != Status::Loading)
                    .then(|| self.list.snapshot())
            }
            Event::Changed(None) => {
                log::warn!("proposals change-feed has ended");
                self.feed = None;
                None
            }
            Event::Control(Some(filter)) => {
                self.phase = Phase::Restart(filter);
                None
            }
            Event::Control(None) => {
                self.control = None;
                None
            }
            Event::Fetched(_) => None,
        }
    }
}

/// Awaits the next [`proposal::Change`] from the provided change-feed, if
/// any.
async fn next(
    feed: &mut Option<Subscription<proposal::Change>>,
) -> Option<proposal::Change> {
    match feed {
        Some(feed) => feed.next().await,
        None => future::pending().await,
    }
}

/// Awaits the next [`Filter`] from the provided [`Control`] receiver, if any.
async fn recv(
    control: &mut Option<mpsc::UnboundedReceiver<Filter>>,
) -> Option<Filter> {
    match control {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod spec {
    use futures::StreamExt as _;

    use crate::{
        domain::{
            proposal::{self, Change},
            Proposal,
        },
        read::proposal::list::{Filter, SearchTerm, SortOrder},
    };

    use super::{watch, Status};

    fn titles(proposals: &[Proposal]) -> Vec<&str> {
        proposals.iter().map(|p| p.title.as_ref()).collect()
    }

    #[tokio::test]
    async fn loads_then_follows_changes() {
        let svc = crate::spec::service();
        let (_control, stream) = watch(svc.clone(), None, Filter::default());
        tokio::pin!(stream);

        let loading = stream.next().await.unwrap();
        assert_eq!(loading.status, Status::Loading);

        let ready = stream.next().await.unwrap();
        assert_eq!(ready.status, Status::Ready);
        assert_eq!(ready.proposals.len(), 6);

        svc.backend().emit(Change::Inserted(Proposal {
            id: proposal::Id::new("NEW1").unwrap(),
            title: "Proposta Demo - Blog".into(),
            url: "https://example.com/proposta-7".into(),
        }));
        let inserted = stream.next().await.unwrap();
        assert_eq!(inserted.proposals.len(), 7);
        assert_eq!(titles(&inserted.proposals)[1], "Proposta Demo - Blog");

        svc.backend()
            .emit(Change::Deleted(proposal::Id::new("DEMO001").unwrap()));
        let deleted = stream.next().await.unwrap();
        assert_eq!(deleted.proposals.len(), 6);
        assert!(!titles(&deleted.proposals)
            .contains(&"Proposta Demo - Sistema Web"));
    }

    #[tokio::test]
    async fn skips_noop_changes() {
        let svc = crate::spec::service();
        let (_control, stream) = watch(svc.clone(), None, Filter::default());
        tokio::pin!(stream);
        _ = stream.next().await.unwrap();
        _ = stream.next().await.unwrap();

        svc.backend()
            .emit(Change::Deleted(proposal::Id::new("NOPE").unwrap()));
        svc.backend()
            .emit(Change::Deleted(proposal::Id::new("DEMO002").unwrap()));

        let next = stream.next().await.unwrap();
        assert_eq!(next.proposals.len(), 5);
    }

    #[tokio::test]
    async fn restarts_on_filter_change() {
        let svc = crate::spec::service();
        let (control, stream) = watch(svc.clone(), None, Filter::default());
        tokio::pin!(stream);
        _ = stream.next().await.unwrap();
        _ = stream.next().await.unwrap();

        let filter = Filter {
            search: SearchTerm::new("sistema"),
            order: SortOrder::Desc,
        };
        assert!(control.set_filter(filter.clone()));

        let loading = stream.next().await.unwrap();
        assert_eq!(loading.status, Status::Loading);
        assert_eq!(loading.filter, filter);

        let ready = stream.next().await.unwrap();
        assert_eq!(ready.status, Status::Ready);
        assert_eq!(
            titles(&ready.proposals),
            ["Proposta Demo - Sistema Web", "Proposta Demo - Sistema ERP"],
        );
    }

    #[tokio::test]
    async fn follows_changes_with_fixed_filter() {
        let svc = crate::spec::service();
        let (control, stream) = watch(svc.clone(), None, Filter::default());
        drop(control);
        tokio::pin!(stream);
        _ = stream.next().await.unwrap();
        assert_eq!(stream.next().await.unwrap().proposals.len(), 6);

        svc.backend()
            .emit(Change::Deleted(proposal::Id::new("DEMO003").unwrap()));

        let next = stream.next().await.unwrap();
        assert_eq!(next.status, Status::Ready);
        assert_eq!(next.proposals.len(), 5);
    }

    #[tokio::test]
    async fn reports_fetch_error() {
        let (control, stream) =
            watch(crate::spec::failing(), None, Filter::default());
        tokio::pin!(stream);

        assert_eq!(stream.next().await.unwrap().status, Status::Loading);
        assert_eq!(
            stream.next().await.unwrap().status,
            Status::Error(format!(
                "Failed to fetch proposals: {}",
                crate::spec::FAILURE,
            )),
        );
        // Neither the change-feed nor the control remain.
        drop(control);
        assert!(stream.next().await.is_none());
    }
}
