//! Service contains the business logic of the proposals dashboard: the
//! authentication use cases, the [`Proposal`] queries and the realtime
//! [`Proposal`]s list synchronization.
//!
//! [`Proposal`]: domain::Proposal
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod auth;
pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod sync;
pub mod task;

use common::operations::{By, Start};
use smart_default::SmartDefault;

#[cfg(doc)]
use infra::Backend;

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// [`task::SweepExpiredSessions`] configuration.
    pub sweep_expired_sessions: task::sweep_expired_sessions::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<B> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Backend`] of this [`Service`].
    backend: B,
}

impl<B> Service<B> {
    /// Creates a new [`Service`] with the provided parameters, along with
    /// its [`task::Background`] to be run.
    pub fn new(config: Config, backend: B) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::SweepExpiredSessions<Self>,
                        task::sweep_expired_sessions::Config,
                    >,
                >,
                Ok = (),
                Err: std::error::Error,
            > + Clone
            + 'static,
    {
        let this = Self::from_parts(config, backend);

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("SweepExpiredSessions", async move {
            svc.execute(Start(By::new(svc.config().sweep_expired_sessions)))
                .await
        });

        (this, bg)
    }

    /// Creates a new [`Service`] out of the provided parameters, without
    /// any background [`Task`]s.
    #[must_use]
    pub fn from_parts(config: Config, backend: B) -> Self {
        Self { config, backend }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Backend`] of this [`Service`].
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
pub(crate) mod spec {
    //! Test doubles shared across the crate.

    use common::operations::{By, Delete, Insert, Select, Subscribe};
    use tracerr::Traced;

    use crate::{
        domain::{
            proposal,
            user::{self, session, Session},
            Proposal, User,
        },
        infra::{
            backend::{self, admin, auth, Subscription},
            in_memory, Backend, InMemory,
        },
        read, Config, Service,
    };

    /// Message every [`Failing`] operation is rejected with.
    pub(crate) const FAILURE: &str = "Backend is down";

    /// Creates a new [`Service`] over a fresh [`InMemory`] backend.
    pub(crate) fn service() -> Service<InMemory> {
        Service::from_parts(
            Config::default(),
            InMemory::new(&in_memory::Config::default()),
        )
    }

    /// Creates a new [`Service`] over a [`Failing`] backend.
    pub(crate) fn failing() -> Service<Failing> {
        Service::from_parts(Config::default(), Failing)
    }

    /// [`Backend`] rejecting every operation with [`FAILURE`].
    #[derive(Clone, Copy, Debug)]
    pub(crate) struct Failing;

    /// Successful result of a [`Backend`] operation.
    pub(crate) trait Outcome {
        /// Type of the successful result.
        type Ok;
    }

    macro_rules! outcome {
        ($($op:ty => $ok:ty),* $(,)?) => {$(
            impl Outcome for $op {
                type Ok = $ok;
            }
        )*};
    }

    outcome! {
        auth::SignIn => Session,
        auth::SignUp => auth::SignedUp,
        auth::SignOut => (),
        auth::RefreshSession => Session,
        auth::RecoverPassword => (),
        auth::UpdateUser => User,
        Select<By<Option<User>, session::Token>> => Option<User>,
        Subscribe<By<session::Change, ()>> => Subscription<session::Change>,
        Select<By<Vec<Proposal>, read::proposal::list::Selector>>
            => Vec<Proposal>,
        Select<By<Option<Proposal>, read::proposal::Selector>>
            => Option<Proposal>,
        Subscribe<By<proposal::Change, Option<session::Token>>>
            => Subscription<proposal::Change>,
        Select<By<Vec<User>, admin::All>> => Vec<User>,
        Insert<admin::NewUser> => User,
        Delete<By<User, user::Id>> => (),
        Delete<By<Session, session::ExpirationDateTime>> => usize,
    }

    impl<Op: Outcome> Backend<Op> for Failing {
        type Ok = Op::Ok;
        type Err = Traced<backend::Error>;

        async fn execute(&self, _: Op) -> Result<Self::Ok, Self::Err> {
            Err(tracerr::new!(backend::Error::rejected(FAILURE)))
        }
    }
}
