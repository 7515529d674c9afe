//! [`Sessions`] registry.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::domain::{
    user::{
        self,
        session::{self, Change, Event},
        Session,
    },
    User,
};

use super::{Hub, Subscription};

/// Registry of the [`Session`]s issued by a [`Backend`], reporting their
/// transitions as [`session::Change`]s.
///
/// [`Backend`]: super::Backend
#[derive(Clone, Debug, Default)]
pub struct Sessions {
    /// Live [`Session`]s keyed by their access [`session::Token`]s.
    issued: Arc<Mutex<HashMap<session::Token, Issued>>>,

    /// [`Hub`] of [`session::Change`]s.
    changes: Hub<Change>,
}

/// Bookkeeping of an issued [`Session`].
#[derive(Clone, Debug)]
struct Issued {
    /// ID of the [`User`] owning the [`Session`].
    user_id: user::Id,

    /// Expiration of the [`Session`].
    expires_at: session::ExpirationDateTime,
}

impl Sessions {
    /// Registers the provided newly issued [`Session`].
    pub fn issued(&self, session: &Session) {
        self.insert(session);
        self.changes.publish(&Change {
            event: Event::SignedIn,
            user_id: session.user.id.clone(),
            user: Some(session.user.clone()),
        });
    }

    /// Replaces the [`Session`] with the `old` [`session::Token`] by the
    /// provided refreshed one.
    pub fn refreshed(&self, old: &session::Token, session: &Session) {
        _ = self.lock().remove(old);
        self.insert(session);
        self.changes.publish(&Change {
            event: Event::TokenRefreshed,
            user_id: session.user.id.clone(),
            user: Some(session.user.clone()),
        });
    }

    /// Revokes the [`Session`] with the provided [`session::Token`].
    ///
    /// Returns the ID of the [`User`] the revoked [`Session`] belonged to, if
    /// it was registered.
    pub fn revoked(&self, token: &session::Token) -> Option<user::Id> {
        let issued = self.lock().remove(token)?;
        self.changes.publish(&Change {
            event: Event::SignedOut,
            user_id: issued.user_id.clone(),
            user: None,
        });
        Some(issued.user_id)
    }

    /// Reports the attributes of the provided [`User`] being updated.
    pub fn user_updated(&self, user: &User) {
        self.changes.publish(&Change {
            event: Event::UserUpdated,
            user_id: user.id.clone(),
            user: Some(user.clone()),
        });
    }

    /// Returns the ID of the [`User`] owning the live [`Session`] with the
    /// provided [`session::Token`].
    #[must_use]
    pub fn owner(&self, token: &session::Token) -> Option<user::Id> {
        let issued = self.lock();
        let s = issued.get(token)?;
        (s.expires_at > session::ExpirationDateTime::now())
            .then(|| s.user_id.clone())
    }

    /// Drops all the [`Session`]s expired by the provided moment, reporting
    /// their owners as signed out.
    ///
    /// Returns the number of dropped [`Session`]s.
    pub fn sweep(&self, now: session::ExpirationDateTime) -> usize {
        let expired = {
            let mut issued = self.lock();
            let tokens: Vec<_> = issued
                .iter()
                .filter(|(_, s)| s.expires_at <= now)
                .map(|(t, _)| t.clone())
                .collect();
            tokens
                .into_iter()
                .filter_map(|t| issued.remove(&t))
                .collect::<Vec<_>>()
        };
        for s in &expired {
            self.changes.publish(&Change {
                event: Event::SignedOut,
                user_id: s.user_id.clone(),
                user: None,
            });
        }
        expired.len()
    }

    /// Opens a new [`Subscription`] to [`session::Change`]s.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<Change> {
        self.changes.subscribe()
    }

    /// Registers the provided [`Session`] without reporting it.
    fn insert(&self, session: &Session) {
        _ = self.lock().insert(
            session.token.clone(),
            Issued {
                user_id: session.user.id.clone(),
                expires_at: session.expires_at,
            },
        );
    }

    /// Locks the registered [`Session`]s.
    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<session::Token, Issued>> {
        self.issued.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
