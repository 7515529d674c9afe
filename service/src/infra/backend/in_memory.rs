//! [`InMemory`] [`Backend`] implementation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use common::{
    operations::{By, Delete, Insert, Select, Subscribe},
    DateTime,
};
use derive_more::Debug;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        proposal,
        user::{self, session, Session},
        Proposal, User,
    },
    read,
};

use super::{
    admin,
    auth::{
        RecoverPassword, RefreshSession, SignIn, SignOut, SignUp, SignedUp,
        UpdateUser,
    },
    Backend, Error, Hub, Sessions, Subscription,
};

/// [`InMemory`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Secret to sign the issued [JWT] access tokens with.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[default(SecretString::from("in-memory-backend-secret"))]
    pub jwt_secret: SecretString,

    /// Lifetime of the issued [`Session`]s.
    #[default(Duration::from_secs(60 * 60))]
    pub session_ttl: Duration,
}

/// [`Backend`] serving a small fixed dataset from memory.
///
/// Signs in with the single demo credentials pair [`InMemory::DEMO_EMAIL`]
/// and [`InMemory::DEMO_PASSWORD`] only. A [`User`] registered during the
/// process lifetime is reachable through the [`Session`] issued on
/// registration only. All the data resets on restart.
#[derive(Clone, Debug)]
pub struct InMemory {
    /// Shared state of this [`InMemory`] backend.
    inner: Arc<State>,
}

/// Shared state of an [`InMemory`] backend.
#[derive(Debug)]
struct State {
    /// Lifetime of the issued [`Session`]s.
    session_ttl: Duration,

    /// Key to sign the issued access tokens with.
    #[debug(skip)]
    encoding_key: jsonwebtoken::EncodingKey,

    /// Key to verify the presented access tokens with.
    #[debug(skip)]
    decoding_key: jsonwebtoken::DecodingKey,

    /// Stored [`Proposal`]s.
    proposals: Mutex<Vec<Proposal>>,

    /// Known [`User`]s keyed by their [`user::Email`]s.
    users: Mutex<HashMap<user::Email, User>>,

    /// Issued [`session::RefreshToken`]s with the access
    /// [`session::Token`]s they were issued along.
    refresh_tokens: Mutex<HashMap<String, session::Token>>,

    /// [`Hub`] of [`proposal::Change`]s.
    proposal_changes: Hub<proposal::Change>,

    /// Issued [`Session`]s.
    sessions: Sessions,
}

/// Claims of an access token issued by an [`InMemory`] backend.
#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    /// ID of the [`User`] owning the token.
    sub: user::Id,

    /// Unique ID of the token.
    jti: String,

    /// Expiration of the token.
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    exp: session::ExpirationDateTime,
}

impl InMemory {
    /// Email of the demo [`User`].
    pub const DEMO_EMAIL: &'static str = "demo@teste.com";

    /// Password of the demo [`User`].
    pub const DEMO_PASSWORD: &'static str = "123456";

    /// ID of the demo [`User`].
    pub const DEMO_USER_ID: &'static str = "mock-user-id-123";

    /// Creates a new [`InMemory`] backend populated with the demo dataset.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();

        // SAFETY: The demo address is a well-formed email.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let email = unsafe { user::Email::new_unchecked(Self::DEMO_EMAIL) };
        let demo = User {
            id: Self::DEMO_USER_ID.into(),
            email: email.clone(),
            created_at: Some(DateTime::now().coerce()),
            email_confirmed_at: Some(DateTime::now().coerce()),
            phone: None,
            metadata: user::Metadata::default(),
        };

        Self {
            inner: Arc::new(State {
                session_ttl: config.session_ttl,
                encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
                decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
                proposals: Mutex::new(demo_proposals()),
                users: Mutex::new(HashMap::from([(email, demo)])),
                refresh_tokens: Mutex::default(),
                proposal_changes: Hub::default(),
                sessions: Sessions::default(),
            }),
        }
    }

    /// Returns the [`Sessions`] issued by this [`InMemory`] backend.
    #[must_use]
    pub fn sessions(&self) -> &Sessions {
        &self.inner.sessions
    }

    /// Returns the number of the issued [`session::RefreshToken`]s still
    /// redeemable.
    #[cfg(test)]
    pub(crate) fn refresh_tokens_count(&self) -> usize {
        lock(&self.inner.refresh_tokens).len()
    }

    /// Applies the provided [`proposal::Change`] to the stored
    /// [`Proposal`]s and reports it to the change-feed subscribers, as if it
    /// happened remotely.
    pub fn emit(&self, change: proposal::Change) {
        {
            let mut proposals = lock(&self.inner.proposals);
            match &change {
                proposal::Change::Inserted(p) => {
                    if !proposals.iter().any(|e| e.id == p.id) {
                        proposals.push(p.clone());
                    }
                }
                proposal::Change::Updated(p) => {
                    if let Some(e) = proposals.iter_mut().find(|e| e.id == p.id)
                    {
                        *e = p.clone();
                    }
                }
                proposal::Change::Deleted(id) => {
                    proposals.retain(|e| &e.id != id);
                }
            }
        }
        self.inner.proposal_changes.publish(&change);
    }

    /// Issues a new [`Session`] for the provided [`User`].
    fn issue_session(&self, user: User) -> Result<Session, Traced<Error>> {
        let expires_at =
            (DateTime::now() + self.inner.session_ttl).coerce();
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &Claims {
                sub: user.id.clone(),
                jti: uuid::Uuid::new_v4().to_string(),
                exp: expires_at,
            },
            &self.inner.encoding_key,
        )
        .map_err(tracerr::from_and_wrap!(=> Error))?;

        // SAFETY: `jsonwebtoken::encode` always returns a valid
        //         `session::Token`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked(token) };
        let refresh = uuid::Uuid::new_v4().to_string();
        _ = lock(&self.inner.refresh_tokens)
            .insert(refresh.clone(), token.clone());
        // SAFETY: Any random string is a valid `session::RefreshToken`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let refresh_token =
            unsafe { session::RefreshToken::new_unchecked(refresh) };

        Ok(Session {
            token,
            refresh_token: Some(refresh_token),
            expires_at,
            user,
        })
    }

    /// Resolves the [`User`] owning the provided live [`session::Token`].
    fn authenticate(&self, token: &session::Token) -> Option<User> {
        let mut validation = jsonwebtoken::Validation::default();
        validation.leeway = 0;
        let claims = jsonwebtoken::decode::<Claims>(
            token.as_ref(),
            &self.inner.decoding_key,
            &validation,
        )
        .ok()?
        .claims;

        let owner = self.inner.sessions.owner(token)?;
        if owner != claims.sub {
            return None;
        }
        self.user(&owner)
    }

    /// Returns the known [`User`] with the provided [`user::Id`].
    fn user(&self, id: &user::Id) -> Option<User> {
        lock(&self.inner.users)
            .values()
            .find(|u| &u.id == id)
            .cloned()
    }
}

/// Locks the provided [`Mutex`], ignoring its poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the demo [`Proposal`]s dataset.
fn demo_proposals() -> Vec<Proposal> {
    [
        "Sistema Web",
        "App Mobile",
        "Dashboard",
        "E-commerce",
        "Landing Page",
        "Sistema ERP",
    ]
    .into_iter()
    .zip(1..)
    .filter_map(|(name, n)| {
        Some(Proposal {
            id: proposal::Id::new(format!("DEMO{n:03}"))?,
            title: format!("Proposta Demo - {name}").into(),
            url: format!("https://example.com/proposta-{n}").into(),
        })
    })
    .collect()
}

impl Backend<SignIn> for InMemory {
    type Ok = Session;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        SignIn { email, password }: SignIn,
    ) -> Result<Self::Ok, Self::Err> {
        let is_demo = email.as_ref() == Self::DEMO_EMAIL
            && *password.expose_secret()
                == user::Password::from(Self::DEMO_PASSWORD);
        let user = is_demo
            .then(|| self.user(&Self::DEMO_USER_ID.into()))
            .flatten()
            .ok_or_else(|| Error::rejected("Invalid login credentials"))
            .map_err(tracerr::wrap!())?;

        let session = self.issue_session(user)?;
        self.inner.sessions.issued(&session);
        Ok(session)
    }
}

impl Backend<SignUp> for InMemory {
    type Ok = SignedUp;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        SignUp {
            email,
            password: _,
            metadata,
        }: SignUp,
    ) -> Result<Self::Ok, Self::Err> {
        let user = {
            let mut users = lock(&self.inner.users);
            if users.contains_key(&email) {
                return Err(tracerr::new!(Error::rejected(
                    "User already registered"
                )));
            }
            let user = User {
                id: user::Id::random(),
                email: email.clone(),
                created_at: Some(DateTime::now().coerce()),
                email_confirmed_at: None,
                phone: None,
                metadata,
            };
            _ = users.insert(email, user.clone());
            user
        };

        let session = self.issue_session(user)?;
        self.inner.sessions.issued(&session);
        Ok(SignedUp::Session(Box::new(session)))
    }
}

impl Backend<SignOut> for InMemory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        SignOut(token): SignOut,
    ) -> Result<Self::Ok, Self::Err> {
        if self.inner.sessions.revoked(&token).is_none() {
            log::debug!("signing out an unknown session");
        }
        lock(&self.inner.refresh_tokens).retain(|_, t| t != &token);
        Ok(())
    }
}

impl Backend<RefreshSession> for InMemory {
    type Ok = Session;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        RefreshSession(refresh): RefreshSession,
    ) -> Result<Self::Ok, Self::Err> {
        let old = lock(&self.inner.refresh_tokens)
            .remove(refresh.as_ref())
            .ok_or_else(|| Error::rejected("Invalid Refresh Token"))
            .map_err(tracerr::wrap!())?;
        let user = self
            .authenticate(&old)
            .ok_or_else(|| Error::rejected("Invalid Refresh Token"))
            .map_err(tracerr::wrap!())?;

        let session = self.issue_session(user)?;
        self.inner.sessions.refreshed(&old, &session);
        Ok(session)
    }
}

impl Backend<RecoverPassword> for InMemory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        RecoverPassword { email, .. }: RecoverPassword,
    ) -> Result<Self::Ok, Self::Err> {
        log::info!("password recovery email simulated for `{email}`");
        Ok(())
    }
}

impl Backend<UpdateUser> for InMemory {
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        UpdateUser {
            token,
            email,
            password,
            metadata,
        }: UpdateUser,
    ) -> Result<Self::Ok, Self::Err> {
        let current = self
            .authenticate(&token)
            .ok_or_else(|| Error::rejected("User not authenticated"))
            .map_err(tracerr::wrap!())?;

        if password.is_some() {
            log::info!("password change simulated for `{}`", current.email);
        }

        let user = {
            let mut users = lock(&self.inner.users);
            let mut user = users
                .remove(&current.email)
                .ok_or_else(|| Error::rejected("User not authenticated"))
                .map_err(tracerr::wrap!())?;

            if let Some(email) = email {
                if email != current.email && users.contains_key(&email) {
                    _ = users.insert(current.email, user);
                    return Err(tracerr::new!(Error::rejected(
                        "A user with this email address has already been \
                         registered",
                    )));
                }
                user.email = email;
            }
            if let Some(metadata) = metadata {
                user.metadata.merge(metadata);
            }

            _ = users.insert(user.email.clone(), user.clone());
            user
        };

        self.inner.sessions.user_updated(&user);
        Ok(user)
    }
}

impl Backend<Select<By<Option<User>, session::Token>>> for InMemory {
    type Ok = Option<User>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.authenticate(by.as_inner()))
    }
}

impl Backend<Subscribe<By<session::Change, ()>>> for InMemory {
    type Ok = Subscription<session::Change>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Subscribe<By<session::Change, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.inner.sessions.subscribe())
    }
}

impl Backend<Delete<By<Session, session::ExpirationDateTime>>> for InMemory {
    type Ok = usize;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let swept = self.inner.sessions.sweep(by.into_inner());
        lock(&self.inner.refresh_tokens)
            .retain(|_, t| self.inner.sessions.owner(t).is_some());
        Ok(swept)
    }
}

impl Backend<Select<By<Vec<Proposal>, read::proposal::list::Selector>>>
    for InMemory
{
    type Ok = Vec<Proposal>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Proposal>, read::proposal::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::proposal::list::Selector { filter, .. } = by.into_inner();
        let all = lock(&self.inner.proposals).clone();
        Ok(filter.apply(all))
    }
}

impl Backend<Select<By<Option<Proposal>, read::proposal::Selector>>>
    for InMemory
{
    type Ok = Option<Proposal>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Proposal>, read::proposal::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = &by.as_inner().id;
        Ok(lock(&self.inner.proposals)
            .iter()
            .find(|p| &p.id == id)
            .cloned())
    }
}

impl Backend<Subscribe<By<proposal::Change, Option<session::Token>>>>
    for InMemory
{
    type Ok = Subscription<proposal::Change>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Subscribe<By<proposal::Change, Option<session::Token>>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.inner.proposal_changes.subscribe())
    }
}

impl Backend<Select<By<Vec<User>, admin::All>>> for InMemory {
    type Ok = Vec<User>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<User>, admin::All>>,
    ) -> Result<Self::Ok, Self::Err> {
        Err(tracerr::new!(Error::AdminUnavailable))
    }
}

impl Backend<Insert<admin::NewUser>> for InMemory {
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Insert<admin::NewUser>,
    ) -> Result<Self::Ok, Self::Err> {
        Err(tracerr::new!(Error::AdminUnavailable))
    }
}

impl Backend<Delete<By<User, user::Id>>> for InMemory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Err(tracerr::new!(Error::AdminUnavailable))
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select, Subscribe};
    use futures::StreamExt as _;
    use secrecy::SecretBox;

    use crate::{
        domain::{
            proposal,
            user::{self, session},
            Proposal, User,
        },
        infra::backend::{
            auth::{SignIn, SignOut, SignUp, SignedUp, UpdateUser},
            Backend as _,
        },
        read::proposal::list::{Filter, SearchTerm, Selector},
    };

    use super::{Config, InMemory};

    fn backend() -> InMemory {
        InMemory::new(&Config::default())
    }

    fn sign_in(email: &str, password: &str) -> SignIn {
        SignIn {
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(password.into())),
        }
    }

    #[tokio::test]
    async fn serves_demo_proposals() {
        let list = backend()
            .execute(Select(By::new(Selector::default())))
            .await
            .unwrap();

        assert_eq!(list.len(), 6);
        assert!(list.iter().all(|p| p.id.as_ref().starts_with("DEMO")));
        assert!(list.windows(2).all(|w| {
            Filter::default().compare(&w[0], &w[1]).is_le()
        }));
    }

    #[tokio::test]
    async fn searches_demo_proposals() {
        let list = backend()
            .execute(Select(By::new(Selector {
                filter: Filter {
                    search: SearchTerm::new("Demo - App"),
                    ..Filter::default()
                },
                token: None,
            })))
            .await
            .unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title.as_ref(), "Proposta Demo - App Mobile");
    }

    #[tokio::test]
    async fn accepts_only_demo_credentials() {
        let backend = backend();

        let session = backend
            .execute(sign_in(InMemory::DEMO_EMAIL, InMemory::DEMO_PASSWORD))
            .await
            .unwrap();
        assert_eq!(session.user.id.as_ref(), InMemory::DEMO_USER_ID);

        let err = backend
            .execute(sign_in(InMemory::DEMO_EMAIL, "654321"))
            .await
            .unwrap_err();
        assert!(err.as_ref().is_rejected_with("Invalid login credentials"));

        let err = backend
            .execute(sign_in("other@teste.com", InMemory::DEMO_PASSWORD))
            .await
            .unwrap_err();
        assert!(err.as_ref().is_rejected_with("Invalid login credentials"));
    }

    #[tokio::test]
    async fn resolves_user_by_live_token_only() {
        let backend = backend();
        let session = backend
            .execute(sign_in(InMemory::DEMO_EMAIL, InMemory::DEMO_PASSWORD))
            .await
            .unwrap();

        let user: Option<User> = backend
            .execute(Select(By::new(session.token.clone())))
            .await
            .unwrap();
        assert_eq!(user.map(|u| u.id), Some(session.user.id.clone()));

        backend.execute(SignOut(session.token.clone())).await.unwrap();

        let user: Option<User> = backend
            .execute(Select(By::new(session.token)))
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn registers_once() {
        let backend = backend();
        let sign_up = || SignUp {
            email: user::Email::new("new@teste.com").unwrap(),
            password: SecretBox::new(Box::new("Abc123".into())),
            metadata: user::Metadata::default(),
        };

        let signed_up = backend.execute(sign_up()).await.unwrap();
        assert_ne!(signed_up.user().id.as_ref(), InMemory::DEMO_USER_ID);

        let err = backend.execute(sign_up()).await.unwrap_err();
        assert!(err.as_ref().is_rejected_with("User already registered"));
    }

    #[tokio::test]
    async fn registered_user_cannot_sign_in() {
        let backend = backend();
        let signed_up = backend
            .execute(SignUp {
                email: user::Email::new("other@teste.com").unwrap(),
                password: SecretBox::new(Box::new("Abc123".into())),
                metadata: user::Metadata::default(),
            })
            .await
            .unwrap();
        let SignedUp::Session(session) = signed_up else {
            panic!("expected `SignedUp::Session`");
        };

        let user: Option<User> = backend
            .execute(Select(By::new(session.token.clone())))
            .await
            .unwrap();
        assert_eq!(user.map(|u| u.id), Some(session.user.id.clone()));

        let err = backend
            .execute(sign_in("other@teste.com", "Abc123"))
            .await
            .unwrap_err();
        assert!(err.as_ref().is_rejected_with("Invalid login credentials"));
    }

    #[tokio::test]
    async fn updates_user_and_reports_it() {
        let backend = backend();
        let session = backend
            .execute(sign_in(InMemory::DEMO_EMAIL, InMemory::DEMO_PASSWORD))
            .await
            .unwrap();
        let mut changes = backend
            .execute(Subscribe(By::<session::Change, _>::new(())))
            .await
            .unwrap();

        let metadata: user::Metadata =
            serde_json::from_str(r#"{"full_name":"Demo"}"#).unwrap();
        let user = backend
            .execute(UpdateUser {
                token: session.token,
                email: None,
                password: None,
                metadata: Some(metadata),
            })
            .await
            .unwrap();
        assert_eq!(user.metadata["full_name"], "Demo");

        let change = changes.next().await.unwrap();
        assert_eq!(change.event, session::Event::UserUpdated);
        assert_eq!(change.user, Some(user));
    }

    #[tokio::test]
    async fn rejects_update_without_session() {
        // SAFETY: Garbage tokens are fine to be rejected.
        #[expect(unsafe_code, reason = "test")]
        let token = unsafe { session::Token::new_unchecked("garbage".into()) };

        let err = backend()
            .execute(UpdateUser {
                token,
                email: None,
                password: None,
                metadata: Some(user::Metadata::default()),
            })
            .await
            .unwrap_err();

        assert!(err.as_ref().is_rejected_with("not authenticated"));
    }

    #[tokio::test]
    async fn emits_proposal_changes() {
        let backend = backend();
        let mut feed = backend
            .execute(Subscribe(By::<proposal::Change, _>::new(None)))
            .await
            .unwrap();

        let new = Proposal {
            id: proposal::Id::new("NEW1").unwrap(),
            title: "Nova".into(),
            url: proposal::Url::default(),
        };
        backend.emit(proposal::Change::Inserted(new.clone()));

        assert_eq!(feed.next().await, Some(proposal::Change::Inserted(new)));

        let list = backend
            .execute(Select(By::new(Selector::default())))
            .await
            .unwrap();
        assert_eq!(list.len(), 7);
    }
}
