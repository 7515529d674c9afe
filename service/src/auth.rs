//! Authentication [`State`] of a single client.

use std::convert::Infallible;

use futures::{future, stream, Stream, StreamExt as _};
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{
        login, logout, register, request_password_reset, update_profile,
        Login, Logout, Register, RequestPasswordReset, UpdateProfile,
    },
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::backend::{self, auth::SignedUp, Subscription},
    query::user::{Current, SessionChanges},
    Command, Query,
};

/// Status of an authentication [`State`].
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    /// Current [`User`] is being resolved.
    Loading,

    /// Current [`User`] is resolved, being [`None`] if nobody is signed in.
    Resolved(Option<User>),
}

/// Authentication state of a single client.
///
/// Zero or one [`User`] is current at any time. The state is changed by the
/// operations of this [`State`] and by the [`session::Change`]s of the
/// current [`User`], see [`State::apply()`].
#[derive(Debug)]
pub struct State<S> {
    /// Service to perform the operations with.
    service: S,

    /// Current [`Status`].
    status: Status,

    /// [`session::Token`] of the current [`User`].
    token: Option<session::Token>,

    /// ID of the signed-in [`User`], scoping the applied
    /// [`session::Change`]s.
    scope: Option<user::Id>,
}

impl<S> State<S> {
    /// Creates a new [`Status::Loading`] [`State`] operating via the
    /// provided service.
    #[must_use]
    pub fn new(service: S) -> Self {
        Self {
            service,
            status: Status::Loading,
            token: None,
            scope: None,
        }
    }

    /// Returns the current [`Status`].
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Returns the current [`User`], if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match &self.status {
            Status::Resolved(user) => user.as_ref(),
            Status::Loading => None,
        }
    }

    /// Returns the [`session::Token`] of the current [`User`], if any.
    #[must_use]
    pub fn token(&self) -> Option<&session::Token> {
        self.token.as_ref()
    }

    /// Applies the provided [`session::Change`], replacing the current
    /// [`User`] wholesale.
    ///
    /// Only [`session::Change`]s of the signed-in [`User`] are applied: no
    /// [`User`] is resolved without a [`session::Token`] to act on its
    /// behalf. Returns whether the [`Status`] has changed.
    pub fn apply(&mut self, change: session::Change) -> bool {
        if self.token.is_none() || self.scope.as_ref() != Some(&change.user_id)
        {
            return false;
        }
        let user = match change.event {
            session::Event::SignedOut => {
                self.token = None;
                self.scope = None;
                None
            }
            session::Event::SignedIn
            | session::Event::TokenRefreshed
            | session::Event::UserUpdated => change.user,
        };
        let status = Status::Resolved(user);
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    /// Resolves this [`State`] to the provided [`User`].
    fn resolve(&mut self, user: Option<User>) {
        self.scope = user.as_ref().map(|u| u.id.clone());
        self.status = Status::Resolved(user);
    }

    /// Signs in with the provided [`Session`].
    fn sign_in(&mut self, session: Session) {
        self.token = Some(session.token);
        self.resolve(Some(session.user));
    }

    /// Initializes this [`State`] by resolving the [`User`] owning the
    /// provided [`session::Token`].
    ///
    /// Resolves to no [`User`] on any error.
    pub async fn initialize(&mut self, token: Option<session::Token>)
    where
        S: Query<Current, Ok = Option<User>, Err = Infallible>,
    {
        self.status = Status::Loading;
        let user = match &token {
            Some(t) => match self.service.execute(Current(t.clone())).await {
                Ok(user) => user,
                Err(e) => match e {},
            },
            None => None,
        };
        self.token = token.filter(|_| user.is_some());
        self.resolve(user);
    }

    /// Subscribes to the [`session::Change`]s, to be [`State::apply()`]ed.
    ///
    /// # Errors
    ///
    /// If the backend fails to open the subscription.
    pub async fn subscribe(
        &self,
    ) -> Result<Subscription<session::Change>, Traced<backend::Error>>
    where
        S: Query<
            SessionChanges,
            Ok = Subscription<session::Change>,
            Err = Traced<backend::Error>,
        >,
    {
        self.service.execute(SessionChanges::by(())).await
    }

    /// Signs in with the provided credentials.
    ///
    /// # Errors
    ///
    /// See [`login::ExecutionError`].
    pub async fn login(
        &mut self,
        cmd: Login,
    ) -> Result<Session, Traced<login::ExecutionError>>
    where
        S: Command<Login, Ok = Session, Err = Traced<login::ExecutionError>>,
    {
        let session = self.service.execute(cmd).await?;
        self.sign_in(session.clone());
        Ok(session)
    }

    /// Registers a new [`User`], signing in if the backend issues a
    /// [`Session`] right away.
    ///
    /// # Errors
    ///
    /// See [`register::ExecutionError`].
    pub async fn register(
        &mut self,
        cmd: Register,
    ) -> Result<SignedUp, Traced<register::ExecutionError>>
    where
        S: Command<
            Register,
            Ok = SignedUp,
            Err = Traced<register::ExecutionError>,
        >,
    {
        let signed_up = self.service.execute(cmd).await?;
        if let SignedUp::Session(session) = &signed_up {
            self.sign_in(session.as_ref().clone());
        }
        Ok(signed_up)
    }

    /// Signs out the current [`User`].
    ///
    /// This [`State`] is cleared only once the backend confirms.
    ///
    /// # Errors
    ///
    /// See [`logout::ExecutionError`].
    pub async fn logout(&mut self) -> Result<(), Traced<logout::ExecutionError>>
    where
        S: Command<Logout, Ok = (), Err = Traced<logout::ExecutionError>>,
    {
        if let Some(token) = self.token.clone() {
            self.service.execute(Logout { token }).await?;
        }
        self.token = None;
        self.resolve(None);
        Ok(())
    }

    /// Requests a password reset email.
    ///
    /// # Errors
    ///
    /// See [`request_password_reset::ExecutionError`].
    pub async fn reset_password(
        &self,
        cmd: RequestPasswordReset,
    ) -> Result<(), Traced<request_password_reset::ExecutionError>>
    where
        S: Command<
            RequestPasswordReset,
            Ok = (),
            Err = Traced<request_password_reset::ExecutionError>,
        >,
    {
        self.service.execute(cmd).await
    }

    /// Updates the profile of the current [`User`].
    ///
    /// # Errors
    ///
    /// See [`update_profile::ExecutionError`].
    pub async fn update(
        &mut self,
        mut cmd: UpdateProfile,
    ) -> Result<User, Traced<update_profile::ExecutionError>>
    where
        S: Command<
            UpdateProfile,
            Ok = User,
            Err = Traced<update_profile::ExecutionError>,
        >,
    {
        if cmd.token.is_none() {
            cmd.token.clone_from(&self.token);
        }
        let user = self.service.execute(cmd).await?;
        self.resolve(Some(user.clone()));
        Ok(user)
    }

    /// Watches the [`Status`] of the [`User`] owning the provided
    /// [`session::Token`].
    ///
    /// The returned [`Stream`] yields the initially resolved [`Status`] and
    /// then every [`Status`] change caused by a [`session::Change`]. It ends
    /// once the backend closes the [`session::Change`]s feed.
    pub fn watch(
        mut self,
        token: Option<session::Token>,
    ) -> impl Stream<Item = Status>
    where
        S: Query<Current, Ok = Option<User>, Err = Infallible>
            + Query<
                SessionChanges,
                Ok = Subscription<session::Change>,
                Err = Traced<backend::Error>,
            >,
    {
        stream::once(async move {
            // Subscribe first, so no change is missed while resolving.
            let changes = self
                .subscribe()
                .await
                .map_err(|e| {
                    log::error!("failed to subscribe to session changes: {e}");
                })
                .ok();
            self.initialize(token).await;
            (self, changes)
        })
        .flat_map(|(state, changes)| {
            let initial = stream::once(future::ready(state.status.clone()));
            let rest = stream::unfold(
                (state, changes),
                |(mut state, mut changes)| async move {
                    let feed = changes.as_mut()?;
                    while let Some(change) = feed.next().await {
                        if state.apply(change) {
                            let status = state.status.clone();
                            return Some((status, (state, changes)));
                        }
                    }
                    None
                },
            );
            initial.chain(rest)
        })
    }
}

#[cfg(test)]
mod spec {
    use futures::StreamExt as _;
    use secrecy::SecretBox;

    use crate::{
        command::{Login, Register, UpdateProfile},
        domain::user::{self, session},
        infra::{backend::auth::SignedUp, InMemory},
        Command as _,
    };

    use super::{State, Status};

    fn demo_login() -> Login {
        Login {
            email: InMemory::DEMO_EMAIL.into(),
            password: SecretBox::new(Box::new(InMemory::DEMO_PASSWORD.into())),
        }
    }

    #[tokio::test]
    async fn initializes_anonymous() {
        let mut state = State::new(crate::spec::service());
        assert_eq!(state.status(), &Status::Loading);

        state.initialize(None).await;
        assert_eq!(state.status(), &Status::Resolved(None));

        state.initialize(Some("garbage".parse().unwrap())).await;
        assert_eq!(state.status(), &Status::Resolved(None));
        assert!(state.token().is_none());
    }

    #[tokio::test]
    async fn initializes_from_session() {
        let svc = crate::spec::service();
        let session = svc.execute(demo_login()).await.unwrap();
        let mut state = State::new(svc);

        state.initialize(Some(session.token.clone())).await;

        assert_eq!(
            state.user().map(|u| u.id.to_string()).as_deref(),
            Some(InMemory::DEMO_USER_ID),
        );
        assert_eq!(state.token(), Some(&session.token));
    }

    #[tokio::test]
    async fn initializes_anonymous_on_error() {
        let mut state = State::new(crate::spec::failing());

        state.initialize(Some("whatever".parse().unwrap())).await;

        assert_eq!(state.status(), &Status::Resolved(None));
    }

    #[tokio::test]
    async fn login_then_logout() {
        let mut state = State::new(crate::spec::service());
        state.initialize(None).await;

        let session = state.login(demo_login()).await.unwrap();
        assert_eq!(state.user(), Some(&session.user));

        state.logout().await.unwrap();
        assert_eq!(state.status(), &Status::Resolved(None));
        assert!(state.token().is_none());
    }

    #[tokio::test]
    async fn failed_logout_keeps_user() {
        let svc = crate::spec::service();
        let session = svc.execute(demo_login()).await.unwrap();
        let mut state = State::new(crate::spec::failing());
        state.token = Some(session.token);
        state.resolve(Some(session.user.clone()));

        let err = state.logout().await.unwrap_err();

        assert_eq!(
            err.as_ref().to_string(),
            format!("Failed to log out: {}", crate::spec::FAILURE),
        );
        assert_eq!(state.user(), Some(&session.user));
    }

    #[tokio::test]
    async fn failed_login_keeps_status() {
        let mut state = State::new(crate::spec::service());
        state.initialize(None).await;

        let err = state
            .login(Login {
                email: InMemory::DEMO_EMAIL.into(),
                password: SecretBox::new(Box::new("wrong1".into())),
            })
            .await
            .unwrap_err();

        assert_eq!(err.as_ref().to_string(), "Email or password is incorrect");
        assert_eq!(state.status(), &Status::Resolved(None));
    }

    #[tokio::test]
    async fn register_signs_in() {
        let mut state = State::new(crate::spec::service());
        state.initialize(None).await;

        let signed_up = state
            .register(Register {
                email: "new@teste.com".into(),
                password: SecretBox::new(Box::new("Abc123".into())),
                metadata: user::Metadata::default(),
            })
            .await
            .unwrap();

        assert!(matches!(signed_up, SignedUp::Session(_)));
        assert_eq!(
            state.user().map(|u| u.email.to_string()).as_deref(),
            Some("new@teste.com"),
        );
        assert!(state.token().is_some());
    }

    #[tokio::test]
    async fn update_uses_own_token() {
        let mut state = State::new(crate::spec::service());
        _ = state.login(demo_login()).await.unwrap();

        let user = state
            .update(UpdateProfile {
                metadata: Some(
                    serde_json::from_str(r#"{"full_name":"Demo"}"#).unwrap(),
                ),
                ..UpdateProfile::default()
            })
            .await
            .unwrap();

        assert_eq!(state.user(), Some(&user));
        assert_eq!(user.metadata["full_name"], "Demo");
    }

    #[tokio::test]
    async fn applies_own_changes_only() {
        let mut state = State::new(crate::spec::service());
        let session = state.login(demo_login()).await.unwrap();

        assert!(!state.apply(session::Change {
            event: session::Event::SignedOut,
            user_id: "someone-else".into(),
            user: None,
        }));
        assert_eq!(state.user(), Some(&session.user));

        let mut renamed = session.user.clone();
        _ = renamed
            .metadata
            .insert("full_name".into(), "Renamed".into());
        assert!(state.apply(session::Change {
            event: session::Event::UserUpdated,
            user_id: session.user.id.clone(),
            user: Some(renamed.clone()),
        }));
        assert_eq!(state.user(), Some(&renamed));

        assert!(state.apply(session::Change {
            event: session::Event::SignedOut,
            user_id: session.user.id.clone(),
            user: None,
        }));
        assert_eq!(state.status(), &Status::Resolved(None));
        assert!(state.token().is_none());
    }

    #[tokio::test]
    async fn ignores_changes_while_anonymous() {
        let svc = crate::spec::service();
        let session = svc.execute(demo_login()).await.unwrap();
        let mut state = State::new(svc);
        state.initialize(None).await;

        assert!(!state.apply(session::Change {
            event: session::Event::SignedIn,
            user_id: session.user.id.clone(),
            user: Some(session.user),
        }));
        assert_eq!(state.status(), &Status::Resolved(None));
        assert!(state.token().is_none());
    }

    #[tokio::test]
    async fn signed_out_stops_applying_changes() {
        let mut state = State::new(crate::spec::service());
        let session = state.login(demo_login()).await.unwrap();

        assert!(state.apply(session::Change {
            event: session::Event::SignedOut,
            user_id: session.user.id.clone(),
            user: None,
        }));
        assert!(!state.apply(session::Change {
            event: session::Event::SignedIn,
            user_id: session.user.id.clone(),
            user: Some(session.user.clone()),
        }));

        assert_eq!(state.status(), &Status::Resolved(None));
        assert!(state.user().is_none());
        assert!(state.token().is_none());
    }

    #[tokio::test]
    async fn watches_session_changes() {
        let svc = crate::spec::service();
        let session = svc.execute(demo_login()).await.unwrap();
        let statuses =
            State::new(svc.clone()).watch(Some(session.token.clone()));
        tokio::pin!(statuses);

        let initial = statuses.next().await.unwrap();
        assert_eq!(initial, Status::Resolved(Some(session.user.clone())));

        assert_eq!(svc.backend().sessions().revoked(&session.token), Some(
            session.user.id.clone(),
        ));
        assert_eq!(statuses.next().await.unwrap(), Status::Resolved(None));
    }
}
