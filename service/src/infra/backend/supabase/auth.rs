//! Auth API operations of the [`Supabase`] [`Backend`].

use common::operations::{By, Delete, Insert, Select, Subscribe};
use reqwest::Method;
use secrecy::ExposeSecret as _;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::backend::{
        admin,
        auth::{
            RecoverPassword, RefreshSession, SignIn, SignOut, SignUp,
            SignedUp, UpdateUser,
        },
        Backend, Error, Subscription,
    },
};

use super::{dto, Auth, Supabase};

impl Backend<SignIn> for Supabase {
    type Ok = Session;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        SignIn { email, password }: SignIn,
    ) -> Result<Self::Ok, Self::Err> {
        let req = self
            .request(
                Method::POST,
                "auth/v1/token?grant_type=password",
                Auth::Anon,
            )?
            .json(&dto::PasswordGrant {
                email: email.as_ref(),
                password: password.expose_secret().as_ref(),
            });
        let session: Session = Self::send::<dto::SessionDto>(req)
            .await?
            .try_into()
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        self.sessions().issued(&session);
        Ok(session)
    }
}

impl Backend<SignUp> for Supabase {
    type Ok = SignedUp;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        SignUp {
            email,
            password,
            metadata,
        }: SignUp,
    ) -> Result<Self::Ok, Self::Err> {
        let req = self
            .request(Method::POST, "auth/v1/signup", Auth::Anon)?
            .json(&dto::SignUpRequest {
                email: email.as_ref(),
                password: password.expose_secret().as_ref(),
                data: &metadata,
            });

        Ok(match Self::send::<dto::SignUpDto>(req).await? {
            dto::SignUpDto::Session(s) => {
                let session: Session = s
                    .try_into()
                    .map_err(tracerr::from_and_wrap!(=> Error))?;
                self.sessions().issued(&session);
                SignedUp::Session(Box::new(session))
            }
            dto::SignUpDto::User(u) => SignedUp::Unconfirmed(
                u.try_into().map_err(tracerr::from_and_wrap!(=> Error))?,
            ),
        })
    }
}

impl Backend<SignOut> for Supabase {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        SignOut(token): SignOut,
    ) -> Result<Self::Ok, Self::Err> {
        let req =
            self.request(Method::POST, "auth/v1/logout", Auth::User(&token))?;
        Self::send_empty(req).await?;

        _ = self.sessions().revoked(&token);
        Ok(())
    }
}

impl Backend<RefreshSession> for Supabase {
    type Ok = Session;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        RefreshSession(refresh): RefreshSession,
    ) -> Result<Self::Ok, Self::Err> {
        let req = self
            .request(
                Method::POST,
                "auth/v1/token?grant_type=refresh_token",
                Auth::Anon,
            )?
            .json(&serde_json::json!({ "refresh_token": refresh.as_ref() }));
        let session: Session = Self::send::<dto::SessionDto>(req)
            .await?
            .try_into()
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        // The previous access token stays valid until its own expiration,
        // so only the new one is registered.
        self.sessions().refreshed(&session.token, &session);
        Ok(session)
    }
}

impl Backend<RecoverPassword> for Supabase {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        RecoverPassword { email, redirect_to }: RecoverPassword,
    ) -> Result<Self::Ok, Self::Err> {
        let mut req =
            self.request(Method::POST, "auth/v1/recover", Auth::Anon)?;
        if let Some(to) = redirect_to
            .as_deref()
            .or(self.inner.password_reset_redirect.as_deref())
        {
            req = req.query(&[("redirect_to", to)]);
        }
        let req = req.json(&serde_json::json!({ "email": email.as_ref() }));

        Self::send_empty(req).await
    }
}

impl Backend<UpdateUser> for Supabase {
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
        let req = self
            .request(Method::PUT, "auth/v1/user", Auth::User(&token))?
            .json(&dto::UpdateUserRequest {
                email: email.as_ref().map(AsRef::as_ref),
                password: password
                    .as_ref()
                    .map(|p| p.expose_secret().as_ref()),
                data: metadata.as_ref(),
            });
        let user: User = Self::send::<dto::UserDto>(req)
            .await?
            .try_into()
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        self.sessions().user_updated(&user);
        Ok(user)
    }
}

impl Backend<Select<By<Option<User>, session::Token>>> for Supabase {
    type Ok = Option<User>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();
        let req =
            self.request(Method::GET, "auth/v1/user", Auth::User(&token))?;

        match Self::send::<dto::UserDto>(req).await {
            Ok(dto) => dto
                .try_into()
                .map(Some)
                .map_err(tracerr::from_and_wrap!(=> Error)),
            Err(e) if is_unauthorized(e.as_ref()) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Backend<Subscribe<By<session::Change, ()>>> for Supabase {
    type Ok = Subscription<session::Change>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Subscribe<By<session::Change, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.sessions().subscribe())
    }
}

impl Backend<Delete<By<Session, session::ExpirationDateTime>>> for Supabase {
    type Ok = usize;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.sessions().sweep(by.into_inner()))
    }
}

impl Backend<Select<By<Vec<User>, admin::All>>> for Supabase {
    type Ok = Vec<User>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<User>, admin::All>>,
    ) -> Result<Self::Ok, Self::Err> {
        let req =
            self.request(Method::GET, "auth/v1/admin/users", Auth::Admin)?;

        Ok(Self::send::<dto::UsersDto>(req)
            .await?
            .users
            .into_iter()
            .filter_map(|dto| {
                User::try_from(dto)
                    .map_err(|e| log::warn!("skipping `User`: {e}"))
                    .ok()
            })
            .collect())
    }
}

impl Backend<Insert<admin::NewUser>> for Supabase {
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(new): Insert<admin::NewUser>,
    ) -> Result<Self::Ok, Self::Err> {
        let req = self
            .request(Method::POST, "auth/v1/admin/users", Auth::Admin)?
            .json(&dto::AdminCreateUserRequest {
                email: new.email.as_ref(),
                password: new.password.expose_secret().as_ref(),
                email_confirm: true,
                user_metadata: &new.metadata,
            });

        Self::send::<dto::UserDto>(req)
            .await?
            .try_into()
            .map_err(tracerr::from_and_wrap!(=> Error))
    }
}

impl Backend<Delete<By<User, user::Id>>> for Supabase {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let path = format!("auth/v1/admin/users/{}", by.as_inner());
        let req = self.request(Method::DELETE, &path, Auth::Admin)?;

        Self::send_empty(req).await
    }
}

/// Indicates whether the provided [`Error`] means the presented credentials
/// are invalid or expired.
fn is_unauthorized(err: &Error) -> bool {
    err.rejection()
        .and_then(|r| r.status)
        .is_some_and(|s| matches!(s, 401 | 403))
}
