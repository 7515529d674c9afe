//! [`Context`]-related definitions.

use std::{
    future,
    sync::atomic::{self, AtomicU16},
};

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use service::{
    domain::{user::session, User},
    query, Query as _,
};
use tokio::sync::OnceCell;

use crate::{define_error, AsError, Error, JuniperResponse, Service};

/// Name of the cookie carrying the access token of the current
/// [`Authenticated`] session.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Application context.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Error status code.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// Current [`Authenticated`] session, if any.
    authenticated: OnceCell<Option<Authenticated>>,
}

impl Context {
    /// Creates a new [`Context`] out of the provided HTTP request parts.
    #[must_use]
    pub fn new(service: Service, parts: http::request::Parts) -> Self {
        Self {
            service,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts,
            authenticated: OnceCell::new(),
        }
    }

    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .expect("invalid status code")
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Sets the current [`Authenticated`] session for this [`Context`], unless
    /// it's resolved already.
    pub async fn set_authenticated(&self, authenticated: Authenticated) {
        _ = self
            .authenticated
            .get_or_init(|| future::ready(Some(authenticated)))
            .await;
    }

    /// Returns the access [`session::Token`] provided with the HTTP request,
    /// either as a `Bearer` authorization or as a [`ACCESS_TOKEN_COOKIE`].
    ///
    /// # Errors
    ///
    /// Errors if the `Authorization` header is malformed.
    pub async fn token(&self) -> Result<Option<session::Token>, Error> {
        let res = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await;
        let token = match res {
            Ok(TypedHeader(Authorization(bearer))) => {
                Some(bearer.token().to_owned())
            }
            Err(e) if e.is_missing() => CookieJar::from_headers(
                &self.parts.headers,
            )
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty()),
            Err(e) => return Err(e.into_error()).map_err(self.error()),
        };
        #[expect(unsafe_code, reason = "provided by the client as is")]
        let token = token.map(|t| unsafe { session::Token::new_unchecked(t) });
        Ok(token)
    }

    /// Tries to get the current [`Authenticated`] session for this
    /// [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if the `Authorization` header is malformed.
    pub async fn try_authenticated(
        &self,
    ) -> Result<Option<&Authenticated>, Error> {
        self.authenticated
            .get_or_try_init(|| async {
                let Some(token) = self.token().await? else {
                    return Ok(None);
                };
                let user = match self
                    .service
                    .execute(query::user::Current(token.clone()))
                    .await
                {
                    Ok(user) => user,
                    Err(e) => match e {},
                };
                Ok::<_, Error>(user.map(|user| Authenticated { token, user }))
            })
            .await
            .map(Option::as_ref)
    }

    /// Returns the current [`Authenticated`] session for this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the provided access token is invalid or expired.
    pub async fn authenticated(&self) -> Result<&Authenticated, Error> {
        self.try_authenticated()
            .await?
            .ok_or_else(|| AuthError::AuthorizationRequired.into())
            .map_err(self.error())
    }

    /// Applies the [`juniper::Variables`] provided by the client on GraphQL
    /// subscription initialization.
    ///
    /// # Errors
    ///
    /// Errors if the provided variables are invalid.
    pub(crate) fn apply_subscription_variables(
        &mut self,
        vars: &juniper::Variables,
    ) -> Result<(), Error> {
        if let Some(token) = vars.get("authToken") {
            let token = token
                .as_string_value()
                .ok_or_else(|| Error::from(AuthError::InvalidVariables))?;
            let token = format!("Bearer {token}")
                .parse()
                .map_err(|_| Error::from(AuthError::InvalidVariables))?;
            drop(
                self.parts
                    .headers
                    .insert(http::header::AUTHORIZATION, token),
            );
        }

        Ok(())
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service =
            parts.extensions.get::<Service>().cloned().ok_or_else(|| {
                JuniperResponse {
                    status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
                    response: GraphQLBatchResponse::Single(
                        GraphQLResponse::error(
                            Error::internal(&"missing `Service` extension")
                                .into_field_error(),
                        ),
                    ),
                }
            })?;

        Ok(Self::new(service, parts.clone()))
    }
}

/// Session of an authenticated [`User`].
#[derive(Clone, Debug)]
pub struct Authenticated {
    /// Access token of this session.
    pub token: session::Token,

    /// [`User`] this session belongs to.
    pub user: User,
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_VARIABLES"]
        #[status = BAD_REQUEST]
        #[message = "Invalid subscription authorization variables"]
        InvalidVariables,
    }
}

#[cfg(test)]
mod spec {
    use service::infra::{in_memory, InMemory, Remote};

    use crate::Service;

    use super::{Context, ACCESS_TOKEN_COOKIE};

    fn context(request: http::request::Builder) -> Context {
        let service = Service::from_parts(
            service::Config::default(),
            Remote::from(InMemory::new(&in_memory::Config::default())),
        );
        let (parts, ()) = request.body(()).unwrap().into_parts();
        Context::new(service, parts)
    }

    #[tokio::test]
    async fn reads_bearer_token() {
        let ctx = context(
            http::Request::builder()
                .header(http::header::AUTHORIZATION, "Bearer abc"),
        );

        let token = ctx.token().await.unwrap();

        assert_eq!(token.as_ref().map(AsRef::as_ref), Some("abc"));
    }

    #[tokio::test]
    async fn falls_back_to_cookie() {
        let ctx = context(http::Request::builder().header(
            http::header::COOKIE,
            format!("theme=dark; {ACCESS_TOKEN_COOKIE}=xyz"),
        ));

        let token = ctx.token().await.unwrap();

        assert_eq!(token.as_ref().map(AsRef::as_ref), Some("xyz"));
    }

    #[tokio::test]
    async fn requires_authorization() {
        let ctx = context(http::Request::builder());

        assert!(ctx.token().await.unwrap().is_none());
        assert!(ctx.try_authenticated().await.unwrap().is_none());

        let err = ctx.authenticated().await.unwrap_err();
        assert_eq!(err.code, "AUTHORIZATION_REQUIRED");
        assert_eq!(ctx.error_status_code(), http::StatusCode::UNAUTHORIZED);
    }
}
