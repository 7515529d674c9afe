//! [Supabase] [`Backend`] implementation.
//!
//! [Supabase]: https://supabase.com

mod auth;
mod dto;
mod realtime;
mod rest;

use std::{sync::Arc, time::Duration};

use derive_more::Debug;
use reqwest::{header, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use tracerr::Traced;
use url::Url;

use crate::domain::user::session;

use self::dto::ErrorBody;
use super::{Error, Rejection, Sessions};
#[cfg(doc)]
use super::Backend;

/// [`Supabase`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base [`Url`] of the [Supabase] project.
    ///
    /// [Supabase]: https://supabase.com
    pub url: Url,

    /// Public anonymous key of the project.
    #[debug(skip)]
    pub anon_key: SecretString,

    /// Elevated service role key of the project.
    ///
    /// Administrative operations are unavailable if [`None`].
    #[debug(skip)]
    pub service_role_key: Option<SecretString>,

    /// Timeout of a single HTTP request.
    pub timeout: Duration,

    /// Location the password recovery links should redirect to.
    pub password_reset_redirect: Option<String>,
}

/// [`Backend`] talking to a live [Supabase] project.
///
/// [Supabase]: https://supabase.com
#[derive(Clone, Debug)]
pub struct Supabase {
    /// Shared state of this [`Supabase`] backend.
    inner: Arc<Inner>,
}

/// Shared state of a [`Supabase`] backend.
#[derive(Debug)]
struct Inner {
    /// HTTP client.
    http: reqwest::Client,

    /// Base [`Url`] of the project, always ending with a slash.
    url: Url,

    /// Public anonymous key of the project.
    #[debug(skip)]
    anon_key: SecretString,

    /// Elevated service role key of the project.
    #[debug(skip)]
    service_role_key: Option<SecretString>,

    /// Location the password recovery links should redirect to.
    password_reset_redirect: Option<String>,

    /// Time limit of establishing a connection or completing a request.
    timeout: Duration,

    /// [`Sessions`] issued via this backend.
    sessions: Sessions,
}

/// Scope of credentials a [`Supabase`] request is authorized with.
#[derive(Clone, Copy, Debug)]
enum Auth<'t> {
    /// Public anonymous key.
    Anon,

    /// Access token of a signed-in user.
    User(&'t session::Token),

    /// Elevated service role key.
    Admin,
}

impl Supabase {
    /// Creates a new [`Supabase`] backend with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, Traced<Error>> {
        let Config {
            mut url,
            anon_key,
            service_role_key,
            timeout,
            password_reset_redirect,
        } = config;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                url,
                anon_key,
                service_role_key,
                password_reset_redirect,
                timeout,
                sessions: Sessions::default(),
            }),
        })
    }

    /// Indicates whether administrative operations are available.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.service_role_key.is_some()
    }

    /// Returns the [`Sessions`] issued via this [`Supabase`] backend.
    #[must_use]
    pub fn sessions(&self) -> &Sessions {
        &self.inner.sessions
    }

    /// Builds an [`Url`] of the provided project-relative `path`.
    fn endpoint(&self, path: &str) -> Result<Url, Traced<Error>> {
        self.inner
            .url
            .join(path)
            .map_err(tracerr::from_and_wrap!(=> Error))
    }

    /// Starts a new request to the provided project-relative `path`.
    fn request(
        &self,
        method: Method,
        path: &str,
        auth: Auth<'_>,
    ) -> Result<RequestBuilder, Traced<Error>> {
        let key = match auth {
            Auth::Anon | Auth::User(_) => &self.inner.anon_key,
            Auth::Admin => self
                .inner
                .service_role_key
                .as_ref()
                .ok_or(Error::AdminUnavailable)
                .map_err(tracerr::wrap!())?,
        };
        let bearer = match auth {
            Auth::User(token) => token.as_ref(),
            Auth::Anon | Auth::Admin => key.expose_secret(),
        };

        Ok(self
            .inner
            .http
            .request(method, self.endpoint(path)?)
            .header("apikey", key.expose_secret())
            .header(header::AUTHORIZATION, format!("Bearer {bearer}")))
    }

    /// Sends the provided request, decoding its JSON response.
    async fn send<T: DeserializeOwned>(
        req: RequestBuilder,
    ) -> Result<T, Traced<Error>> {
        let body = Self::exchange(req).await?;
        serde_json::from_slice(&body)
            .map_err(tracerr::from_and_wrap!(=> Error))
    }

    /// Sends the provided request, ignoring its response body.
    async fn send_empty(req: RequestBuilder) -> Result<(), Traced<Error>> {
        _ = Self::exchange(req).await?;
        Ok(())
    }

    /// Sends the provided request, returning its successful response body.
    async fn exchange(
        req: RequestBuilder,
    ) -> Result<Vec<u8>, Traced<Error>> {
        let resp =
            req.send().await.map_err(tracerr::from_and_wrap!(=> Error))?;
        let status = resp.status();
        let body =
            resp.bytes().await.map_err(tracerr::from_and_wrap!(=> Error))?;
        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(tracerr::new!(rejection(status, &body)))
        }
    }
}

/// Builds an [`Error::Rejected`] out of the provided failed response.
fn rejection(status: StatusCode, body: &[u8]) -> Error {
    let parsed = serde_json::from_slice::<ErrorBody>(body).unwrap_or_default();
    let message = parsed.message().map_or_else(
        || {
            let text = String::from_utf8_lossy(body);
            if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_owned()
            } else {
                text.into_owned()
            }
        },
        ToOwned::to_owned,
    );
    Error::Rejected(Rejection {
        status: Some(status.as_u16()),
        code: parsed.code(),
        message,
    })
}
