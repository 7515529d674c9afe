//! Remote [`Backend`] of the hosted authentication and data-store service.
//!
//! The [`Backend`] is a capability interface: every remote interaction is a
//! typed operation executed by one of the concrete implementations, selected
//! once at startup via [`Remote`]:
//! - [`Supabase`] talks to the live hosted service;
//! - [`InMemory`] serves a small fixed dataset, so the system is explorable
//!   without live credentials.

pub mod admin;
pub mod auth;
mod feed;
pub mod in_memory;
mod remote;
mod sessions;
pub mod supabase;

use derive_more::{Display, Error as StdError, From};

pub use self::{
    feed::{Hub, Subscription},
    in_memory::InMemory,
    remote::Remote,
    sessions::Sessions,
    supabase::Supabase,
};

/// Operation of a remote backend.
pub use common::Handler as Backend;

/// [`Backend`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Backend rejected the operation.
    #[display("{_0}")]
    #[from(ignore)]
    Rejected(#[error(not(source))] Rejection),

    /// HTTP transport error.
    #[display("HTTP request failed: {_0}")]
    Http(reqwest::Error),

    /// Backend responded with an unexpected payload.
    #[display("Malformed backend response: {_0}")]
    Json(serde_json::Error),

    /// Realtime WebSocket transport error.
    #[display("Realtime connection failed: {_0}")]
    WebSocket(tokio_tungstenite::tungstenite::Error),

    /// Backend didn't respond in time.
    #[display("Backend didn't respond in time")]
    Timeout(tokio::time::error::Elapsed),

    /// [`jsonwebtoken`] error.
    #[display("Failed to process a JSON Web Token: {_0}")]
    Jwt(jsonwebtoken::errors::Error),

    /// Backend URL cannot be built.
    #[display("Invalid backend URL: {_0}")]
    Url(url::ParseError),

    /// Administrative operation requested while the elevated credentials are
    /// absent.
    #[display("Administrative backend client is not configured")]
    AdminUnavailable,
}

impl Error {
    /// Creates a new [`Error::Rejected`] with the provided `message`.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(Rejection {
            status: None,
            code: None,
            message: message.into(),
        })
    }

    /// Returns the [`Rejection`] of this [`Error`], if any.
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            Self::Http(_)
            | Self::Json(_)
            | Self::WebSocket(_)
            | Self::Timeout(_)
            | Self::Jwt(_)
            | Self::Url(_)
            | Self::AdminUnavailable => None,
        }
    }

    /// Indicates whether this [`Error`] is a [`Rejection`] whose message
    /// contains the provided `needle`.
    #[must_use]
    pub fn is_rejected_with(&self, needle: &str) -> bool {
        self.rejection().is_some_and(|r| r.message.contains(needle))
    }
}

/// Description of an operation rejected by the backend.
#[derive(Clone, Debug, Display)]
#[display("{message}")]
pub struct Rejection {
    /// HTTP status code the backend responded with.
    pub status: Option<u16>,

    /// Backend-specific error code.
    pub code: Option<String>,

    /// Human-readable message.
    pub message: String,
}

#[cfg(test)]
mod spec {
    use super::Error;

    #[test]
    fn matches_rejection_message() {
        let err = Error::rejected("Invalid login credentials");

        assert!(err.is_rejected_with("Invalid login"));
        assert!(!err.is_rejected_with("User already registered"));
        assert!(!Error::AdminUnavailable.is_rejected_with("Invalid login"));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
