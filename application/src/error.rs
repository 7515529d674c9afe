//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::IntoFieldError;
use serde::Serialize;
use service::{command::ValidationError, infra::backend};
use tracerr::{Trace, Traced};

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// GraphQL API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Creates a new [`Error`] out of the provided parts.
    #[must_use]
    pub fn new(
        code: Code,
        status_code: http::StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            status_code,
            message: message.into(),
            backtrace: None,
        }
    }

    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let mut ext = juniper::Object::with_capacity(1);
        drop(
            ext.add_field("code", juniper::Value::scalar(self.code.to_owned())),
        );
        drop(
            ext.add_field(
                "backtrace",
                juniper::Value::list(
                    self.backtrace
                        .iter()
                        .flat_map(|trace| trace.iter())
                        .map(|frame| juniper::Value::scalar(frame.to_string()))
                        .collect(),
                ),
            ),
        );
        juniper::FieldError::new(self.message, juniper::Value::object(ext))
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

impl AsError for ValidationError {
    fn try_as_error(&self) -> Option<Error> {
        let code = match self {
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::MissingEmail => "MISSING_EMAIL",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::PasswordTooShort => "PASSWORD_TOO_SHORT",
            Self::WeakPassword => "WEAK_PASSWORD",
            Self::NothingToUpdate => "NOTHING_TO_UPDATE",
        };
        Some(Error::new(code, http::StatusCode::BAD_REQUEST, self.to_string()))
    }
}

impl AsError for backend::Error {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Rejected(r) => {
                let status = r
                    .status
                    .and_then(|s| http::StatusCode::from_u16(s).ok())
                    .filter(http::StatusCode::is_client_error)
                    .unwrap_or(http::StatusCode::BAD_REQUEST);
                Some(Error::new("BACKEND_REJECTED", status, r.message.clone()))
            }
            Self::AdminUnavailable => Some(Error::new(
                "SERVICE_UNAVAILABLE",
                http::StatusCode::SERVICE_UNAVAILABLE,
                self.to_string(),
            )),
            Self::Http(_)
            | Self::Json(_)
            | Self::WebSocket(_)
            | Self::Timeout(_)
            | Self::Jwt(_)
            | Self::Url(_) => None,
        }
    }
}

/// JSON body of an [`Error`] rendered by the REST endpoints.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// [`Error`] code.
    code: Code,

    /// [`Error`] message.
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            error: self.message,
        };
        (self.status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod spec {
    use service::{command::ValidationError, infra::backend};

    use super::AsError as _;

    #[test]
    fn validation_is_bad_request() {
        let err = ValidationError::WeakPassword.as_error();

        assert_eq!(err.code, "WEAK_PASSWORD");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, ValidationError::WeakPassword.to_string());
    }

    #[test]
    fn rejection_passes_message_through() {
        let err = backend::Error::rejected("Email not confirmed").as_error();

        assert_eq!(err.code, "BACKEND_REJECTED");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Email not confirmed");
    }

    #[test]
    fn missing_admin_is_unavailable() {
        let err = backend::Error::AdminUnavailable.as_error();

        assert_eq!(err.status_code, http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
