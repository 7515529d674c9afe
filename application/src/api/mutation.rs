//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use secrecy::SecretBox;
use service::{command, Command as _};

use crate::{api, context, define_error, AsError, Authenticated, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Signs in with the provided email and password.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MISSING_CREDENTIALS` - email or password is empty;
    /// - `INVALID_EMAIL` - email is malformed;
    /// - `PASSWORD_TOO_SHORT` - password is shorter than 6 characters;
    /// - `INVALID_CREDENTIALS` - email or password is incorrect.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "login",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn login(
        email: String,
        password: String,
        ctx: &Context,
    ) -> Result<api::user::session::Session, Error> {
        let session = ctx
            .service()
            .execute(command::Login {
                email,
                password: SecretBox::init_with(move || password.into()),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_authenticated(Authenticated {
            token: session.token.clone(),
            user: session.user.clone(),
        })
        .await;

        Ok(session.into())
    }

    /// Registers a new `User` with the provided email and password.
    ///
    /// The password must be at least 6 characters long and contain an
    /// uppercase letter, a lowercase letter and a digit.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MISSING_CREDENTIALS` - email or password is empty;
    /// - `INVALID_EMAIL` - email is malformed;
    /// - `PASSWORD_TOO_SHORT` - password is shorter than 6 characters;
    /// - `WEAK_PASSWORD` - password is not strong enough;
    /// - `ALREADY_REGISTERED` - email is taken by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "register",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn register(
        email: String,
        password: String,
        metadata: Option<api::user::Metadata>,
        ctx: &Context,
    ) -> Result<api::user::session::SignUpResult, Error> {
        ctx.service()
            .execute(command::Register {
                email,
                password: SecretBox::init_with(move || password.into()),
                metadata: metadata.map(Into::into).unwrap_or_default(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Signs the current `User` out, revoking the provided access token.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - no access token is provided.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "logout",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn logout(ctx: &Context) -> Result<bool, Error> {
        let token = ctx
            .token()
            .await?
            .ok_or_else(|| context::AuthError::AuthorizationRequired.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::Logout { token })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Requests a password reset link to be sent to the provided email.
    ///
    /// Resolves successfully for any well-formed email, regardless of
    /// whether it's registered.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MISSING_EMAIL` - email is empty;
    /// - `INVALID_EMAIL` - email is malformed.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "requestPasswordReset",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn request_password_reset(
        email: String,
        redirect_to: Option<String>,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::RequestPasswordReset { email, redirect_to })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Updates the profile of the current `User`.
    ///
    /// Provided `metadata` is merged into the existing one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOTHING_TO_UPDATE` - no field is provided;
    /// - `INVALID_EMAIL` - email is malformed;
    /// - `WEAK_PASSWORD` - password is not strong enough;
    /// - `AUTHORIZATION_REQUIRED` - no valid access token is provided.
    #[tracing::instrument(
        skip_all,
        fields(
            email = ?email,
            gql.name = "updateProfile",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_profile(
        email: Option<String>,
        password: Option<String>,
        metadata: Option<api::user::Metadata>,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        let token = ctx.token().await?;

        ctx.service()
            .execute(command::UpdateProfile {
                token,
                email,
                password: password
                    .map(|p| SecretBox::init_with(move || p.into())),
                metadata: metadata.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Exchanges the provided `RefreshToken` for a new `Session`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BACKEND_REJECTED` - the `RefreshToken` is invalid or used already.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "refreshSession",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn refresh_session(
        refresh_token: api::user::session::RefreshToken,
        ctx: &Context,
    ) -> Result<api::user::session::Session, Error> {
        ctx.service()
            .execute(command::RefreshSession {
                refresh_token: refresh_token.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::login::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_CREDENTIALS"]
                #[status = UNAUTHORIZED]
                #[message = "Email or password is incorrect"]
                InvalidCredentials,
            }
        }

        match self {
            Self::Validation(e) => e.try_as_error(),
            Self::InvalidCredentials => Some(Error::InvalidCredentials.into()),
            Self::Backend(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::register::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_REGISTERED"]
                #[status = CONFLICT]
                #[message = "This email is already registered"]
                AlreadyRegistered,

                #[code = "INVALID_EMAIL"]
                #[status = BAD_REQUEST]
                #[message = "Invalid email"]
                EmailRefused,
            }
        }

        match self {
            Self::Validation(e) => e.try_as_error(),
            Self::AlreadyRegistered => Some(Error::AlreadyRegistered.into()),
            Self::EmailRefused => Some(Error::EmailRefused.into()),
            Self::Backend(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::logout::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Backend(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::request_password_reset::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Validation(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::update_profile::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Validation(e) => e.try_as_error(),
            Self::NotAuthenticated => {
                Some(context::AuthError::AuthorizationRequired.into())
            }
            Self::Backend(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::refresh_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Backend(e) => e.try_as_error(),
        }
    }
}
