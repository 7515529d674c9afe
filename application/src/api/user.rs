//! [`User`]-related definitions.

use common::{DateTime, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar, InputValue, ScalarValue, Value};
use service::domain;

use crate::{
    api::{self, scalar},
    Context,
};

/// A [`User`] of the system.
#[derive(Clone, Debug, From, Into)]
pub struct User(domain::User);

/// A `User` of the system.
#[graphql_object(context = Context)]
impl User {
    /// Unique identifier of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.clone().into()
    }

    /// Email of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.email",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn email(&self) -> Email {
        self.0.email.clone().into()
    }

    /// Phone of this `User`, if any.
    pub fn phone(&self) -> Option<&str> {
        self.0.phone.as_ref().map(AsRef::as_ref)
    }

    /// Free-form metadata of this `User`.
    pub fn metadata(&self) -> Metadata {
        self.0.metadata.clone().into()
    }

    /// `DateTime` when this `User` was created.
    pub fn created_at(&self) -> Option<DateTime> {
        self.0.created_at.map(DateTimeOf::coerce)
    }

    /// `DateTime` when the email of this `User` was confirmed.
    ///
    /// `null` while the email is unconfirmed.
    pub fn email_confirmed_at(&self) -> Option<DateTime> {
        self.0.email_confirmed_at.map(DateTimeOf::coerce)
    }
}

/// Unique identifier of a `User`.
#[derive(Clone, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq)]
#[from(String, domain::user::Id)]
#[into(String, domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct Id(String);

/// Email of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserEmail",
    with = scalar::Via::<domain::user::Email>,
)]
pub struct Email(domain::user::Email);

/// Free-form metadata of a `User`, represented as a JSON object string.
#[derive(Clone, Debug, Default, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserMetadata",
    to_output_with = Self::to_output,
    from_input_with = Self::from_input,
    parse_token(String),
)]
pub struct Metadata(domain::user::Metadata);

impl Metadata {
    /// Renders this [`Metadata`] as a JSON object string.
    fn to_output<S: ScalarValue>(&self) -> Value<S> {
        Value::scalar(serde_json::Value::Object((*self.0).clone()).to_string())
    }

    /// Parses [`Metadata`] out of a JSON object string.
    fn from_input<S: ScalarValue>(input: &InputValue<S>) -> Result<Self, String> {
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse input scalar `UserMetadata`: expected string \
                 input value, found: {input}",
            )
        })?;
        serde_json::from_str(s).map(Self).map_err(|e| {
            format!("Cannot parse input scalar `UserMetadata`: {e}")
        })
    }
}

pub mod session {
    //! [`Session`]-related definitions.

    use common::DateTime;
    use derive_more::{AsRef, From, Into};
    use juniper::{GraphQLObject, GraphQLScalar};
    use service::{domain, infra::backend::auth::SignedUp};

    use crate::{
        api::{self, scalar},
        Context,
    };

    /// Access token of a `Session`.
    #[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
    #[graphql(
        name = "AccessToken",
        with = scalar::Via::<domain::user::session::Token>,
    )]
    pub struct Token(domain::user::session::Token);

    /// Token to refresh an expiring `Session` with.
    #[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
    #[graphql(
        name = "RefreshToken",
        with = scalar::Via::<domain::user::session::RefreshToken>,
    )]
    pub struct RefreshToken(domain::user::session::RefreshToken);

    /// Authenticated session of a `User`.
    #[derive(Clone, Debug, GraphQLObject)]
    #[graphql(context = Context)]
    pub struct Session {
        /// Access token of this `Session`.
        ///
        /// Should be provided as a `Bearer` authorization, or as the
        /// `sb-access-token` cookie.
        pub access_token: Token,

        /// Token to refresh this `Session` with, once it's about to expire.
        pub refresh_token: Option<RefreshToken>,

        /// `DateTime` when this `Session` expires.
        pub expires_at: DateTime,

        /// `User` this `Session` belongs to.
        pub user: api::User,
    }

    impl From<domain::user::Session> for Session {
        fn from(session: domain::user::Session) -> Self {
            let domain::user::Session {
                token,
                refresh_token,
                expires_at,
                user,
            } = session;
            Self {
                access_token: token.into(),
                refresh_token: refresh_token.map(Into::into),
                expires_at: expires_at.coerce(),
                user: user.into(),
            }
        }
    }

    /// Result of a `User` registration.
    #[derive(Clone, Debug, GraphQLObject)]
    #[graphql(context = Context)]
    pub struct SignUpResult {
        /// Registered `User`.
        pub user: api::User,

        /// `Session` of the registered `User`.
        ///
        /// `null` if the email must be confirmed before signing in.
        pub session: Option<Session>,
    }

    impl From<SignedUp> for SignUpResult {
        fn from(signed_up: SignedUp) -> Self {
            match signed_up {
                SignedUp::Session(s) => {
                    let session = Session::from(*s);
                    Self {
                        user: session.user.clone(),
                        session: Some(session),
                    }
                }
                SignedUp::Unconfirmed(user) => Self {
                    user: user.into(),
                    session: None,
                },
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue};
    use service::domain;

    use super::Metadata;

    #[test]
    fn metadata_renders_json_object() {
        let meta = Metadata::from(
            serde_json::from_str::<domain::user::Metadata>(
                r#"{"full_name":"Demo"}"#,
            )
            .unwrap(),
        );

        let out = meta.to_output::<DefaultScalarValue>();

        assert_eq!(out.as_string_value(), Some(r#"{"full_name":"Demo"}"#));
    }

    #[test]
    fn metadata_accepts_only_objects() {
        let ok = Metadata::from_input(&InputValue::<DefaultScalarValue>::scalar(
            r#"{"avatar_url":"a.png"}"#.to_owned(),
        ))
        .unwrap();
        assert_eq!(domain::user::Metadata::from(ok)["avatar_url"], "a.png");

        assert!(Metadata::from_input(
            &InputValue::<DefaultScalarValue>::scalar("[1, 2]".to_owned()),
        )
        .is_err());
        assert!(Metadata::from_input(
            &InputValue::<DefaultScalarValue>::scalar(1),
        )
        .is_err());
    }
}
