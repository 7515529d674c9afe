//! Wire representations of the [`Supabase`] payloads.

use common::DateTime;
use serde::{de::Error as _, Deserialize, Serialize};
use tracing as log;

#[cfg(doc)]
use super::Supabase;
use crate::domain::{
    proposal,
    user::{self, session, Session},
    Proposal, User,
};

/// Row of the `propostas_saas` table.
#[derive(Clone, Debug, Deserialize)]
pub(super) struct ProposalRow {
    /// Primary key, either textual or numeric.
    id: RowId,

    /// Title of the proposal.
    #[serde(default)]
    titulo_da_proposta: Option<String>,

    /// Published location of the proposal.
    #[serde(default)]
    url: Option<String>,
}

/// Primary key of a row.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RowId {
    /// Textual key.
    Text(String),

    /// Numeric key.
    Number(i64),
}

impl RowId {
    /// Converts this [`RowId`] into a [`proposal::Id`], if not blank.
    pub(super) fn into_proposal_id(self) -> Option<proposal::Id> {
        match self {
            Self::Text(s) => proposal::Id::new(s),
            Self::Number(n) => proposal::Id::new(n.to_string()),
        }
    }
}

impl ProposalRow {
    /// Converts this [`ProposalRow`] into a [`Proposal`].
    ///
    /// Rows with a blank ID are skipped.
    pub(super) fn into_proposal(self) -> Option<Proposal> {
        let Some(id) = self.id.into_proposal_id() else {
            log::warn!("skipping `propostas_saas` row with a blank `id`");
            return None;
        };
        Some(Proposal {
            id,
            title: self.titulo_da_proposta.unwrap_or_default().into(),
            url: self.url.unwrap_or_default().into(),
        })
    }
}

/// Row of the `propostas_saas` table carrying only its primary key, as
/// reported for deleted rows.
#[derive(Clone, Debug, Deserialize)]
pub(super) struct RowKey {
    /// Primary key.
    pub(super) id: RowId,
}

/// User as reported by the auth API.
#[derive(Clone, Debug, Deserialize)]
pub(super) struct UserDto {
    /// ID of the user.
    id: String,

    /// Email of the user.
    #[serde(default)]
    email: Option<String>,

    /// Creation time of the user.
    #[serde(default, with = "common::datetime::serde::rfc3339_option")]
    created_at: Option<user::CreationDateTime>,

    /// Email confirmation time of the user.
    #[serde(default, with = "common::datetime::serde::rfc3339_option")]
    email_confirmed_at: Option<user::ConfirmationDateTime>,

    /// Phone of the user.
    #[serde(default)]
    phone: Option<String>,

    /// Free-form metadata of the user.
    #[serde(default)]
    user_metadata: Option<user::Metadata>,
}

impl TryFrom<UserDto> for User {
    type Error = serde_json::Error;

    fn try_from(dto: UserDto) -> Result<Self, Self::Error> {
        let email = dto
            .email
            .and_then(user::Email::new)
            .ok_or_else(|| {
                serde_json::Error::custom(format!(
                    "`User(id: {})` has no valid email",
                    dto.id,
                ))
            })?;
        Ok(Self {
            id: dto.id.into(),
            email,
            created_at: dto.created_at,
            email_confirmed_at: dto.email_confirmed_at,
            phone: dto.phone.filter(|p| !p.is_empty()).map(Into::into),
            metadata: dto.user_metadata.unwrap_or_default(),
        })
    }
}

/// List of users as reported by the admin API.
#[derive(Clone, Debug, Deserialize)]
pub(super) struct UsersDto {
    /// Listed users.
    pub(super) users: Vec<UserDto>,
}

/// Session as reported by the auth API.
#[derive(Clone, Debug, Deserialize)]
pub(super) struct SessionDto {
    /// Access token.
    access_token: String,

    /// Refresh token.
    #[serde(default)]
    refresh_token: Option<String>,

    /// Unix timestamp of the session expiration.
    #[serde(default)]
    expires_at: Option<i64>,

    /// Seconds until the session expiration.
    #[serde(default)]
    expires_in: Option<u64>,

    /// Signed-in user.
    user: UserDto,
}

impl TryFrom<SessionDto> for Session {
    type Error = serde_json::Error;

    fn try_from(dto: SessionDto) -> Result<Self, Self::Error> {
        let expires_at = dto
            .expires_at
            .and_then(DateTime::from_unix_timestamp)
            .or_else(|| {
                dto.expires_in.map(|secs| {
                    DateTime::now() + std::time::Duration::from_secs(secs)
                })
            })
            .ok_or_else(|| {
                serde_json::Error::custom("session has no expiration")
            })?
            .coerce();

        // SAFETY: Tokens issued by the auth API are valid by definition.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let (token, refresh_token) = unsafe {
            (
                session::Token::new_unchecked(dto.access_token),
                dto.refresh_token
                    .filter(|t| !t.is_empty())
                    .map(|t| session::RefreshToken::new_unchecked(t)),
            )
        };

        Ok(Self {
            token,
            refresh_token,
            expires_at,
            user: dto.user.try_into()?,
        })
    }
}

/// Response of the sign-up endpoint.
///
/// Carries a session when the new user is signed in right away, or the bare
/// user when its email must be confirmed first.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum SignUpDto {
    /// New user is signed in.
    Session(SessionDto),

    /// New user must confirm its email.
    User(UserDto),
}

/// Credentials of a password grant.
#[derive(Debug, Serialize)]
pub(super) struct PasswordGrant<'a> {
    /// Email of the user.
    pub(super) email: &'a str,

    /// Password of the user.
    pub(super) password: &'a str,
}

/// Request of a new user registration.
#[derive(Debug, Serialize)]
pub(super) struct SignUpRequest<'a> {
    /// Email of the new user.
    pub(super) email: &'a str,

    /// Password of the new user.
    pub(super) password: &'a str,

    /// Metadata to attach to the new user.
    pub(super) data: &'a user::Metadata,
}

/// Request of a user creation via the admin API.
#[derive(Debug, Serialize)]
pub(super) struct AdminCreateUserRequest<'a> {
    /// Email of the new user.
    pub(super) email: &'a str,

    /// Password of the new user.
    pub(super) password: &'a str,

    /// Whether to consider the email confirmed right away.
    pub(super) email_confirm: bool,

    /// Metadata to attach to the new user.
    pub(super) user_metadata: &'a user::Metadata,
}

/// Request of a user attributes update.
#[derive(Debug, Default, Serialize)]
pub(super) struct UpdateUserRequest<'a> {
    /// New email of the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) email: Option<&'a str>,

    /// New password of the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) password: Option<&'a str>,

    /// Metadata to merge into the existing one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) data: Option<&'a user::Metadata>,
}

/// Error body reported by the auth or the row store APIs.
#[derive(Clone, Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    /// Message of the auth API.
    #[serde(default)]
    msg: Option<String>,

    /// Message of the row store API.
    #[serde(default)]
    message: Option<String>,

    /// Description of an OAuth-style error.
    #[serde(default)]
    error_description: Option<String>,

    /// OAuth-style error code, or a message.
    #[serde(default)]
    error: Option<String>,

    /// Backend-specific error code, either textual or numeric.
    #[serde(default)]
    code: Option<serde_json::Value>,

    /// Machine-readable auth API error code.
    #[serde(default)]
    error_code: Option<String>,
}

impl ErrorBody {
    /// Returns the human-readable message of this [`ErrorBody`].
    pub(super) fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
    }

    /// Returns the backend-specific error code of this [`ErrorBody`].
    pub(super) fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| {
            self.code.as_ref().map(|c| match c {
                serde_json::Value::String(s) => s.clone(),
                v @ (serde_json::Value::Null
                | serde_json::Value::Bool(_)
                | serde_json::Value::Number(_)
                | serde_json::Value::Array(_)
                | serde_json::Value::Object(_)) => v.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::{user::Session, User};

    use super::{ErrorBody, ProposalRow, SignUpDto};

    #[test]
    fn decodes_proposal_rows() {
        let rows: Vec<ProposalRow> = serde_json::from_str(
            r#"[
                {"id":"P1","titulo_da_proposta":"Site","url":"https://x.y"},
                {"id":42,"titulo_da_proposta":null},
                {"id":"  ","titulo_da_proposta":"Blank"}
            ]"#,
        )
        .unwrap();

        let proposals: Vec<_> =
            rows.into_iter().filter_map(ProposalRow::into_proposal).collect();

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].title.as_ref(), "Site");
        assert_eq!(proposals[1].id.as_ref(), "42");
        assert_eq!(proposals[1].title.as_ref(), "");
        assert_eq!(proposals[1].url.as_ref(), "");
    }

    #[test]
    fn decodes_session() {
        let session: Session = serde_json::from_str::<super::SessionDto>(
            r#"{
                "access_token": "jwt",
                "refresh_token": "r1",
                "expires_in": 3600,
                "expires_at": 1709296200,
                "user": {
                    "id": "u1",
                    "email": "demo@teste.com",
                    "created_at": "2024-03-01T12:30:00.123456Z",
                    "phone": "",
                    "user_metadata": {"full_name": "Demo"}
                }
            }"#,
        )
        .unwrap()
        .try_into()
        .unwrap();

        assert_eq!(session.token.as_ref(), "jwt");
        assert_eq!(session.expires_at.unix_timestamp(), 1_709_296_200);
        assert_eq!(session.user.email.as_ref(), "demo@teste.com");
        assert!(session.user.created_at.is_some());
        assert!(session.user.phone.is_none());
        assert_eq!(session.user.metadata["full_name"], "Demo");
    }

    #[test]
    fn rejects_user_without_email() {
        let dto = serde_json::from_str::<super::UserDto>(r#"{"id":"u1"}"#)
            .unwrap();

        assert!(User::try_from(dto).is_err());
    }

    #[test]
    fn distinguishes_sign_up_outcomes() {
        let signed_in: SignUpDto = serde_json::from_str(
            r#"{"access_token":"jwt","expires_in":60,
                "user":{"id":"u1","email":"a@b.co"}}"#,
        )
        .unwrap();
        assert!(matches!(signed_in, SignUpDto::Session(_)));

        let unconfirmed: SignUpDto =
            serde_json::from_str(r#"{"id":"u1","email":"a@b.co"}"#).unwrap();
        assert!(matches!(unconfirmed, SignUpDto::User(_)));
    }

    #[test]
    fn reads_error_bodies() {
        let auth: ErrorBody = serde_json::from_str(
            r#"{"code":400,"error_code":"invalid_credentials",
                "msg":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(auth.message(), Some("Invalid login credentials"));
        assert_eq!(auth.code().as_deref(), Some("invalid_credentials"));

        let rest: ErrorBody = serde_json::from_str(
            r#"{"code":"PGRST116","message":"JSON object requested"}"#,
        )
        .unwrap();
        assert_eq!(rest.message(), Some("JSON object requested"));
        assert_eq!(rest.code().as_deref(), Some("PGRST116"));

        let oauth: ErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Bad token"}"#,
        )
        .unwrap();
        assert_eq!(oauth.message(), Some("Bad token"));
    }
}
