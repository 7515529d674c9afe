//! [`Command`] for updating a profile of the signed-in [`User`].

use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session},
        User,
    },
    infra::{
        backend::{self, auth::UpdateUser},
        Backend,
    },
    Service,
};

use super::{validation, Command, ValidationError};

/// [`Command`] for updating a profile of the signed-in [`User`].
///
/// At least one field must be provided.
#[derive(Debug, Default)]
pub struct UpdateProfile {
    /// [`session::Token`] of the signed-in [`User`].
    pub token: Option<session::Token>,

    /// New email, as typed.
    ///
    /// An empty one is considered as not provided.
    pub email: Option<String>,

    /// New [`user::Password`].
    pub password: Option<SecretBox<user::Password>>,

    /// [`user::Metadata`] to merge into the existing one.
    pub metadata: Option<user::Metadata>,
}

impl<B> Command<UpdateProfile> for Service<B>
where
    B: Backend<UpdateUser, Ok = User, Err = Traced<backend::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateProfile,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateProfile {
            token,
            email,
            password,
            metadata,
        } = cmd;
        let email = email.filter(|e| !e.is_empty());
        let password = password.filter(|p| !p.expose_secret().is_empty());

        if email.is_none() && password.is_none() && metadata.is_none() {
            return Err(tracerr::new!(E::Validation(
                ValidationError::NothingToUpdate
            )));
        }
        let email = email
            .as_deref()
            .map(|e| user::Email::new(e).ok_or(ValidationError::InvalidEmail))
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        if let Some(pass) = &password {
            validation::new_password(pass.expose_secret())
                .map_err(tracerr::from_and_wrap!(=> E))?;
        }
        let token = token
            .ok_or(E::NotAuthenticated)
            .map_err(tracerr::wrap!())?;

        self.backend()
            .execute(UpdateUser {
                token,
                email,
                password,
                metadata,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`UpdateProfile`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Provided data is invalid.
    #[display("{_0}")]
    Validation(ValidationError),

    /// No [`User`] is signed in.
    #[display("You must be signed in to update the profile")]
    NotAuthenticated,

    /// [`Backend`] error.
    #[display("{_0}")]
    #[from(ignore)]
    Backend(backend::Error),
}

impl From<backend::Error> for ExecutionError {
    fn from(e: backend::Error) -> Self {
        let unauthorized = e
            .rejection()
            .and_then(|r| r.status)
            .is_some_and(|s| s == 401);
        if unauthorized || e.is_rejected_with("not authenticated") {
            Self::NotAuthenticated
        } else {
            Self::Backend(e)
        }
    }
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{Login, ValidationError},
        domain::user,
        infra::InMemory,
        Command as _,
    };

    use super::{ExecutionError, UpdateProfile};

    #[tokio::test]
    async fn requires_some_field() {
        let err = crate::spec::failing()
            .execute(UpdateProfile::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(ValidationError::NothingToUpdate),
        ));
    }

    #[tokio::test]
    async fn validates_provided_fields() {
        let svc = crate::spec::failing();

        let err = svc
            .execute(UpdateProfile {
                email: Some("nope".into()),
                ..UpdateProfile::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(ValidationError::InvalidEmail),
        ));

        let err = svc
            .execute(UpdateProfile {
                password: Some(SecretBox::new(Box::new("abcdef".into()))),
                ..UpdateProfile::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(ValidationError::WeakPassword),
        ));
    }

    #[tokio::test]
    async fn treats_empty_fields_as_absent() {
        let svc = crate::spec::failing();

        let err = svc
            .execute(UpdateProfile {
                email: Some(String::new()),
                password: Some(SecretBox::new(Box::new("".into()))),
                ..UpdateProfile::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(ValidationError::NothingToUpdate),
        ));

        let err = svc
            .execute(UpdateProfile {
                email: Some(String::new()),
                metadata: Some(user::Metadata::default()),
                ..UpdateProfile::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotAuthenticated));

        let err = svc
            .execute(UpdateProfile {
                email: Some(" demo@teste.com".into()),
                ..UpdateProfile::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(ValidationError::InvalidEmail),
        ));
    }

    #[tokio::test]
    async fn requires_session() {
        let err = crate::spec::service()
            .execute(UpdateProfile {
                metadata: Some(user::Metadata::default()),
                ..UpdateProfile::default()
            })
            .await
            .unwrap_err();

        assert_eq!(
            err.as_ref().to_string(),
            "You must be signed in to update the profile",
        );
    }

    #[tokio::test]
    async fn merges_metadata() {
        let svc = crate::spec::service();
        let session = svc
            .execute(Login {
                email: InMemory::DEMO_EMAIL.into(),
                password: SecretBox::new(Box::new(
                    InMemory::DEMO_PASSWORD.into(),
                )),
            })
            .await
            .unwrap();

        let user = svc
            .execute(UpdateProfile {
                token: Some(session.token),
                metadata: Some(
                    serde_json::from_str(r#"{"full_name":"Demo"}"#).unwrap(),
                ),
                ..UpdateProfile::default()
            })
            .await
            .unwrap();

        assert_eq!(user.metadata["full_name"], "Demo");
        assert_eq!(user.email.as_ref(), InMemory::DEMO_EMAIL);
    }
}
