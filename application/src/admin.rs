//! Administrative REST endpoints managing [`User`]s.
//!
//! Backed by the elevated credentials of the remote backend, so respond with
//! `503 Service Unavailable` whenever those are not configured.

use axum::{
    extract::Path,
    routing::{delete, get},
    Extension, Json, Router,
};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{user, User},
    infra::backend::admin,
    query, Command as _, Query as _,
};
use tracing as log;

use crate::{AsError, Error, Service};

/// Creates a [`Router`] serving the administrative endpoints.
///
/// Expects the [`Service`] to be provided as an [`Extension`].
pub fn router() -> Router {
    Router::new()
        .route("/api/admin/users", get(list_users).post(create_user))
        .route("/api/admin/users/:id", delete(delete_user))
}

/// `GET /api/admin/users`: lists all the registered [`User`]s.
///
/// # Errors
///
/// If the elevated credentials are absent, or the backend fails.
pub async fn list_users(
    Extension(service): Extension<Service>,
) -> Result<Json<UserList>, Error> {
    let users = service
        .execute(query::users::List::by(admin::All))
        .await
        .map_err(|e| {
            log::error!("failed to list users: {e}");
            e.into_error()
        })?;

    Ok(Json(UserList {
        total: users.len(),
        users: users.iter().map(UserView::from).collect(),
    }))
}

/// `POST /api/admin/users`: creates a new [`User`] with a confirmed email.
///
/// # Errors
///
/// If the provided data is invalid, the elevated credentials are absent, or
/// the backend rejects the [`User`].
pub async fn create_user(
    Extension(service): Extension<Service>,
    Json(body): Json<NewUser>,
) -> Result<Json<Created>, Error> {
    let NewUser {
        email,
        password,
        metadata,
    } = body;

    let user = service
        .execute(command::CreateUser {
            email,
            password: SecretBox::init_with(move || password.into()),
            metadata: metadata.unwrap_or_default(),
        })
        .await
        .map_err(|e| {
            log::error!("failed to create user: {e}");
            e.into_error()
        })?;

    Ok(Json(Created {
        message: "User created successfully",
        user: UserView::from(&user),
    }))
}

/// `DELETE /api/admin/users/:id`: deletes the [`User`] with the provided ID.
///
/// # Errors
///
/// If the elevated credentials are absent, or the backend rejects the
/// deletion.
pub async fn delete_user(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, Error> {
    service
        .execute(command::DeleteUser {
            user_id: id.into(),
        })
        .await
        .map_err(|e| {
            log::error!("failed to delete user: {e}");
            e.into_error()
        })?;

    Ok(Json(Deleted {
        message: "User deleted successfully",
    }))
}

/// Body of a [`create_user()`] request.
#[derive(Debug, Deserialize)]
pub struct NewUser {
    /// Email of the new [`User`].
    #[serde(default)]
    pub email: String,

    /// Password of the new [`User`].
    #[serde(default)]
    pub password: String,

    /// Metadata to attach to the new [`User`].
    pub metadata: Option<user::Metadata>,
}

/// Response of a [`list_users()`] request.
#[derive(Debug, Serialize)]
pub struct UserList {
    /// Registered [`User`]s.
    pub users: Vec<UserView>,

    /// Total number of the registered [`User`]s.
    pub total: usize,
}

/// Response of a [`create_user()`] request.
#[derive(Debug, Serialize)]
pub struct Created {
    /// Human-readable outcome.
    pub message: &'static str,

    /// Created [`User`].
    pub user: UserView,
}

/// Response of a [`delete_user()`] request.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Deleted {
    /// Human-readable outcome.
    pub message: &'static str,
}

/// JSON representation of a [`User`].
#[derive(Debug, Serialize)]
pub struct UserView {
    id: String,
    email: String,
    created_at: Option<String>,
    email_confirmed_at: Option<String>,
    phone: Option<String>,
    user_metadata: user::Metadata,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.to_string(),
            created_at: user.created_at.map(|at| at.to_rfc3339()),
            email_confirmed_at: user
                .email_confirmed_at
                .map(|at| at.to_rfc3339()),
            phone: user.phone.as_ref().map(ToString::to_string),
            user_metadata: user.metadata.clone(),
        }
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Validation(e) => e.try_as_error(),
            Self::Backend(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Backend(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod spec {
    use axum::{extract::Path, Extension, Json};
    use service::infra::{in_memory, InMemory, Remote};

    use crate::Service;

    use super::{create_user, delete_user, list_users, NewUser};

    fn service() -> Extension<Service> {
        Extension(Service::from_parts(
            service::Config::default(),
            Remote::from(InMemory::new(&in_memory::Config::default())),
        ))
    }

    #[tokio::test]
    async fn unavailable_without_admin_client() {
        let err = list_users(service()).await.unwrap_err();
        assert_eq!(err.code, "SERVICE_UNAVAILABLE");
        assert_eq!(err.status_code, http::StatusCode::SERVICE_UNAVAILABLE);

        let err = delete_user(service(), Path("some-id".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn validates_new_user_first() {
        let body: NewUser =
            serde_json::from_str(r#"{"email":"new@teste.com"}"#).unwrap();

        let err = create_user(service(), Json(body)).await.unwrap_err();

        assert_eq!(err.code, "MISSING_CREDENTIALS");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
