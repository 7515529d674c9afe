//! [`Command`] definition.

pub mod create_user;
pub mod delete_user;
pub mod login;
pub mod logout;
pub mod refresh_session;
pub mod register;
pub mod request_password_reset;
pub mod update_profile;
pub mod validation;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_user::CreateUser, delete_user::DeleteUser, login::Login,
    logout::Logout, refresh_session::RefreshSession, register::Register,
    request_password_reset::RequestPasswordReset,
    update_profile::UpdateProfile, validation::ValidationError,
};
