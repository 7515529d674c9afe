//! Domain definitions.

pub mod proposal;
pub mod user;

pub use self::{proposal::Proposal, user::User};
