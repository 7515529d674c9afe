//! GraphQL API definitions.

mod mutation;
pub mod proposal;
mod query;
pub mod scalar;
mod subscription;
pub mod user;

pub use self::{
    mutation::Mutation, proposal::Proposal, query::Query,
    subscription::Subscription, user::User,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

/// Creates a new [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, Subscription)
}

#[cfg(test)]
mod spec {
    #[test]
    fn exposes_dashboard_operations() {
        let sdl = super::schema().as_sdl();

        for field in [
            "me: User",
            "hasActiveSession: Boolean!",
            "proposals(search: String, order: ProposalSortOrder)",
            "proposal(id: ProposalId!): Proposal",
            "login(email: String!, password: String!): Session!",
            "logout: Boolean!",
            "refreshSession(refreshToken: RefreshToken!): Session!",
            "session: User",
        ] {
            assert!(sdl.contains(field), "`{field}` is missing in:\n{sdl}");
        }
    }
}
