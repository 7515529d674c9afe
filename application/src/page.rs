//! Entry pages the [`guard`] redirects between.
//!
//! Rendering is left to the client: these only point to the GraphQL API.
//!
//! [`guard`]: crate::guard

use axum::response::Html;

/// `GET /`: dashboard entry of a signed-in `User`.
#[expect(clippy::unused_async, reason = "`axum` handler")]
pub async fn home() -> Html<&'static str> {
    Html(
        "<!doctype html><title>Proposals</title>\
         <p>Proposals are served at <code>/graphql</code> and streamed at \
         <code>/subscriptions</code>.</p>",
    )
}

/// `GET /login`: sign-in entry of an anonymous `User`.
#[expect(clippy::unused_async, reason = "`axum` handler")]
pub async fn login() -> Html<&'static str> {
    Html(
        "<!doctype html><title>Sign in</title>\
         <p>Sign in with the <code>login</code> mutation at \
         <code>/graphql</code>.</p>",
    )
}
