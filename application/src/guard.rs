//! Route guard redirecting page requests according to the session cookie.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse as _, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing as log;

/// Routes accessible without a session.
pub const PUBLIC_ROUTES: &[&str] = &["/login"];

/// Routes never guarded, as they authorize requests on their own.
pub const API_ROUTES: &[&str] = &["/graphql", "/subscriptions", "/api/"];

/// Prefix of the cookies carrying a session of the hosted auth provider.
pub const SESSION_COOKIE_PREFIX: &str = "sb-";

/// Home page the signed-in users are redirected to.
pub const HOME: &str = "/";

/// Page the anonymous users are redirected to.
pub const LOGIN: &str = "/login";

/// [`decide()`]d outcome for a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Request passes through.
    Allow,

    /// Request is redirected to the provided location.
    Redirect(&'static str),
}

/// Decides what to do with a request to the provided `path`.
///
/// Everything is allowed unless the `live` backend is used.
#[must_use]
pub fn decide(path: &str, has_session: bool, live: bool) -> Decision {
    if !live || API_ROUTES.iter().any(|r| path.starts_with(r)) {
        return Decision::Allow;
    }

    let is_public = PUBLIC_ROUTES.iter().any(|r| path.starts_with(r));
    match (is_public, has_session) {
        (true, true) => Decision::Redirect(HOME),
        (false, false) => Decision::Redirect(LOGIN),
        (true, false) | (false, true) => Decision::Allow,
    }
}

/// Indicates whether the provided [`CookieJar`] carries a non-empty session
/// cookie.
#[must_use]
pub fn has_session_cookie(jar: &CookieJar) -> bool {
    jar.iter().any(|c| {
        c.name().starts_with(SESSION_COOKIE_PREFIX) && !c.value().is_empty()
    })
}

/// Middleware applying [`decide()`] to every request.
///
/// Its [`State`] indicates whether the live backend is used.
pub async fn layer(
    State(live): State<bool>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    match decide(path, has_session_cookie(&jar), live) {
        Decision::Allow => next.run(req).await,
        Decision::Redirect(to) => {
            log::debug!("redirecting `{path}` to `{to}`");
            Redirect::temporary(to).into_response()
        }
    }
}

#[cfg(test)]
mod spec {
    use axum_extra::extract::{cookie::Cookie, CookieJar};

    use super::{decide, has_session_cookie, Decision};

    #[test]
    fn allows_everything_without_live_backend() {
        assert_eq!(decide("/", false, false), Decision::Allow);
        assert_eq!(decide("/login", true, false), Decision::Allow);
    }

    #[test]
    fn redirects_anonymous_to_login() {
        assert_eq!(decide("/", false, true), Decision::Redirect("/login"));
        assert_eq!(
            decide("/proposals", false, true),
            Decision::Redirect("/login"),
        );
        assert_eq!(decide("/login", false, true), Decision::Allow);
    }

    #[test]
    fn redirects_signed_in_away_from_login() {
        assert_eq!(decide("/login", true, true), Decision::Redirect("/"));
        assert_eq!(decide("/", true, true), Decision::Allow);
    }

    #[test]
    fn never_guards_api() {
        for path in ["/graphql", "/subscriptions", "/api/admin/users"] {
            assert_eq!(decide(path, false, true), Decision::Allow);
        }
    }

    #[test]
    fn detects_session_cookie() {
        let jar = CookieJar::new().add(Cookie::new("theme", "dark"));
        assert!(!has_session_cookie(&jar));

        let jar = jar.add(Cookie::new("sb-project-auth-token", ""));
        assert!(!has_session_cookie(&jar));

        let jar = jar.add(Cookie::new("sb-access-token", "abc"));
        assert!(has_session_cookie(&jar));
    }
}
