//! Application routes and route guards.

use serde::Serialize;

use super::session::SessionSnapshot;

/// A location in the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", content = "share_id", rename_all = "snake_case")]
pub enum Route {
    /// `/`
    Landing,
    /// `/login`
    Login,
    /// `/register`
    Register,
    /// `/dashboard`
    Dashboard,
    /// `/share/:id`; the id is the URL-encoded storage path.
    Share(String),
    /// Anything else.
    NotFound,
}

impl Route {
    /// Match a location path. Query and fragment are ignored.
    pub fn parse(location: &str) -> Route {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match path {
            "/" => Route::Landing,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/dashboard" => Route::Dashboard,
            _ => match path.strip_prefix("/share/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::Share(id.to_string()),
                _ => Route::NotFound,
            },
        }
    }

    /// Location path of this route.
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Share(id) => format!("/share/{id}"),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Guard protecting this route, if any.
    pub fn guard(&self) -> Option<RouteGuard> {
        match self {
            Route::Login | Route::Register => Some(RouteGuard::UnauthenticatedOnly),
            Route::Dashboard => Some(RouteGuard::AuthenticatedOnly),
            Route::Landing | Route::Share(_) | Route::NotFound => None,
        }
    }
}

/// Access rule attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    /// Render only with an identity; otherwise go to `/login`.
    AuthenticatedOnly,
    /// Render only without an identity; otherwise go to `/dashboard`.
    UnauthenticatedOnly,
}

/// Result of evaluating a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still loading; show a placeholder.
    Loading,
    /// Render the guarded screen.
    Render,
    /// Navigate elsewhere.
    Redirect(Route),
}

impl RouteGuard {
    /// Where a rejected visitor is sent.
    pub fn fallback(&self) -> Route {
        match self {
            RouteGuard::AuthenticatedOnly => Route::Login,
            RouteGuard::UnauthenticatedOnly => Route::Dashboard,
        }
    }

    /// Evaluate the guard against the current session.
    pub fn decide(&self, session: &SessionSnapshot) -> GuardDecision {
        if session.loading {
            return GuardDecision::Loading;
        }
        let authenticated = session.identity.is_some();
        let allowed = match self {
            RouteGuard::AuthenticatedOnly => authenticated,
            RouteGuard::UnauthenticatedOnly => !authenticated,
        };
        if allowed {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect(self.fallback())
        }
    }
}

/// Navigation requested by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Client-side navigation.
    Push(Route),
    /// Full page reload at the route.
    Reload(Route),
}

/// What the UI should draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "share_id", rename_all = "snake_case")]
pub enum Screen {
    /// Session still loading.
    Loading,
    /// Landing page.
    Landing,
    /// Sign-in form.
    Login,
    /// Registration form.
    Register,
    /// The user's files.
    Dashboard,
    /// A shared file.
    Share(String),
    /// Unknown location.
    NotFound,
}

impl From<Route> for Screen {
    fn from(route: Route) -> Self {
        match route {
            Route::Landing => Screen::Landing,
            Route::Login => Screen::Login,
            Route::Register => Screen::Register,
            Route::Dashboard => Screen::Dashboard,
            Route::Share(id) => Screen::Share(id),
            Route::NotFound => Screen::NotFound,
        }
    }
}

/// Outcome of resolving a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Draw this screen.
    Render(Screen),
    /// Navigate to this route instead.
    Redirect(Route),
}

/// Resolve a location against the session.
pub fn resolve(location: &str, session: &SessionSnapshot) -> Resolution {
    let route = Route::parse(location);
    match route.guard().map(|g| g.decide(session)) {
        None | Some(GuardDecision::Render) => Resolution::Render(route.into()),
        Some(GuardDecision::Loading) => Resolution::Render(Screen::Loading),
        Some(GuardDecision::Redirect(to)) => Resolution::Redirect(to),
    }
}
