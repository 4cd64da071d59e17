//! Route guard policy
//!
//! A pure decision function evaluated on every session or route change.
//! It holds no state and performs no I/O; navigation itself is the
//! shell's job. The rules, in order:
//!
//! 1. development bypass → render
//! 2. auth request in flight → blocking spinner
//! 3. signed out on a protected route → onboarding
//! 4. signed in on an auth screen → home
//! 5. authenticated without a user record → login (inconsistent state,
//!    e.g. a cleared token after a 401)
//! 6. otherwise → render

use api_client::session::SessionState;

/// Which group the current route belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGroup {
    /// The authenticated tabs shell
    Protected,
    /// Login, registration, verification, and password screens
    AuthFlow,
    /// The onboarding carousel
    Onboarding,
    /// Anything else
    Public,
}

impl RouteGroup {
    /// Classify a route from its path segments
    pub fn classify(segments: &[&str]) -> Self {
        match segments {
            ["(tabs)", ..] => RouteGroup::Protected,
            ["auth", second, ..] => match *second {
                "login" | "register" | "signup-path" | "verify-email" | "forgot-password" => {
                    RouteGroup::AuthFlow
                }
                _ => RouteGroup::Public,
            },
            ["onboarding", ..] => RouteGroup::Onboarding,
            _ => RouteGroup::Public,
        }
    }
}

/// Where the guard redirects to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The onboarding carousel
    Onboarding,
    /// The protected home tab
    Home,
    /// The login screen
    Login,
}

/// The guard's verdict for the current state/route combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested route unchanged
    Render,
    /// Show a blocking spinner, no navigation decision yet
    Loading,
    /// Navigate elsewhere
    Redirect(Destination),
}

/// Inputs the guard evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardContext {
    /// Session authenticated flag
    pub is_authenticated: bool,
    /// Whether a user record is present
    pub has_user: bool,
    /// Whether an auth request is in flight
    pub is_loading: bool,
    /// Development bypass: skip all checks
    pub dev_bypass: bool,
}

impl GuardContext {
    /// Build a context from session state
    pub fn from_session(state: &SessionState, dev_bypass: bool) -> Self {
        Self {
            is_authenticated: state.is_authenticated,
            has_user: state.user.is_some(),
            is_loading: state.is_loading,
            dev_bypass,
        }
    }
}

/// Whether the development bypass is active for this process
///
/// Mirrors the build-time flags the app shell sets: a development
/// environment with debugging enabled skips the guard entirely.
pub fn dev_bypass_from_env() -> bool {
    let env = std::env::var("PASSAGE_ENV").unwrap_or_default();
    let debug = std::env::var("PASSAGE_DEBUG").unwrap_or_default();
    env.eq_ignore_ascii_case("development") && debug == "true"
}

/// Evaluate the guard for a session state and route group
pub fn evaluate(ctx: GuardContext, route: RouteGroup) -> GuardDecision {
    if ctx.dev_bypass {
        tracing::debug!("route guard bypassed (development debug)");
        return GuardDecision::Render;
    }

    if ctx.is_loading {
        return GuardDecision::Loading;
    }

    if !ctx.is_authenticated && !ctx.has_user && route == RouteGroup::Protected {
        return GuardDecision::Redirect(Destination::Onboarding);
    }

    if ctx.is_authenticated && ctx.has_user && route == RouteGroup::AuthFlow {
        return GuardDecision::Redirect(Destination::Home);
    }

    if ctx.is_authenticated && !ctx.has_user {
        return GuardDecision::Redirect(Destination::Login);
    }

    GuardDecision::Render
}
