//! Client-side routes and access rules.

use serde::{Deserialize, Serialize};

use crate::{AuthState, Role, ValidationError};

/// Every path the client can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Home,
    Dashboard,
    TeacherDashboard,
    PrincipalDashboard,
    AdminDashboard,
    Login,
    Register,
    About,
    AdaptiveRoute,
    StudyPlan,
    /// `/quiz/<rest>`; the rest of the path is kept verbatim.
    Quiz(String),
}

impl Route {
    pub fn as_path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::TeacherDashboard => "/dashboard/teacher".to_string(),
            Route::PrincipalDashboard => "/dashboard/principal".to_string(),
            Route::AdminDashboard => "/dashboard/admin".to_string(),
            Route::Login => "/auth/login".to_string(),
            Route::Register => "/auth/register".to_string(),
            Route::About => "/about".to_string(),
            Route::AdaptiveRoute => "/ruta-academica-adaptativa".to_string(),
            Route::StudyPlan => "/plan-estudio-ia".to_string(),
            Route::Quiz(rest) => format!("/quiz/{}", rest),
        }
    }

    /// Parse a path. Trailing slashes are ignored; query strings and fragments are dropped.
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let trimmed = path.trim_end_matches('/');
        let route = match trimmed {
            "" => Route::Home,
            "/dashboard" => Route::Dashboard,
            "/dashboard/teacher" => Route::TeacherDashboard,
            "/dashboard/principal" => Route::PrincipalDashboard,
            "/dashboard/admin" => Route::AdminDashboard,
            "/auth/login" => Route::Login,
            "/auth/register" => Route::Register,
            "/about" => Route::About,
            "/ruta-academica-adaptativa" => Route::AdaptiveRoute,
            "/plan-estudio-ia" => Route::StudyPlan,
            other => match other.strip_prefix("/quiz/") {
                Some(rest) if !rest.is_empty() => Route::Quiz(rest.to_string()),
                _ => {
                    return Err(ValidationError::UnknownRoute {
                        path: path.to_string(),
                    })
                }
            },
        };
        Ok(route)
    }

    /// Routes reachable without signing in.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Route::Home | Route::Login | Route::Register | Route::About
        )
    }

    /// Routes a signed-in user may be moved off to their dashboard: the
    /// entry pages and the dashboards themselves. Everything else (quizzes,
    /// study plans, the about page) is left alone.
    pub fn is_landing(&self) -> bool {
        matches!(self, Route::Home | Route::Login | Route::Register)
            || self.dashboard_owner().is_some()
    }

    /// The role a dashboard route belongs to, if it is a role dashboard.
    pub fn dashboard_owner(&self) -> Option<Role> {
        match self {
            Route::Dashboard => Some(Role::Student),
            Route::TeacherDashboard => Some(Role::Teacher),
            Route::PrincipalDashboard => Some(Role::Principal),
            Route::AdminDashboard => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_path())
    }
}

/// Outcome of checking whether a route may be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth state still loading; render nothing and decide later.
    Pending,
    Allow,
    Redirect(Route),
}

/// Decide whether `route` may be shown for the given auth state.
///
/// Public routes are always allowed. Protected routes send anonymous
/// visitors to the login page. Role dashboards (other than the student
/// landing page, which doubles as the fallback) are reserved for their role;
/// admins may open any of them.
pub fn check_access(route: &Route, auth: &AuthState) -> GuardDecision {
    if route.is_public() {
        return GuardDecision::Allow;
    }
    if auth.loading {
        return GuardDecision::Pending;
    }
    let Some(session) = auth.authenticated_session() else {
        return GuardDecision::Redirect(Route::Login);
    };
    let role = session.effective_role();
    match route.dashboard_owner() {
        Some(Role::Student) | None => GuardDecision::Allow,
        Some(owner) if owner == role || role == Role::Admin => GuardDecision::Allow,
        Some(_) => GuardDecision::Redirect(role.dashboard_route()),
    }
}
