//! Session and auth-state types, plus dashboard resolution.

use serde::{Deserialize, Serialize};

use crate::{Role, Route};

/// Identifier of a platform user as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An auth-provider session.
///
/// `role` is `None` while the user profile has not assigned one yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub authenticated: bool,
    pub role: Option<Role>,
}

impl Session {
    /// An authenticated session.
    pub fn new(user_id: UserId, role: Option<Role>) -> Self {
        Self {
            user_id,
            authenticated: true,
            role,
        }
    }

    /// The role routing should use; an unset role behaves like `Unknown`.
    pub fn effective_role(&self) -> Role {
        self.role.unwrap_or(Role::Unknown)
    }
}

/// What the session provider exposes: the current session and whether it is
/// still being established.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthState {
    pub session: Option<Session>,
    pub loading: bool,
}

impl AuthState {
    /// Initial state while the provider restores a persisted session.
    pub fn loading() -> Self {
        Self {
            session: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            session: None,
            loading: false,
        }
    }

    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Some(session),
            loading: false,
        }
    }

    /// The session, if there is one and it is authenticated.
    pub fn authenticated_session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|s| s.authenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated_session().is_some()
    }
}

/// Resolve the dashboard an auth state should land on.
///
/// Returns `None` while loading and for unauthenticated or missing sessions;
/// those states must not navigate. Unset and unknown roles land on
/// `/dashboard`.
pub fn resolve_dashboard(auth: &AuthState) -> Option<Route> {
    if auth.loading {
        return None;
    }
    let session = auth.authenticated_session()?;
    Some(session.effective_role().dashboard_route())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = Option<Role>> {
        prop_oneof![
            Just(None),
            Just(Some(Role::Student)),
            Just(Some(Role::Teacher)),
            Just(Some(Role::Principal)),
            Just(Some(Role::Admin)),
            Just(Some(Role::Unknown)),
        ]
    }

    #[test]
    fn test_resolve_each_role() {
        let cases = [
            (Some(Role::Student), "/dashboard"),
            (Some(Role::Teacher), "/dashboard/teacher"),
            (Some(Role::Principal), "/dashboard/principal"),
            (Some(Role::Admin), "/dashboard/admin"),
            (Some(Role::Unknown), "/dashboard"),
            (None, "/dashboard"),
        ];
        for (role, path) in cases {
            let auth = AuthState::signed_in(Session::new(UserId::new("u"), role));
            assert_eq!(resolve_dashboard(&auth).map(|r| r.as_path()), Some(path.to_string()));
        }
    }

    #[test]
    fn test_unauthenticated_session_is_ignored() {
        let auth = AuthState {
            session: Some(Session {
                user_id: UserId::new("u"),
                authenticated: false,
                role: Some(Role::Admin),
            }),
            loading: false,
        };
        assert_eq!(resolve_dashboard(&auth), None);
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_signed_out_does_not_resolve() {
        assert_eq!(resolve_dashboard(&AuthState::signed_out()), None);
    }

    proptest! {
        /// Property: nothing resolves while auth is loading, whatever the session.
        #[test]
        fn prop_loading_never_resolves(role in role_strategy(), authenticated in any::<bool>()) {
            let auth = AuthState {
                session: Some(Session { user_id: UserId::new("u"), authenticated, role }),
                loading: true,
            };
            prop_assert_eq!(resolve_dashboard(&auth), None);
        }

        /// Property: an authenticated, settled session always resolves to its role's dashboard.
        #[test]
        fn prop_settled_session_resolves_to_role_dashboard(role in role_strategy()) {
            let auth = AuthState::signed_in(Session::new(UserId::new("u"), role));
            let expected = role.unwrap_or(Role::Unknown).dashboard_route();
            prop_assert_eq!(resolve_dashboard(&auth), Some(expected));
        }
    }
}
