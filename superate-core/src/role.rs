//! User roles and their canonical dashboards.

use serde::{Deserialize, Serialize};

use crate::Route;

/// Role carried by an authenticated session.
///
/// The set is closed: anything the auth provider sends that is not one of the
/// four known roles parses to [`Role::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Principal,
    Admin,
    Unknown,
}

impl Role {
    /// Canonical landing route for this role.
    pub fn dashboard_route(self) -> Route {
        match self {
            Role::Student => Route::Dashboard,
            Role::Teacher => Route::TeacherDashboard,
            Role::Principal => Route::PrincipalDashboard,
            Role::Admin => Route::AdminDashboard,
            Role::Unknown => Route::Dashboard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Principal => "principal",
            Role::Admin => "admin",
            Role::Unknown => "unknown",
        }
    }

    pub fn all() -> &'static [Role] {
        &[
            Role::Student,
            Role::Teacher,
            Role::Principal,
            Role::Admin,
            Role::Unknown,
        ]
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    /// Parse a role string (case-insensitive). Unrecognised values map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "student" => Role::Student,
            "teacher" => Role::Teacher,
            "principal" => Role::Principal,
            "admin" => Role::Admin,
            _ => Role::Unknown,
        })
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
