use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::UnknownRole;

// --- Identity & Authorization ---

/// Role
///
/// Authorization level attached to a `UserRecord`. Persisted as upper-case
/// TEXT in `public.profiles.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Member,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Instructor => "INSTRUCTOR",
            Self::Admin => "ADMIN",
        }
    }

    /// Permission level, higher means more access.
    pub fn level(&self) -> u8 {
        match self {
            Self::Member => 0,
            Self::Instructor => 1,
            Self::Admin => 2,
        }
    }

    /// True when this role carries at least the permissions of `required`.
    pub fn satisfies(&self, required: Role) -> bool {
        self.level() >= required.level()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MEMBER" => Ok(Self::Member),
            "INSTRUCTOR" => Ok(Self::Instructor),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// UserRecord
///
/// The authoritative identity record, keyed by `id`. Its `role` is the only
/// authorization signal the gates trust.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
}

/// Session
///
/// Short-lived proof of identity issued by the external auth provider after
/// login. Read-only for this service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            expires_at: None,
        }
    }
}

/// AccessDecision
///
/// Output of a gate evaluation. Produced per request and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    /// The protected view may render; carries the resolved record for display.
    Render(UserRecord),
    /// Terminate the render with a navigation to `path`.
    RedirectTo(String),
}

impl AccessDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::RedirectTo(path) => Some(path),
            Self::Render(_) => None,
        }
    }
}

// --- View Boundary (DTOs handed to the presentation layer) ---

/// ViewerProfile
///
/// The caller's identity as shown by protected pages (greeting, avatar menu).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ViewerProfile {
    pub id: Uuid,
    pub email: String,
    /// Falls back to the email address when the profile has no name.
    pub display_name: String,
    pub role: Role,
}

impl From<UserRecord> for ViewerProfile {
    fn from(record: UserRecord) -> Self {
        let display_name = record
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| record.email.clone());
        Self {
            id: record.id,
            email: record.email,
            display_name,
            role: record.role,
        }
    }
}

/// DashboardView
///
/// Context for the ordinary LMS dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub viewer: ViewerProfile,
    /// Whether the dashboard should link to the admin area.
    pub can_administer: bool,
}

/// ApiDocsView
///
/// Context for the admin API-docs page: who is looking and where the
/// machine-readable document and interactive explorer live.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ApiDocsView {
    pub viewer: ViewerProfile,
    pub title: String,
    pub openapi_url: String,
    pub swagger_ui_url: String,
}

/// ErrorBody
///
/// JSON payload for non-redirect failures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
