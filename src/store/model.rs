//! Account records and role profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role chosen during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Volunteer,
    Organization,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volunteer => "volunteer",
            Self::Organization => "organization",
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volunteer" => Ok(Self::Volunteer),
            "organization" => Ok(Self::Organization),
            other => Err(format!("Unknown account role: {other}")),
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The durable onboarding record for an identity.
///
/// Created exactly once per identity by the registration workflow, never
/// mutated by this core afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Stable external id of the principal this record belongs to.
    pub identity_id: String,
    pub display_name: String,
    pub role: AccountRole,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub account_type: String,
}

impl AccountRecord {
    /// Build the record the workflow writes on a successful submission.
    pub fn new(
        identity_id: impl Into<String>,
        display_name: impl Into<String>,
        role: AccountRole,
        account_type: impl Into<String>,
    ) -> Self {
        Self {
            identity_id: identity_id.into(),
            display_name: display_name.into(),
            role,
            onboarding_complete: true,
            created_at: Utc::now(),
            account_type: account_type.into(),
        }
    }
}

/// Volunteer detail row, keyed by identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolunteerProfile {
    pub identity_id: String,
    pub display_name: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub availability: String,
    pub city: String,
    pub region: String,
    pub country: String,
}

impl VolunteerProfile {
    /// A fresh profile with only the fields registration collects.
    pub fn new(identity_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identity_id: identity_id.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }
}

/// Organization detail row. The directory mints the row id on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub created_by: String,
    pub owner_identity_id: String,
}

/// Admin link between an identity and an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgAdminLink {
    pub identity_id: String,
    pub organization_id: Uuid,
}
