//! `AccountDirectory` trait — single async interface for onboarding records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DirectoryError;
use crate::store::model::{AccountRecord, OrgAdminLink, OrganizationProfile, VolunteerProfile};

/// Backend-agnostic record store for accounts and role profiles.
///
/// Creating an account and its role profile is a multi-step sequence with
/// no atomicity guarantee from the store; callers own the ordering and the
/// partial-failure handling.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up the onboarding record for an identity.
    ///
    /// `Ok(None)` means no row exists — expected for brand-new identities
    /// and distinct from a query failure.
    async fn find_account(
        &self,
        identity_id: &str,
    ) -> Result<Option<AccountRecord>, DirectoryError>;

    /// Insert a new onboarding record. Fails with `Constraint` when a record
    /// already exists for the identity.
    async fn insert_account(&self, record: &AccountRecord) -> Result<(), DirectoryError>;

    /// Insert a volunteer detail row.
    async fn insert_volunteer(&self, profile: &VolunteerProfile) -> Result<(), DirectoryError>;

    /// Insert an organization detail row.
    async fn insert_organization(
        &self,
        profile: &OrganizationProfile,
    ) -> Result<(), DirectoryError>;

    /// Find the id of the organization most recently created by the given
    /// identity. `NotFound` is an error here — the caller just inserted it.
    async fn find_organization_id(&self, created_by: &str) -> Result<Uuid, DirectoryError>;

    /// Insert an identity-to-organization admin link.
    async fn insert_org_admin(&self, link: &OrgAdminLink) -> Result<(), DirectoryError>;
}
