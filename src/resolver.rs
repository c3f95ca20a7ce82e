//! Account resolution — classifies an identity's onboarding status.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::DirectoryError;
use crate::store::{AccountDirectory, AccountRecord};

/// Outcome of an account lookup.
#[derive(Debug)]
pub enum Resolution {
    /// A record exists and onboarding is complete.
    Onboarded(AccountRecord),
    /// No record yet, or a record with onboarding still incomplete.
    NotOnboarded,
    /// The lookup itself failed. Gated the same as `NotOnboarded`, but
    /// reported separately.
    LookupFailed(DirectoryError),
}

/// Resolves identities against the Account Directory.
///
/// One attempt per call, no retries; a failed lookup is surfaced as
/// `LookupFailed` and left to the caller.
#[derive(Clone)]
pub struct AccountResolver {
    directory: Arc<dyn AccountDirectory>,
}

impl AccountResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    /// Classify the identity as onboarded, not yet onboarded, or failed.
    pub async fn resolve(&self, identity_id: &str) -> Resolution {
        match self.directory.find_account(identity_id).await {
            Ok(Some(record)) if record.onboarding_complete => {
                debug!(identity_id, "Account found and complete");
                Resolution::Onboarded(record)
            }
            Ok(Some(_)) => {
                debug!(identity_id, "Account found but onboarding incomplete");
                Resolution::NotOnboarded
            }
            Ok(None) => {
                debug!(identity_id, "No account record");
                Resolution::NotOnboarded
            }
            Err(e) => {
                warn!(identity_id, error = %e, "Account lookup failed");
                Resolution::LookupFailed(e)
            }
        }
    }
}
