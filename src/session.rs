//! Session types issued by the identity provider.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// A provider-issued authentication session.
///
/// The provider owns the lifecycle (created on sign-in, destroyed on
/// sign-out or expiry); the coordinator only holds a read-only cached copy.
/// At most one session is live per coordinator.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stable external id of the authenticated principal.
    pub identity_id: String,
    /// When the provider issued this session.
    pub issued_at: DateTime<Utc>,
    /// Opaque bearer token. Redacted in Debug output.
    pub access_token: SecretString,
}

impl Session {
    pub fn new(identity_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            identity_id: identity_id.into(),
            issued_at: Utc::now(),
            access_token: SecretString::from(access_token.into()),
        }
    }
}

/// A session-change notification. `None` means the session ended.
pub type SessionChange = Option<Session>;
