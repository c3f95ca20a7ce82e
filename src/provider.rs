//! Session provider port — the contract over the external identity provider.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::ProviderError;
use crate::session::{Session, SessionChange};

/// The external identity provider.
///
/// Implementations wrap whatever auth service the application talks to. The
/// coordinator never inspects tokens; it only tracks the identity carried by
/// the session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Fetch the current session, if any. One-shot, no retries.
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Subscribe to session-change notifications.
    ///
    /// Changes are delivered in emission order. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;

    /// Begin an OAuth sign-in with the named provider.
    async fn sign_in(
        &self,
        oauth_provider: &str,
        redirect_target: &str,
    ) -> Result<(), ProviderError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}
