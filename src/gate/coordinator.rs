//! Session Coordinator — owns auth state and publishes the gate decision.
//!
//! The coordinator subscribes to the session provider, runs account
//! resolution on every identity change, and publishes the derived
//! `GateDecision` through a watch channel the view layer observes. Change
//! notifications are processed strictly in emission order by a single task;
//! account lookups run concurrently and stale results are discarded by a
//! generation counter rather than cancelled.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

use crate::config::GateConfig;
use crate::gate::decision::{GateDecision, GateState};
use crate::provider::SessionProvider;
use crate::resolver::{AccountResolver, Resolution};
use crate::session::{Session, SessionChange};
use crate::store::{AccountDirectory, AccountRecord};

/// Mutable coordinator state, guarded by one lock.
struct AuthState {
    state: GateState,
    session: Option<Session>,
    account: Option<AccountRecord>,
    /// Bumped on every identity change and reset. A resolver result is
    /// applied only while its generation still matches.
    generation: u64,
}

/// Owns process-wide auth state.
///
/// A cheap clonable handle: clones share the same state, so one instance can
/// be handed to the view tree, the registration workflow, and background
/// tasks. Call [`init`](Self::init) once to fetch the current session and
/// start listening for changes.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn SessionProvider>,
    resolver: AccountResolver,
    config: GateConfig,
    auth: RwLock<AuthState>,
    decision_tx: watch::Sender<GateDecision>,
}

/// Handle for the coordinator's subscription task.
///
/// Dropping it (or calling [`shutdown`](CoordinatorGuard::shutdown))
/// unsubscribes from the session provider.
pub struct CoordinatorGuard {
    task: JoinHandle<()>,
}

impl CoordinatorGuard {
    /// Stop listening for session changes.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for CoordinatorGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SessionCoordinator {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        directory: Arc<dyn AccountDirectory>,
        config: GateConfig,
    ) -> Self {
        let (decision_tx, _) = watch::channel(GateDecision::Loading);
        Self {
            inner: Arc::new(Inner {
                provider,
                resolver: AccountResolver::new(directory),
                config,
                auth: RwLock::new(AuthState {
                    state: GateState::Uninitialized,
                    session: None,
                    account: None,
                    generation: 0,
                }),
                decision_tx,
            }),
        }
    }

    /// Fetch the current session, apply it, and start listening for changes.
    ///
    /// A transport failure on the initial fetch is logged and treated as
    /// "no session" — the gate never blocks on the provider.
    pub async fn init(&self) -> CoordinatorGuard {
        {
            let mut auth = self.inner.auth.write().await;
            self.transition(&mut auth, GateState::Loading);
        }

        // Subscribe before the initial fetch so a change emitted in between
        // is buffered, not missed.
        let mut rx = self.inner.provider.subscribe();

        let initial = match self.inner.provider.current_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Initial session fetch failed, treating as signed out");
                None
            }
        };
        self.apply_change(initial).await;

        let coordinator = self.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => coordinator.apply_change(change).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Session subscription lagged, resyncing");
                        match coordinator.inner.provider.current_session().await {
                            Ok(session) => coordinator.apply_change(session).await,
                            Err(e) => warn!(error = %e, "Resync fetch failed"),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Session provider closed its change channel");
                        break;
                    }
                }
            }
        });

        CoordinatorGuard { task }
    }

    // ── Published state ─────────────────────────────────────────────

    /// The currently published decision.
    pub fn current_decision(&self) -> GateDecision {
        *self.inner.decision_tx.borrow()
    }

    /// Subscribe to decision changes.
    pub fn decisions(&self) -> watch::Receiver<GateDecision> {
        self.inner.decision_tx.subscribe()
    }

    /// Decision changes as a stream, for view layers that consume streams.
    pub fn decision_stream(&self) -> WatchStream<GateDecision> {
        WatchStream::new(self.inner.decision_tx.subscribe())
    }

    /// The authenticated identity, if any.
    pub async fn identity(&self) -> Option<String> {
        self.inner
            .auth
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.identity_id.clone())
    }

    /// The cached account record, once resolution has confirmed one.
    pub async fn account(&self) -> Option<AccountRecord> {
        self.inner.auth.read().await.account.clone()
    }

    /// The raw gate state, for diagnostics.
    pub async fn state(&self) -> GateState {
        self.inner.auth.read().await.state
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Begin a sign-in with the configured OAuth provider. Fire-and-forget:
    /// a failure is logged and the UI stays unauthenticated.
    pub async fn sign_in(&self) {
        if let Err(e) = self
            .inner
            .provider
            .sign_in(
                &self.inner.config.oauth_provider,
                &self.inner.config.redirect_target,
            )
            .await
        {
            error!(error = %e, "Sign-in failed");
        }
    }

    /// End the session.
    ///
    /// Local state is cleared even when the provider call fails — the gate
    /// must never stay authenticated because a remote sign-out failed.
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.provider.sign_out().await {
            error!(error = %e, "Sign-out failed, clearing local state anyway");
        }
        let mut auth = self.inner.auth.write().await;
        self.clear_session(&mut auth);
    }

    /// Re-run account resolution for the current identity. Called by the
    /// registration workflow after a successful submission.
    pub async fn complete_registration(&self) {
        let (generation, identity_id) = {
            let mut auth = self.inner.auth.write().await;
            let Some(identity_id) = auth.session.as_ref().map(|s| s.identity_id.clone()) else {
                warn!("complete_registration called without an identity");
                return;
            };
            auth.generation += 1;
            self.transition(&mut auth, GateState::CheckingAccount);
            (auth.generation, identity_id)
        };

        let resolution = self.inner.resolver.resolve(&identity_id).await;
        self.apply_resolution(generation, resolution).await;
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Apply a session-change notification. Called in emission order.
    async fn apply_change(&self, change: SessionChange) {
        let mut auth = self.inner.auth.write().await;
        let Some(session) = change else {
            self.clear_session(&mut auth);
            return;
        };

        let same_identity = auth
            .session
            .as_ref()
            .is_some_and(|current| current.identity_id == session.identity_id);
        if same_identity {
            // Token refresh. The identity is unchanged, so the account
            // check is not repeated.
            auth.session = Some(session);
            return;
        }

        info!(identity_id = %session.identity_id, "Identity changed, checking account");
        let identity_id = session.identity_id.clone();
        auth.session = Some(session);
        auth.account = None;
        auth.generation += 1;
        let generation = auth.generation;

        // Published before the lookup resolves: a brand-new identity is
        // gated into registration immediately, never flashed the app.
        self.transition(&mut auth, GateState::CheckingAccount);
        drop(auth);

        let coordinator = self.clone();
        tokio::spawn(async move {
            let resolution = coordinator.inner.resolver.resolve(&identity_id).await;
            coordinator.apply_resolution(generation, resolution).await;
        });
    }

    /// Apply a resolver result, unless the identity has changed since the
    /// call was issued.
    async fn apply_resolution(&self, generation: u64, resolution: Resolution) {
        let mut auth = self.inner.auth.write().await;
        if auth.generation != generation {
            debug!(
                generation,
                current = auth.generation,
                "Discarding stale account resolution"
            );
            return;
        }

        match resolution {
            Resolution::Onboarded(record) => {
                info!(identity_id = %record.identity_id, "Account confirmed, gate open");
                auth.account = Some(record);
                self.transition(&mut auth, GateState::Ready);
            }
            // A failed lookup gates like a missing record; the resolver has
            // already reported the failure.
            Resolution::NotOnboarded | Resolution::LookupFailed(_) => {
                self.transition(&mut auth, GateState::NeedsRegistration);
            }
        }
    }

    /// Reset to the anonymous state. Anonymous visitors see the
    /// application, so the decision becomes `Ready`.
    fn clear_session(&self, auth: &mut AuthState) {
        auth.session = None;
        auth.account = None;
        // Invalidates any in-flight resolution.
        auth.generation += 1;
        if auth.state != GateState::Unauthenticated {
            self.transition(auth, GateState::Unauthenticated);
        }
    }

    /// Set a new gate state and publish its decision.
    fn transition(&self, auth: &mut AuthState, target: GateState) {
        let from = auth.state;
        if from != target && !from.can_transition_to(target) {
            warn!(%from, to = %target, "Unexpected gate transition");
        }
        auth.state = target;

        let decision = target.decision();
        self.inner.decision_tx.send_if_modified(|current| {
            if *current == decision {
                false
            } else {
                *current = decision;
                true
            }
        });
        debug!(%from, to = %target, %decision, "Gate state");
    }
}

// Note: coordinator behavior needs a scripted provider and directory, so it
// is exercised end-to-end in tests/gate_flow.rs. The state machine itself is
// tested in gate::decision.
