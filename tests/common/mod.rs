//! Shared test doubles for the gate and registration suites.
//!
//! `TestProvider` scripts the identity provider; `TestDirectory` wraps the
//! real in-memory libSQL backend with per-identity lookup gates, scripted
//! failures, and operation counters so tests can pin down ordering.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, broadcast, watch};
use uuid::Uuid;

use vloop_core::config::GateConfig;
use vloop_core::error::{DirectoryError, ProviderError};
use vloop_core::gate::{CoordinatorGuard, GateDecision, GateState, SessionCoordinator};
use vloop_core::provider::SessionProvider;
use vloop_core::session::{Session, SessionChange};
use vloop_core::store::{
    AccountDirectory, AccountRecord, AccountRole, LibSqlDirectory, OrgAdminLink,
    OrganizationProfile, VolunteerProfile,
};

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn session(identity_id: &str) -> Session {
    Session::new(identity_id, format!("token-{identity_id}"))
}

// ── Provider double ─────────────────────────────────────────────────

/// Scripted identity provider.
pub struct TestProvider {
    session: Mutex<Option<Session>>,
    tx: broadcast::Sender<SessionChange>,
    fail_sign_in: AtomicBool,
    fail_sign_out: AtomicBool,
    sign_out_calls: AtomicUsize,
}

impl TestProvider {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(16);
        Arc::new(Self {
            session: Mutex::new(None),
            tx,
            fail_sign_in: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
        })
    }

    /// Seed the session returned by the initial fetch, without notifying.
    pub fn seed(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    /// Emit a session change, as the remote provider would.
    pub fn emit(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session.clone();
        let _ = self.tx.send(session);
    }

    pub fn set_fail_sign_in(&self, fail: bool) {
        self.fail_sign_in.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for TestProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.tx.subscribe()
    }

    async fn sign_in(
        &self,
        oauth_provider: &str,
        _redirect_target: &str,
    ) -> Result<(), ProviderError> {
        if self.fail_sign_in.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                provider: oauth_provider.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("scripted failure".to_string()));
        }
        self.emit(None);
        Ok(())
    }
}

// ── Directory double ────────────────────────────────────────────────

/// Wrapper over the in-memory libSQL backend with scripted behavior.
pub struct TestDirectory {
    inner: LibSqlDirectory,
    lookup_gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    account_gate: Mutex<Option<Arc<Semaphore>>>,
    fail_find_account: AtomicBool,
    fail_volunteer_insert: AtomicBool,
    fail_organization_insert: AtomicBool,
    finds: AtomicUsize,
    writes: AtomicUsize,
}

impl TestDirectory {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LibSqlDirectory::new_memory().await.unwrap(),
            lookup_gates: Mutex::new(HashMap::new()),
            account_gate: Mutex::new(None),
            fail_find_account: AtomicBool::new(false),
            fail_volunteer_insert: AtomicBool::new(false),
            fail_organization_insert: AtomicBool::new(false),
            finds: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    /// Make `find_account(identity_id)` block until released.
    pub fn hold_lookup(&self, identity_id: &str) {
        self.lookup_gates
            .lock()
            .unwrap()
            .insert(identity_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held lookup for the identity proceed.
    pub fn release_lookup(&self, identity_id: &str) {
        if let Some(gate) = self.lookup_gates.lock().unwrap().get(identity_id) {
            gate.add_permits(1);
        }
    }

    /// Make `insert_account` block until released.
    pub fn hold_account_inserts(&self) {
        *self.account_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held account insert proceed.
    pub fn release_account_inserts(&self) {
        if let Some(gate) = self.account_gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    pub fn set_fail_find_account(&self, fail: bool) {
        self.fail_find_account.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_volunteer_insert(&self, fail: bool) {
        self.fail_volunteer_insert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_organization_insert(&self, fail: bool) {
        self.fail_organization_insert.store(fail, Ordering::SeqCst);
    }

    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Insert an already-onboarded account directly, bypassing the workflow.
    pub async fn seed_account(&self, identity_id: &str, name: &str, role: AccountRole) {
        let record = AccountRecord::new(identity_id, name, role, "email");
        self.inner.insert_account(&record).await.unwrap();
    }
}

#[async_trait]
impl AccountDirectory for TestDirectory {
    async fn find_account(
        &self,
        identity_id: &str,
    ) -> Result<Option<AccountRecord>, DirectoryError> {
        let gate = self.lookup_gates.lock().unwrap().get(identity_id).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("lookup gate closed").forget();
        }
        self.finds.fetch_add(1, Ordering::SeqCst);
        if self.fail_find_account.load(Ordering::SeqCst) {
            return Err(DirectoryError::Query("scripted lookup failure".to_string()));
        }
        self.inner.find_account(identity_id).await
    }

    async fn insert_account(&self, record: &AccountRecord) -> Result<(), DirectoryError> {
        let gate = self.account_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("account gate closed").forget();
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_account(record).await
    }

    async fn insert_volunteer(&self, profile: &VolunteerProfile) -> Result<(), DirectoryError> {
        if self.fail_volunteer_insert.load(Ordering::SeqCst) {
            return Err(DirectoryError::Write(
                "scripted volunteer insert failure".to_string(),
            ));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_volunteer(profile).await
    }

    async fn insert_organization(
        &self,
        profile: &OrganizationProfile,
    ) -> Result<(), DirectoryError> {
        if self.fail_organization_insert.load(Ordering::SeqCst) {
            return Err(DirectoryError::Write(
                "scripted organization insert failure".to_string(),
            ));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_organization(profile).await
    }

    async fn find_organization_id(&self, created_by: &str) -> Result<Uuid, DirectoryError> {
        self.inner.find_organization_id(created_by).await
    }

    async fn insert_org_admin(&self, link: &OrgAdminLink) -> Result<(), DirectoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_org_admin(link).await
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub provider: Arc<TestProvider>,
    pub directory: Arc<TestDirectory>,
    pub coordinator: SessionCoordinator,
    pub guard: CoordinatorGuard,
}

pub async fn start_gate_with(
    provider: Arc<TestProvider>,
    directory: Arc<TestDirectory>,
) -> Harness {
    init_tracing();
    let coordinator = SessionCoordinator::new(
        provider.clone(),
        directory.clone(),
        GateConfig::default(),
    );
    let guard = coordinator.init().await;
    Harness {
        provider,
        directory,
        coordinator,
        guard,
    }
}

pub async fn start_gate() -> Harness {
    start_gate_with(TestProvider::new(), TestDirectory::new().await).await
}

pub async fn wait_for_decision(rx: &mut watch::Receiver<GateDecision>, want: GateDecision) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if *rx.borrow_and_update() == want {
                return;
            }
            rx.changed().await.expect("decision channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for decision {want:?}"));
}

pub async fn wait_for_state(coordinator: &SessionCoordinator, want: GateState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if coordinator.state().await == want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for state {want:?}"));
}

/// Wait until the directory has served `want` account lookups.
pub async fn wait_for_finds(directory: &TestDirectory, want: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if directory.find_count() >= want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {want} lookups"));
}
