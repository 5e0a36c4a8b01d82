use async_trait::async_trait;
use lms_gate::{
    AccessGate, GateError, GatePolicy, InMemoryUserStore, StoreError, UserStore,
    config::GateSettings,
    models::{AccessDecision, Role, Session, UserRecord},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};
use uuid::Uuid;

// --- Scripted Stores ---

/// Fails the first `failures` reads with a transient error, then answers from `inner`.
struct FlakyStore {
    failures: u32,
    calls: AtomicU32,
    inner: InMemoryUserStore,
}

impl FlakyStore {
    fn new(failures: u32, inner: InMemoryUserStore) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            inner,
        }
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.find_by_id(id).await
    }
}

/// Always fails with a non-transient error.
#[derive(Default)]
struct BrokenStore {
    calls: AtomicU32,
}

#[async_trait]
impl UserStore for BrokenStore {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Database(sqlx::Error::RowNotFound))
    }
}

/// Never answers within any sane timeout.
#[derive(Default)]
struct HangingStore {
    calls: AtomicU32,
}

#[async_trait]
impl UserStore for HangingStore {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }
}

// --- Helpers ---

const U1: Uuid = Uuid::from_u128(1);
const U2: Uuid = Uuid::from_u128(2);
const U3: Uuid = Uuid::from_u128(3);

fn user(id: Uuid, role: Role) -> UserRecord {
    UserRecord {
        id,
        email: format!("{}@lms.test", id.as_u128()),
        display_name: Some(format!("User {}", id.as_u128())),
        role,
    }
}

fn fast_settings() -> GateSettings {
    GateSettings {
        lookup_timeout: Duration::from_millis(50),
        lookup_retries: 2,
        retry_backoff: Duration::from_millis(1),
        ..GateSettings::default()
    }
}

fn seeded_store() -> InMemoryUserStore {
    InMemoryUserStore::with_users([
        user(U1, Role::Admin),
        user(U2, Role::Member),
        user(U3, Role::Instructor),
    ])
}

fn admin_gate(store: Arc<dyn UserStore>) -> AccessGate {
    AccessGate::new(store, GatePolicy::admin(&fast_settings()))
}

// --- Admin Gate ---

#[tokio::test]
async fn test_admin_session_renders_with_record() {
    let gate = admin_gate(Arc::new(seeded_store()));

    let decision = gate.evaluate(Some(&Session::for_user(U1))).await.unwrap();

    assert_eq!(decision, AccessDecision::Render(user(U1, Role::Admin)));
}

#[tokio::test]
async fn test_absent_session_redirects_to_login() {
    let gate = admin_gate(Arc::new(seeded_store()));

    let decision = gate.evaluate(None).await.unwrap();

    assert_eq!(decision, AccessDecision::RedirectTo("/login".to_string()));
}

#[tokio::test]
async fn test_session_without_user_id_redirects_to_login() {
    let store = Arc::new(FlakyStore::new(0, seeded_store()));
    let gate = admin_gate(store.clone());

    let decision = gate.evaluate(Some(&Session::default())).await.unwrap();

    assert_eq!(decision.redirect_target(), Some("/login"));
    // No identity, no store read.
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_admin_roles_redirect_to_dashboard() {
    let gate = admin_gate(Arc::new(seeded_store()));

    for id in [U2, U3] {
        let decision = gate.evaluate(Some(&Session::for_user(id))).await.unwrap();
        assert_eq!(decision, AccessDecision::RedirectTo("/lms".to_string()));
    }
}

#[tokio::test]
async fn test_missing_record_redirects_to_dashboard() {
    let gate = admin_gate(Arc::new(seeded_store()));

    let decision = gate
        .evaluate(Some(&Session::for_user(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(decision, AccessDecision::RedirectTo("/lms".to_string()));
}

#[tokio::test]
async fn test_role_change_in_store_takes_effect_on_next_request() {
    let store = seeded_store();
    let gate = admin_gate(Arc::new(store.clone()));
    let session = Session::for_user(U1);

    assert!(gate.evaluate(Some(&session)).await.unwrap().is_render());

    store.insert(user(U1, Role::Member)).await;
    let decision = gate.evaluate(Some(&session)).await.unwrap();
    assert_eq!(decision.redirect_target(), Some("/lms"));

    store.remove(U1).await;
    let decision = gate.evaluate(Some(&session)).await.unwrap();
    assert_eq!(decision.redirect_target(), Some("/lms"));
}

// --- Member Gate ---

#[tokio::test]
async fn test_member_gate_admits_every_known_role() {
    let gate = AccessGate::new(Arc::new(seeded_store()), GatePolicy::member(&fast_settings()));

    for id in [U1, U2, U3] {
        let decision = gate.evaluate(Some(&Session::for_user(id))).await.unwrap();
        assert!(decision.is_render(), "{id} should reach the dashboard");
    }
}

#[tokio::test]
async fn test_member_gate_sends_missing_record_to_login() {
    let gate = AccessGate::new(Arc::new(seeded_store()), GatePolicy::member(&fast_settings()));

    let decision = gate
        .evaluate(Some(&Session::for_user(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(decision.redirect_target(), Some("/login"));
}

#[tokio::test]
async fn test_custom_paths_are_honoured() {
    let settings = GateSettings {
        login_path: "/auth/sign-in".to_string(),
        dashboard_path: "/home".to_string(),
        ..fast_settings()
    };
    let gate = AccessGate::new(Arc::new(seeded_store()), GatePolicy::admin(&settings));
    assert_eq!(gate.policy().required_role, Role::Admin);
    assert_eq!(gate.policy().forbidden_path, "/home");

    let anon = gate.evaluate(None).await.unwrap();
    let member = gate.evaluate(Some(&Session::for_user(U2))).await.unwrap();

    assert_eq!(anon.redirect_target(), Some("/auth/sign-in"));
    assert_eq!(member.redirect_target(), Some("/home"));
}

// --- Lookup Failures ---

#[test]
fn test_backoff_grows_linearly_and_saturates() {
    let policy = GatePolicy::admin(&fast_settings());
    assert_eq!(policy.backoff_for(1), Duration::from_millis(1));
    assert_eq!(policy.backoff_for(3), Duration::from_millis(3));

    let huge = GatePolicy {
        retry_backoff: Duration::MAX / 2,
        ..policy
    };
    assert_eq!(huge.backoff_for(3), Duration::MAX);
    assert_eq!(huge.backoff_for(u32::MAX), Duration::MAX);
}

#[tokio::test]
async fn test_single_transient_failure_is_retried() {
    let store = Arc::new(FlakyStore::new(1, seeded_store()));
    let gate = admin_gate(store.clone());

    let decision = gate.evaluate(Some(&Session::for_user(U1))).await.unwrap();

    assert!(decision.is_render());
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_exhausted_retries_surface_lookup_failure() {
    let store = Arc::new(FlakyStore::new(u32::MAX, seeded_store()));
    let gate = admin_gate(store.clone());

    let result = gate.evaluate(Some(&Session::for_user(U1))).await;

    match result {
        Err(GateError::LookupFailure {
            user_id,
            attempts,
            source,
        }) => {
            assert_eq!(user_id, U1);
            assert_eq!(attempts, 3);
            assert!(matches!(source, StoreError::Unavailable(_)));
        }
        other => panic!("expected LookupFailure, got {other:?}"),
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let store = Arc::new(BrokenStore::default());
    let gate = admin_gate(store.clone());

    let result = gate.evaluate(Some(&Session::for_user(U1))).await;

    assert!(matches!(
        result,
        Err(GateError::LookupFailure { attempts: 1, .. })
    ));
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_counts_as_transient_failure() {
    let store = Arc::new(HangingStore::default());
    let gate = admin_gate(store.clone());

    let result = gate.evaluate(Some(&Session::for_user(U1))).await;

    match result {
        Err(GateError::LookupFailure {
            attempts, source, ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(source, StoreError::Timeout(_)));
        }
        other => panic!("expected LookupFailure, got {other:?}"),
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_zero_retries_means_one_attempt() {
    let settings = GateSettings {
        lookup_retries: 0,
        ..fast_settings()
    };
    let store = Arc::new(FlakyStore::new(1, seeded_store()));
    let gate = AccessGate::new(store.clone(), GatePolicy::admin(&settings));

    let result = gate.evaluate(Some(&Session::for_user(U1))).await;

    assert!(matches!(
        result,
        Err(GateError::LookupFailure { attempts: 1, .. })
    ));
}

#[tokio::test]
async fn test_absent_session_never_fails_even_with_broken_store() {
    let gate = admin_gate(Arc::new(BrokenStore::default()));

    let decision = gate.evaluate(None).await.unwrap();

    assert_eq!(decision.redirect_target(), Some("/login"));
}
