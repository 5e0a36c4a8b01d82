use crate::{
    error::StoreError,
    models::{Role, UserRecord},
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// UserStore
///
/// Read access to the authoritative user records. The gates re-verify every
/// caller against this store on each request instead of trusting role claims
/// carried by the session.
///
/// `Ok(None)` means the record does not exist; `Err` means the store could not
/// answer. Callers must keep the two apart.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;
}

/// UserStoreState
///
/// Shared handle to the store used across the application state.
pub type UserStoreState = Arc<dyn UserStore>;

// --- Postgres ---

/// Row shape of `public.profiles`. `role` is TEXT and is parsed on the way out.
#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    role: String,
}

impl From<ProfileRow> for UserRecord {
    fn from(row: ProfileRow) -> Self {
        let role = row.role.parse().unwrap_or_else(|e| {
            tracing::warn!(user_id = %row.id, error = %e, "unrecognised role, treating as MEMBER");
            Role::Member
        });
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            role,
        }
    }
}

/// PostgresUserStore
///
/// `UserStore` backed by the `profiles` table.
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, display_name, role FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("find_by_id error: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(row.map(UserRecord::from))
    }
}

// --- In-memory ---

/// InMemoryUserStore
///
/// Map-backed store for tests and local demos. Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, UserRecord>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let map = users.into_iter().map(|user| (user.id, user)).collect();
        Self {
            users: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn remove(&self, id: Uuid) -> Option<UserRecord> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
