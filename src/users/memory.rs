use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    model::{NewUser, User},
    repo::{StoreError, UserStore},
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<User>,
}

/// In-process [`UserStore`] with the same contract as the Postgres one:
/// unique email among live rows, insertion order, soft delete.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw row lookup that also sees soft-deleted rows.
    pub fn snapshot(&self, id: i64) -> Option<User> {
        let inner = self.inner.read().ok()?;
        inner.rows.iter().find(|u| u.id == id).cloned()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend(anyhow::anyhow!("memory store lock poisoned"))
}

fn live(user: &User) -> bool {
    user.deleted_at.is_none()
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.write()?;
        if inner.rows.iter().any(|u| live(u) && u.email == user.email) {
            return Err(StoreError::Conflict);
        }
        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: inner.next_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.read()?
            .rows
            .iter()
            .find(|u| live(u) && u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.read()?
            .rows
            .iter()
            .find(|u| live(u) && u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), StoreError> {
        let inner = self.read()?;
        let rows: Vec<&User> = inner.rows.iter().filter(|u| live(u)).collect();
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut inner = self.write()?;
        if inner
            .rows
            .iter()
            .any(|u| live(u) && u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Conflict);
        }
        let row = inner
            .rows
            .iter_mut()
            .find(|u| live(u) && u.id == user.id)
            .ok_or(StoreError::NotFound)?;
        row.name = user.name.clone();
        row.email = user.email.clone();
        row.password_hash = user.password_hash.clone();
        row.role = user.role.clone();
        row.is_active = user.is_active;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let row = inner
            .rows
            .iter_mut()
            .find(|u| live(u) && u.id == id)
            .ok_or(StoreError::NotFound)?;
        row.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}
