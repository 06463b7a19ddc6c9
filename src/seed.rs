use std::sync::Arc;

use tracing::info;

use crate::{
    auth::password::CredentialHasher,
    users::{
        model::{NewUser, ROLE_ADMIN, ROLE_USER},
        repo::{StoreError, UserStore},
    },
};

pub const DEFAULT_PASSWORD: &str = "password123";

const DEFAULT_USERS: [(&str, &str, &str); 2] = [
    ("Admin User", "admin@example.com", ROLE_ADMIN),
    ("Regular User", "user@example.com", ROLE_USER),
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// Inserts the default accounts, skipping any email already present.
pub async fn seed_users(
    store: &dyn UserStore,
    hasher: Arc<dyn CredentialHasher>,
) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();
    for (name, email, role) in DEFAULT_USERS {
        match store.find_by_email(email).await {
            Ok(_) => {
                info!(email, "user already exists, skipping");
                report.skipped += 1;
                continue;
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let h = hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || h.hash(DEFAULT_PASSWORD)).await??;
        store
            .create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                role: role.to_string(),
                is_active: true,
            })
            .await?;
        info!(email, role, "created user");
        report.created += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::Argon2Hasher, users::memory::MemoryUserStore};

    #[tokio::test]
    async fn seeding_twice_skips_existing_accounts() {
        let store = MemoryUserStore::new();
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher);

        let first = seed_users(&store, hasher.clone()).await.unwrap();
        assert_eq!(first, SeedReport { created: 2, skipped: 0 });

        let second = seed_users(&store, hasher.clone()).await.unwrap();
        assert_eq!(second, SeedReport { created: 0, skipped: 2 });

        let admin = store.find_by_email("admin@example.com").await.unwrap();
        assert_eq!(admin.role, ROLE_ADMIN);
        assert!(admin.is_active);
        assert!(hasher.verify(DEFAULT_PASSWORD, &admin.password_hash));
    }
}
