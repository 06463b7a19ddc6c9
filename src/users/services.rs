use std::sync::Arc;

use anyhow::Context;
use tracing::{info, instrument, warn};

use super::{
    dto::{Pagination, UpdateUserRequest},
    model::{NewUser, UserView},
    repo::{StoreError, UserStore},
};
use crate::{
    auth::{jwt::TokenService, password::CredentialHasher},
    error::{AppError, AppResult},
    response::Meta,
};

const USER_NOT_FOUND: &str = "user not found";
const EMAIL_REGISTERED: &str = "email already registered";
const EMAIL_TAKEN: &str = "email already taken";
const INVALID_CREDENTIALS: &str = "invalid email or password";
const ACCOUNT_INACTIVE: &str = "account is not active";

/// Business rules for the user resource: hashing, tokens and persistence
/// are reached only through their traits.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenService>,
}

fn classify(err: StoreError, conflict: &str) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound(USER_NOT_FOUND.into()),
        StoreError::Conflict => AppError::Conflict(conflict.into()),
        StoreError::Database(e) => AppError::Internal(anyhow::Error::new(e).context("user store")),
        StoreError::Backend(e) => AppError::Internal(e.context("user store")),
    }
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    async fn hash(&self, password: String) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task")??;
        Ok(hash)
    }

    async fn verify(&self, password: String, hash: String) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .context("password verify task")?;
        Ok(ok)
    }

    #[instrument(skip(self, name, password))]
    pub async fn register(&self, name: String, email: String, password: String) -> AppResult<UserView> {
        match self.store.find_by_email(&email).await {
            Ok(_) => {
                warn!("email already registered");
                return Err(AppError::Conflict(EMAIL_REGISTERED.into()));
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(classify(e, EMAIL_REGISTERED)),
        }

        let password_hash = self.hash(password).await?;
        // The unique index decides when two registrations race past the check above.
        let user = self
            .store
            .create(NewUser::member(name, email, password_hash))
            .await
            .map_err(|e| classify(e, EMAIL_REGISTERED))?;

        info!(user_id = user.id, "user registered");
        Ok(user.into())
    }

    /// Returns the signed token and the caller's public view.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: String) -> AppResult<(String, UserView)> {
        let user = match self.store.find_by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                warn!("login for unknown email");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
            Err(e) => return Err(classify(e, EMAIL_REGISTERED)),
        };

        if !self.verify(password, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "login with wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        if !user.is_active {
            warn!(user_id = user.id, "login to inactive account");
            return Err(AppError::Forbidden(ACCOUNT_INACTIVE.into()));
        }

        let token = self.tokens.issue(user.id, &user.email, &user.role)?;
        info!(user_id = user.id, "user logged in");
        Ok((token, user.into()))
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<UserView> {
        self.store
            .find_by_id(id)
            .await
            .map(UserView::from)
            .map_err(|e| classify(e, EMAIL_TAKEN))
    }

    pub async fn list(&self, page: Pagination) -> AppResult<(Vec<UserView>, Meta)> {
        let (rows, total) = self
            .store
            .list(page.offset(), page.limit)
            .await
            .map_err(|e| classify(e, EMAIL_TAKEN))?;
        let views = rows.into_iter().map(UserView::from).collect();
        Ok((views, Meta::new(page.page, page.limit, total)))
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i64, changes: UpdateUserRequest) -> AppResult<UserView> {
        let mut user = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| classify(e, EMAIL_TAKEN))?;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            if email != user.email {
                match self.store.find_by_email(&email).await {
                    Ok(other) if other.id != id => {
                        warn!(other_id = other.id, "email already taken");
                        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
                    }
                    Ok(_) | Err(StoreError::NotFound) => {}
                    Err(e) => return Err(classify(e, EMAIL_TAKEN)),
                }
                user.email = email;
            }
        }
        if let Some(password) = changes.password {
            user.password_hash = self.hash(password).await?;
        }

        let user = self
            .store
            .update(&user)
            .await
            .map_err(|e| classify(e, EMAIL_TAKEN))?;
        info!(user_id = user.id, "user updated");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| classify(e, EMAIL_TAKEN))?;
        self.store
            .delete(id)
            .await
            .map_err(|e| classify(e, EMAIL_TAKEN))?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    /// Moves an account between active and inactive.
    #[instrument(skip(self))]
    pub async fn set_active(&self, id: i64, active: bool) -> AppResult<UserView> {
        let mut user = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| classify(e, EMAIL_TAKEN))?;
        user.is_active = active;
        let user = self
            .store
            .update(&user)
            .await
            .map_err(|e| classify(e, EMAIL_TAKEN))?;
        info!(user_id = user.id, active, "user activation changed");
        Ok(user.into())
    }
}
