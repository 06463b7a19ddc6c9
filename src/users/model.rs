use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use utoipa::ToSchema;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// User row. `deleted_at` marks a soft-deleted row; stores never return those.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never serialized
    pub role: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

/// Fields needed to insert a user; ids and timestamps come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
}

impl NewUser {
    pub fn member(name: String, email: String, password_hash: String) -> Self {
        Self {
            name,
            email,
            password_hash,
            role: ROLE_USER.to_string(),
            is_active: true,
        }
    }
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_view_never_contains_the_hash() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: ROLE_USER.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let json = serde_json::to_string(&UserView::from(user)).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn new_members_default_to_active_users() {
        let user = NewUser::member("Ada".into(), "ada@example.com".into(), "h".into());
        assert_eq!(user.role, ROLE_USER);
        assert!(user.is_active);
    }
}
