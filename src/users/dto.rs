use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::validation::empty_string_as_none;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

/// Partial profile update. Absent or empty fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(min = 6))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetStatusRequest {
    pub is_active: bool,
}

/// Raw `?page=&limit=` query. Values are kept as strings so that garbage
/// falls back to the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Clamps to page >= 1 and 1 <= limit <= 100; a limit below 1 means the default.
    pub fn normalize(page: i64, limit: i64) -> Self {
        let page = page.max(1);
        let limit = if limit < 1 {
            DEFAULT_PER_PAGE
        } else {
            limit.min(MAX_PER_PAGE)
        };
        Self { page, limit }
    }

    /// Saturates instead of overflowing for absurd page numbers; such a
    /// page is simply past the end.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl From<&PageQuery> for Pagination {
    fn from(q: &PageQuery) -> Self {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        Self::normalize(
            parse(&q.page).unwrap_or(1),
            parse(&q.limit).unwrap_or(DEFAULT_PER_PAGE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(Pagination::normalize(0, 0), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::normalize(-3, 500), Pagination { page: 1, limit: 100 });
        assert_eq!(Pagination::normalize(3, 10).offset(), 20);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let q = PageQuery {
            page: Some(i64::MAX.to_string()),
            limit: Some("10".into()),
        };
        let page = Pagination::from(&q);
        assert_eq!(page.page, i64::MAX);
        assert_eq!(page.offset(), i64::MAX);
    }

    #[test]
    fn unparsable_query_values_use_defaults() {
        let q = PageQuery {
            page: Some("abc".into()),
            limit: Some("".into()),
        };
        assert_eq!(Pagination::from(&q), Pagination { page: 1, limit: 10 });

        let q = PageQuery {
            page: Some("2".into()),
            limit: Some("25".into()),
        };
        assert_eq!(Pagination::from(&q), Pagination { page: 2, limit: 25 });
    }

    #[test]
    fn update_treats_empty_strings_as_absent() {
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"name":"","email":"new@x.com"}"#).unwrap();
        assert!(req.name.is_none());
        assert_eq!(req.email.as_deref(), Some("new@x.com"));
        assert!(req.password.is_none());
        assert!(req.validate().is_ok());
    }
}
