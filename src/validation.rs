//! JSON extraction with field-level validation.

use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::AppError;

/// Deserializes a JSON body and runs its `Validate` rules, answering 422 with a
/// field to message map when either step fails.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value
            .validate()
            .map_err(|e| AppError::Validation(field_messages(&e)))?;
        Ok(Self(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let mut fields = BTreeMap::new();
    fields.insert("body".to_string(), rejection.body_text());
    AppError::Validation(fields)
}

/// Flattens validator output to one human message per field.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| errs.first().map(|e| (field.to_string(), describe(e))))
        .collect()
}

fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "required" => "This field is required".into(),
        "email" => "Invalid email format".into(),
        "length" => {
            let len = err
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map(|s| s.chars().count() as u64);
            let min = err.params.get("min").and_then(|v| v.as_u64());
            match (len, min) {
                (Some(len), Some(min)) if len < min => "Value is too short".into(),
                _ => "Value is too long".into(),
            }
        }
        other => format!("Invalid value ({other})"),
    }
}

/// Treats `""` the same as an absent field.
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 2, max = 5))]
        name: String,
        #[validate(email)]
        email: String,
        #[serde(default, deserialize_with = "empty_string_as_none")]
        #[validate(length(min = 6))]
        password: Option<String>,
    }

    #[test]
    fn messages_follow_the_failed_rule() {
        let sample = Sample {
            name: "a".into(),
            email: "nope".into(),
            password: None,
        };
        let fields = field_messages(&sample.validate().unwrap_err());
        assert_eq!(fields["name"], "Value is too short");
        assert_eq!(fields["email"], "Invalid email format");
        assert!(!fields.contains_key("password"));

        let sample = Sample {
            name: "abcdefgh".into(),
            email: "a@b.io".into(),
            password: Some("123".into()),
        };
        let fields = field_messages(&sample.validate().unwrap_err());
        assert_eq!(fields["name"], "Value is too long");
        assert_eq!(fields["password"], "Value is too short");
    }

    #[test]
    fn empty_strings_deserialize_as_absent() {
        let sample: Sample =
            serde_json::from_str(r#"{"name":"abc","email":"a@b.io","password":""}"#).unwrap();
        assert!(sample.password.is_none());
        assert!(sample.validate().is_ok());
    }
}
