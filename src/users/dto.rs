use serde::{de::DeserializeOwned, Deserialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration payload. Missing keys deserialize to empty strings so that
/// they are reported by validation rather than as malformed input.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(email(message = "This value is not a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "This value is too short. It should have 8 characters or more."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 50, message = "This value should be between 2 and 50 characters long."))]
    pub display_name: String,
}

/// Profile edit payload. The password cannot be changed here; a `password`
/// key in the body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct EditUserRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub currentpassword: Option<String>,
    #[serde(default)]
    pub newpassword: Option<String>,
    #[serde(default)]
    pub passwordconfirmation: Option<String>,
}

/// Profile fields as they will be stored, validated after an edit is merged.
#[derive(Debug, Validate)]
pub struct ProfileFields {
    #[validate(email(message = "This value is not a valid email address."))]
    pub email: String,
    #[validate(length(min = 2, max = 50, message = "This value should be between 2 and 50 characters long."))]
    pub display_name: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parses a JSON body, mapping any syntax or shape error to `MalformedInput`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "malformed json body");
        ApiError::MalformedInput
    })
}

pub fn email_taken() -> ValidationError {
    let mut err = ValidationError::new("unique");
    err.message = Some("This email is already used.".into());
    err
}

pub fn password_too_short() -> ValidationErrors {
    let mut err = ValidationError::new("length");
    err.message = Some("This value is too short. It should have 8 characters or more.".into());
    let mut errors = ValidationErrors::new();
    errors.add("newpassword", err);
    errors
}

pub fn validation_failed(errors: ValidationErrors) -> ApiError {
    ApiError::ValidationFailed(errors.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fail_validation_not_parsing() {
        let req: CreateUserRequest = parse_body(br#"{}"#).expect("empty object parses");
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("display_name"));
    }

    #[test]
    fn aggregated_text_names_each_field() {
        let req = CreateUserRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            display_name: "Bob".into(),
        };
        let text = req.validate().unwrap_err().to_string();
        assert!(text.contains("email"));
        assert!(text.contains("password"));
        assert!(!text.contains("display_name"));
    }

    #[test]
    fn wrong_types_are_malformed() {
        let res = parse_body::<CreateUserRequest>(br#"{"email": 42}"#);
        assert!(matches!(res, Err(ApiError::MalformedInput)));
        let res = parse_body::<CreateUserRequest>(b"{not json");
        assert!(matches!(res, Err(ApiError::MalformedInput)));
    }

    #[test]
    fn password_keys_default_to_none() {
        let req: PasswordChangeRequest = parse_body(br#"{"newpassword": "abc"}"#).unwrap();
        assert!(req.currentpassword.is_none());
        assert_eq!(req.newpassword.as_deref(), Some("abc"));
        assert!(req.passwordconfirmation.is_none());
    }

    #[test]
    fn edit_ignores_password_key() {
        let req: EditUserRequest =
            parse_body(br#"{"display_name": "Alice", "password": "hunter22"}"#).unwrap();
        assert_eq!(req.display_name.as_deref(), Some("Alice"));
        assert!(req.email.is_none());
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
    }
}
