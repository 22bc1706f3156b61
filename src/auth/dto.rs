use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::User;
use crate::error::ApiError;
use crate::validate::{is_blank, is_valid_email, Violations};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();

        if is_blank(&self.username) {
            v.add("username", "username is required");
        } else {
            if self.username.len() < 3 {
                v.add("username", "username must be at least 3 characters long");
            }
            if self.username.len() > 80 {
                v.add("username", "username must not exceed 80 characters");
            }
            if !self.username.starts_with(|c: char| c.is_ascii_alphabetic()) {
                v.add("username", "username must start with a letter");
            }
            if !self
                .username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                v.add(
                    "username",
                    "username can only contain letters, numbers, underscores, and hyphens",
                );
            }
        }

        if is_blank(&self.email) {
            v.add("email", "email is required");
        } else if !is_valid_email(&self.email) {
            v.add("email", "email is not a valid address");
        }

        validate_password_strength(&mut v, &self.password);

        if let Some(full_name) = &self.full_name {
            if full_name.len() > 100 {
                v.add("full_name", "full_name must not exceed 100 characters");
            }
        }

        v.into_result()
    }
}

fn validate_password_strength(v: &mut Violations, password: &str) {
    if password.len() < 8 {
        v.add("password", "password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        v.add("password", "password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        v.add("password", "password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        v.add("password", "password must contain at least one number");
    }
}

/// Request body for login. The identifier matches a username or an email.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();
        if is_blank(&self.username) {
            v.add("username", "username is required");
        }
        if self.password.is_empty() {
            v.add("password", "password is required");
        }
        v.into_result()
    }
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();
        if let Some(full_name) = &self.full_name {
            if full_name.len() > 100 {
                v.add("full_name", "full_name must not exceed 100 characters");
            }
        }
        if let Some(profile_image) = &self.profile_image {
            if profile_image.len() > 255 {
                v.add("profile_image", "profile_image must not exceed 255 characters");
            }
        }
        v.into_result()
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub is_admin: bool,
    pub recipe_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserDto {
    pub fn from_user(user: &User, recipe_count: i64) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            bio: user.bio.clone(),
            profile_image: user.profile_image.clone(),
            is_admin: user.is_admin,
            recipe_count,
            created_at: user.created_at,
        }
    }
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_registration() -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            email: "a@x.com".into(),
            password: "Secret123".into(),
            full_name: None,
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(valid_registration().validate().is_ok());
    }

    #[test]
    fn missing_username_is_reported_on_that_field_only() {
        let mut req = valid_registration();
        req.username = "".into();
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => {
                assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["username"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut req = valid_registration();
        req.email = "nope".into();
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => assert!(fields.contains_key("email")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn weak_passwords_are_rejected() {
        for password in ["short1A", "nouppercase1", "NOLOWERCASE1", "NoDigitsHere"] {
            let mut req = valid_registration();
            req.password = password.into();
            let err = req.validate().unwrap_err();
            match err {
                ApiError::Validation { fields, .. } => {
                    assert!(fields.contains_key("password"), "password {password:?}")
                }
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn username_format_is_enforced() {
        let mut req = valid_registration();
        req.username = "1abc".into();
        assert!(req.validate().is_err());
        req.username = "ab cd".into();
        assert!(req.validate().is_err());
        req.username = "ab_cd-9".into();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected_at_deserialization() {
        let raw = serde_json::json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "Secret123",
            "is_admin": true
        });
        let parsed: Result<RegisterRequest, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn user_dto_never_exposes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            full_name: None,
            bio: None,
            profile_image: None,
            is_admin: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&UserDto::from_user(&user, 0)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert!(json.contains("alice"));
    }
}
