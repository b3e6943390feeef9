use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Fields a user may change on their own profile.
pub const USER_UPDATE_FIELDS: &[&str] = &["name", "email", "password", "age"];

/// A stored user record.
///
/// This type is never serialized. Anything leaving the process goes through
/// [`User::redact`], which drops the password hash, the session tokens and the
/// avatar payload.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    /// Trimmed and lower-cased; unique across all users.
    pub email: String,
    /// Salted bcrypt hash, never the plaintext.
    pub password_hash: String,
    /// Currently valid bearer tokens, one per active device session.
    pub tokens: Vec<String>,
    /// 250x250 PNG, when set.
    pub avatar: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("age", &self.age)
            .field("email", &self.email)
            .field("sessions", &self.tokens.len())
            .field("has_avatar", &self.avatar.is_some())
            .finish()
    }
}

impl User {
    /// Builds a new record from validated input and an already computed hash.
    pub fn new(input: NewUser, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            age: input.age,
            email: input.email,
            password_hash,
            tokens: Vec::new(),
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The public view of this user.
    pub fn redact(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            age: self.age,
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn has_session(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

/// Outward representation of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload. Unknown fields are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: i32,
    #[validate(email(message = "Email is invalid"), custom = "validate_email_domain")]
    pub email: String,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "validate_password"
    )]
    pub password: String,
}

impl NewUser {
    /// Applies the storage normal form: trimmed text and a lower-cased email.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            age: self.age,
            email: normalize_email(&self.email),
            password: self.password.trim().to_string(),
        }
    }
}

/// Profile update payload; only [`USER_UPDATE_FIELDS`] are accepted.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
    #[validate(email(message = "Email is invalid"), custom = "validate_email_domain")]
    pub email: Option<String>,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "validate_password"
    )]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
            age: self.age,
            email: self.email.as_deref().map(normalize_email),
            password: self.password.map(|p| p.trim().to_string()),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Requires a dotted domain, so `a@localhost` is refused.
fn validate_email_domain(email: &str) -> Result<(), ValidationError> {
    let dotted = email
        .rsplit_once('@')
        .map(|(_, domain)| domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if dotted {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some(Cow::from("Email is invalid"));
    Err(error)
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut error = ValidationError::new("contains_password");
        error.message = Some(Cow::from("The word \"password\" cannot be in password"));
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, age: i32, email: &str, password: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            age,
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_new_user_validation() {
        let cases = vec![
            (input("Ada", 36, "ada@example.com", "analytical1"), true, "valid"),
            (input("Ada", 0, "ada@example.com", "analytical1"), true, "zero age"),
            (input("", 36, "ada@example.com", "analytical1"), false, "empty name"),
            (input("Ada", -1, "ada@example.com", "analytical1"), false, "negative age"),
            (input("Ada", 36, "ada.example.com", "analytical1"), false, "bad email"),
            (input("Ada", 36, "ada@localhost", "analytical1"), false, "email without tld"),
            (input("Ada", 36, "ada@example.", "analytical1"), false, "email with trailing dot"),
            (input("Ada", 36, "ada@mail.example.org", "analytical1"), true, "subdomain email"),
            (input("Ada", 36, "ada@example.com", "short"), false, "short password"),
            (input("Ada", 36, "ada@example.com", "myPassWord9"), false, "contains password"),
        ];

        for (user, ok, description) in cases {
            assert_eq!(user.normalized().validate().is_ok(), ok, "case: {}", description);
        }
    }

    #[test]
    fn test_normalization_trims_and_lowercases() {
        let user = input("  Ada  ", 1, "  Ada@Example.COM ", "  analytical1  ").normalized();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.password, "analytical1");
    }

    #[test]
    fn test_whitespace_padding_does_not_satisfy_minimum_length() {
        let user = input("Ada", 1, "ada@example.com", "  abc   ").normalized();
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_redact_drops_secrets() {
        let mut user = User::new(
            input("Ada", 36, "ada@example.com", "analytical1"),
            "$2b$04$hash".into(),
        );
        user.tokens.push("token-a".into());
        user.avatar = Some(vec![1, 2, 3]);

        let json = serde_json::to_value(user.redact()).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert!(!keys.iter().any(|k| ["password", "passwordHash", "tokens", "avatar"]
            .contains(&k.as_str())));
        assert_eq!(json["email"], "ada@example.com");

        let debug = format!("{:?}", user);
        assert!(!debug.contains("$2b$04$hash"));
        assert!(!debug.contains("token-a"));
    }

    #[test]
    fn test_update_validation_skips_absent_fields() {
        assert!(UserUpdate::default().validate().is_ok());

        let update = UserUpdate {
            password: Some("password123".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UserUpdate {
            email: Some("ada@localhost".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UserUpdate {
            age: Some(-3),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
