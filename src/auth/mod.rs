pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::models::PublicUser;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer};

/// Payload of `POST /users/login`.
///
/// Deliberately unvalidated: a malformed email or short password is just
/// another failed login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by registration and login: the redacted user plus the new session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, User};
    use serde_json::json;

    #[test]
    fn test_login_request_accepts_anything_shaped_right() {
        let login: LoginRequest =
            serde_json::from_value(json!({ "email": "not-an-email", "password": "x" })).unwrap();
        assert_eq!(login.email, "not-an-email");

        assert!(serde_json::from_value::<LoginRequest>(json!({ "email": "a@b.c" })).is_err());
    }

    #[test]
    fn test_auth_response_never_carries_secrets() {
        let user = User::new(
            NewUser {
                name: "Ana".into(),
                age: 33,
                email: "ana@example.com".into(),
                password: "hunter22".into(),
            },
            "$2b$04$hash".into(),
        );
        let body = serde_json::to_value(AuthResponse {
            user: user.redact(),
            token: "abc".into(),
        })
        .unwrap();

        assert_eq!(body["token"], "abc");
        assert_eq!(body["user"]["email"], "ana@example.com");
        let user_keys: Vec<&str> = body["user"].as_object().unwrap().keys().map(String::as_str).collect();
        for forbidden in ["password", "passwordHash", "password_hash", "tokens", "avatar"] {
            assert!(!user_keys.contains(&forbidden), "{} leaked", forbidden);
        }
    }
}
