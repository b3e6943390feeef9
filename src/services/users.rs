use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenIssuer;
use crate::error::{AppError, LOGIN_FAILED};
use crate::models::user::normalize_email;
use crate::models::{parse_update, NewUser, User, UserUpdate, USER_UPDATE_FIELDS};
use crate::services::cascade::CascadeController;
use crate::store::{CascadeOutcome, Store};

/// Owns user records: registration, credentials, session tokens, profile
/// changes and deletion.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn Store>,
    issuer: TokenIssuer,
    cascade: CascadeController,
    bcrypt_cost: u32,
    // compared against when the email is unknown, so both login failures cost one bcrypt check
    dummy_hash: String,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn Store>, issuer: TokenIssuer, bcrypt_cost: u32) -> Result<Self, AppError> {
        let dummy_hash = hash_password("not-a-real-account", bcrypt_cost)?;
        Ok(Self {
            cascade: CascadeController::new(store.clone()),
            store,
            issuer,
            bcrypt_cost,
            dummy_hash,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Validates and stores a new user. The password is hashed before it is persisted.
    pub async fn register(&self, input: NewUser) -> Result<User, AppError> {
        let input = input.normalized();
        input.validate()?;

        if self.store.find_user_by_email(&input.email).await?.is_some() {
            return Err(AppError::validation("email", "Email is already registered"));
        }

        let password_hash = hash_password(&input.password, self.bcrypt_cost)?;
        let user = User::new(input, password_hash);
        // the unique index still guards against a concurrent registration
        self.store.insert_user(&user).await?;

        log::info!("registered user {}", user.id);
        Ok(user)
    }

    /// Checks an email/password pair. Both an unknown email and a wrong
    /// password fail with the same `Unable to login` error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let password = password.trim();

        match self.store.find_user_by_email(&email).await? {
            Some(user) if verify_password(password, &user.password_hash)? => Ok(user),
            Some(_) => Err(AppError::Unauthorized(LOGIN_FAILED.into())),
            None => {
                let _ = verify_password(password, &self.dummy_hash);
                Err(AppError::Unauthorized(LOGIN_FAILED.into()))
            }
        }
    }

    /// Issues a new token for `user` and appends it to the stored token list.
    /// Existing sessions are kept; tokens that have since expired are dropped.
    pub async fn add_session(&self, user: &User) -> Result<String, AppError> {
        let token = self.issuer.issue(user.id)?;

        let expired: Vec<String> = user
            .tokens
            .iter()
            .filter(|t| self.issuer.verify(t).is_err())
            .cloned()
            .collect();
        if !expired.is_empty() {
            self.store.remove_tokens(user.id, &expired).await?;
        }

        if !self.store.push_token(user.id, &token).await? {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(token)
    }

    /// Resolves a verified identity to a user that still holds `token`.
    pub async fn find_live_session(&self, user_id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        Ok(self.store.find_user_with_token(user_id, token).await?)
    }

    /// Ends one session. Does nothing if the token is already gone.
    pub async fn revoke_session(&self, user: &User, token: &str) -> Result<(), AppError> {
        self.store
            .remove_tokens(user.id, &[token.to_string()])
            .await?;
        Ok(())
    }

    /// Ends every session of `user`.
    pub async fn revoke_all_sessions(&self, user: &User) -> Result<(), AppError> {
        self.store.clear_tokens(user.id).await?;
        Ok(())
    }

    /// Applies a profile update. Any key outside name/email/password/age
    /// rejects the whole update.
    pub async fn update_profile(&self, user: &User, body: Value) -> Result<User, AppError> {
        let update: UserUpdate = parse_update(body, USER_UPDATE_FIELDS)?;
        let update = update.normalized();
        update.validate()?;

        let mut user = user.clone();
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(age) = update.age {
            user.age = age;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(password) = update.password {
            user.password_hash = hash_password(&password, self.bcrypt_cost)?;
        }
        user.updated_at = Utc::now();

        self.save(&user).await?;
        Ok(user)
    }

    pub async fn set_avatar(&self, user: &User, png: Vec<u8>) -> Result<(), AppError> {
        let mut user = user.clone();
        user.avatar = Some(png);
        user.updated_at = Utc::now();
        self.save(&user).await
    }

    pub async fn clear_avatar(&self, user: &User) -> Result<(), AppError> {
        let mut user = user.clone();
        user.avatar = None;
        user.updated_at = Utc::now();
        self.save(&user).await
    }

    /// Public lookup of a user's avatar. A missing user and a user without an
    /// avatar look the same.
    pub async fn avatar_of(&self, user_id: Uuid) -> Result<Vec<u8>, AppError> {
        self.store
            .find_user(user_id)
            .await?
            .and_then(|u| u.avatar)
            .ok_or_else(|| AppError::NotFound("Avatar not found".into()))
    }

    /// Deletes the user and, in the same step, every task it owns.
    pub async fn delete(&self, user: &User) -> Result<CascadeOutcome, AppError> {
        self.cascade.delete_user(user.id).await
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        if self.store.save_user(user).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("User not found".into()))
        }
    }
}
