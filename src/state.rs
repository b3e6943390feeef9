use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::email::Mailer;
use crate::error::AppError;
use crate::services::{TaskService, UserDirectory};
use crate::store::Store;

/// Everything handlers share, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: UserDirectory,
    pub tasks: TaskService,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        issuer: TokenIssuer,
        mailer: Arc<dyn Mailer>,
        bcrypt_cost: u32,
    ) -> Result<Self, AppError> {
        Ok(Self {
            users: UserDirectory::new(store.clone(), issuer, bcrypt_cost)?,
            tasks: TaskService::new(store),
            mailer,
        })
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AppError> {
        let issuer = TokenIssuer::new(&config.jwt_secret, config.jwt_expiration_hours)?;
        Self::new(store, issuer, mailer, config.bcrypt_cost)
    }
}
