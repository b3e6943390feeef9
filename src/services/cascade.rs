use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::{CascadeOutcome, Store};

/// Removes a user together with every task it owns.
///
/// The store performs both deletions in one transactional step. If removing
/// the tasks fails, the user is kept and the error is returned: no task may
/// outlive its owner, and no owner is half-deleted.
#[derive(Clone)]
pub struct CascadeController {
    store: Arc<dyn Store>,
}

impl CascadeController {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<CascadeOutcome, AppError> {
        let outcome = self
            .store
            .remove_user_with_tasks(user_id)
            .await
            .map_err(|e| {
                log::error!("cascade delete of user {} aborted: {}", user_id, e);
                AppError::from(e)
            })?;

        if !outcome.user_removed {
            return Err(AppError::NotFound("User not found".into()));
        }

        log::info!(
            "deleted user {} and {} owned task(s)",
            user_id,
            outcome.tasks_removed
        );
        Ok(outcome)
    }
}
