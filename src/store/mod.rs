//! Document-store boundary.
//!
//! The rest of the crate talks to storage only through [`UserStore`] and
//! [`TaskStore`]. Each call is atomic for the single record it touches; the one
//! multi-record operation, [`UserStore::remove_user_with_tasks`], must run
//! inside a single transactional boundary in every backend.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::models::{Task, TaskFilter, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Another user already holds this email.
    DuplicateEmail,
    /// Anything the backend reports that the caller cannot act on.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateEmail => write!(f, "email already registered"),
            StoreError::Backend(msg) => write!(f, "storage backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Result of a cascading user removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub user_removed: bool,
    pub tasks_removed: u64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Fails with `DuplicateEmail` if the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Writes the profile fields (name, age, email, password hash, avatar,
    /// updated_at). The token list is left untouched; it only changes through
    /// the token methods below. Enforces email uniqueness. Returns false if the
    /// user no longer exists.
    async fn save_user(&self, user: &User) -> StoreResult<bool>;

    /// Appends one token to the user's list. Returns false if the user no longer exists.
    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<bool>;

    /// Removes every listed token from the user's list; absent tokens are ignored.
    async fn remove_tokens(&self, id: Uuid, tokens: &[String]) -> StoreResult<()>;

    /// Empties the user's token list.
    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds the user with this id only if `token` is still in its token list.
    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>>;

    /// Removes the user and every task it owns, all or nothing.
    async fn remove_user_with_tasks(&self, id: Uuid) -> StoreResult<CascadeOutcome>;
}

/// Every method is scoped by owner; there is no way to reach a task by id alone.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: &Task) -> StoreResult<()>;

    async fn find_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    /// Persists an updated task. Returns false if no task with this
    /// `(owner, id)` exists any more.
    async fn save_task(&self, task: &Task) -> StoreResult<bool>;

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<u64>;
}

/// A complete backend.
pub trait Store: UserStore + TaskStore {}

impl<T: UserStore + TaskStore> Store for T {}
