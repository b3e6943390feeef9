use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CascadeOutcome, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::{SortDirection, SortField, Task, TaskFilter, User};

/// In-process store. Users and tasks sit behind one lock so a cascade is a
/// single critical section.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // insertion order is the default listing order
    tasks: Vec<Task>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn email_taken(&self, email: &str, except: Uuid) -> bool {
        self.users
            .values()
            .any(|u| u.id != except && u.email == email)
    }
}

fn compare(a: &Task, b: &Task, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Description => a.description.cmp(&b.description),
        SortField::Completed => a.completed.cmp(&b.completed),
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, user.id) {
            return Err(StoreError::DuplicateEmail);
        }
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Backend(format!("user {} already exists", user.id)));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, user.id) {
            return Err(StoreError::DuplicateEmail);
        }
        match inner.users.get_mut(&user.id) {
            Some(stored) => {
                stored.name = user.name.clone();
                stored.age = user.age;
                stored.email = user.email.clone();
                stored.password_hash = user.password_hash.clone();
                stored.avatar = user.avatar.clone();
                stored.updated_at = user.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(stored) => {
                stored.tokens.push(token.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_tokens(&self, id: Uuid, tokens: &[String]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(stored) = inner.users.get_mut(&id) {
            stored.tokens.retain(|t| !tokens.contains(t));
        }
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(stored) = inner.users.get_mut(&id) {
            stored.tokens.clear();
        }
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(&id)
            .filter(|u| u.has_session(token))
            .cloned())
    }

    async fn remove_user_with_tasks(&self, id: Uuid) -> StoreResult<CascadeOutcome> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Ok(CascadeOutcome {
                user_removed: false,
                tasks_removed: 0,
            });
        }

        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.owner != id);
        let tasks_removed = (before - inner.tasks.len()) as u64;
        inner.users.remove(&id);

        Ok(CascadeOutcome {
            user_removed: true,
            tasks_removed,
        })
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        // owner must be live at creation time
        if !inner.users.contains_key(&task.owner) {
            return Err(StoreError::Backend(format!("owner {} does not exist", task.owner)));
        }
        inner.tasks.push(task.clone());
        Ok(())
    }

    async fn find_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| t.owner == owner)
            .filter(|t| filter.completed.map_or(true, |c| t.completed == c))
            .cloned()
            .collect();

        if let Some(sort) = filter.sort {
            tasks.sort_by(|a, b| {
                let ordering = compare(a, b, sort.field);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let limit = filter.limit.map_or(usize::MAX, |n| n as usize);
        Ok(tasks
            .into_iter()
            .skip(filter.skip as usize)
            .take(limit)
            .collect())
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tasks
            .iter()
            .find(|t| t.id == id && t.owner == owner)
            .cloned())
    }

    async fn save_task(&self, task: &Task) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.owner == task.owner)
        {
            Some(stored) => {
                *stored = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        let position = inner
            .tasks
            .iter()
            .position(|t| t.id == id && t.owner == owner);
        Ok(position.map(|index| inner.tasks.remove(index)))
    }

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().filter(|t| t.owner == owner).count() as u64)
    }
}
