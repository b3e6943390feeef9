use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{parse_update, NewTask, Task, TaskFilter, TaskUpdate, TASK_UPDATE_FIELDS};
use crate::store::Store;

/// Owner-scoped access to tasks. Every operation takes the owner explicitly,
/// and a task owned by someone else is reported exactly like a missing one.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a task owned by `owner`.
    pub async fn create(&self, owner: Uuid, input: NewTask) -> Result<Task, AppError> {
        let input = input.normalized();
        input.validate()?;

        let task = Task::new(input, owner);
        self.store.insert_task(&task).await?;
        Ok(task)
    }

    /// Lists the tasks of `owner`, filtered, sorted and paged.
    pub async fn list_tasks_for(&self, owner: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, AppError> {
        Ok(self.store.find_tasks(owner, filter).await?)
    }

    pub async fn get(&self, owner: Uuid, id: Uuid) -> Result<Task, AppError> {
        self.store.find_task(owner, id).await?.ok_or_else(not_found)
    }

    /// Applies a partial update. A key other than `description`/`completed`
    /// rejects the whole update before anything is read or written.
    pub async fn update(&self, owner: Uuid, id: Uuid, body: Value) -> Result<Task, AppError> {
        let update: TaskUpdate = parse_update(body, TASK_UPDATE_FIELDS)?;
        let update = update.normalized();
        update.validate()?;

        let mut task = self.get(owner, id).await?;
        update.apply(&mut task);

        if !self.store.save_task(&task).await? {
            return Err(not_found());
        }
        Ok(task)
    }

    /// Deletes and returns the task.
    pub async fn delete(&self, owner: Uuid, id: Uuid) -> Result<Task, AppError> {
        self.store.delete_task(owner, id).await?.ok_or_else(not_found)
    }

    pub async fn count_for(&self, owner: Uuid) -> Result<u64, AppError> {
        Ok(self.store.count_tasks(owner).await?)
    }
}
