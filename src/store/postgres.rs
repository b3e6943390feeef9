use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{CascadeOutcome, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::{Task, TaskFilter, User};

const USER_COLUMNS: &str =
    "id, name, age, email, password_hash, tokens, avatar, created_at, updated_at";
const TASK_COLUMNS: &str = "id, description, completed, owner, created_at, updated_at";

/// Postgres backend. Each user is one row whose `tokens` array holds the live
/// sessions, so every token change is a single-row write.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {}", e)))
    }
}

/// Unique violations on the email index become `DuplicateEmail`; everything
/// else is opaque.
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation()
                && db_err.constraint().map_or(false, |c| c.contains("email"))
            {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Backend(error.to_string())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, age, email, password_hash, tokens, avatar, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.age)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.tokens)
        .bind(&user.avatar)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users
             SET name = $2, age = $3, email = $4, password_hash = $5, avatar = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.age)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET tokens = array_append(tokens, $2) WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_tokens(&self, id: Uuid, tokens: &[String]) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users
             SET tokens = ARRAY(SELECT t FROM unnest(tokens) AS t WHERE NOT (t = ANY($2)))
             WHERE id = $1",
        )
        .bind(id)
        .bind(tokens)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE users SET tokens = '{}' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND $2 = ANY(tokens)",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn remove_user_with_tasks(&self, id: Uuid) -> StoreResult<CascadeOutcome> {
        let mut tx = self.pool.begin().await?;

        // Lock the owner row first: concurrent task inserts wait on the
        // foreign key and then fail once the user is gone.
        let locked = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(CascadeOutcome {
                user_removed: false,
                tasks_removed: 0,
            });
        }

        let tasks_removed = sqlx::query("DELETE FROM tasks WHERE owner = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let users_removed = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // Dropping `tx` on any `?` above rolls the whole cascade back.
        tx.commit().await?;

        Ok(CascadeOutcome {
            user_removed: users_removed > 0,
            tasks_removed,
        })
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO tasks (id, description, completed, owner, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(task.id)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.owner)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM tasks WHERE owner = ", TASK_COLUMNS));
        query.push_bind(owner);

        if let Some(completed) = filter.completed {
            query.push(" AND completed = ").push_bind(completed);
        }

        // Column and direction come from closed enums, never from client text.
        match filter.sort {
            Some(sort) => query.push(format!(
                " ORDER BY {} {}, created_at ASC, id ASC",
                sort.field.column(),
                sort.direction.keyword()
            )),
            None => query.push(" ORDER BY created_at ASC, id ASC"),
        };

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }
        query.push(" OFFSET ").push_bind(i64::from(filter.skip));

        Ok(query
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner = $2",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn save_task(&self, task: &Task) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET description = $1, completed = $2, updated_at = $3
             WHERE id = $4 AND owner = $5",
        )
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.updated_at)
        .bind(task.id)
        .bind(task.owner)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!(
            "DELETE FROM tasks WHERE id = $1 AND owner = $2 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE owner = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
