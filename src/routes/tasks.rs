//! Task routes. The whole `/tasks` scope sits behind `AuthMiddleware`, and
//! every handler works only on the caller's own tasks.

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{NewTask, TaskListQuery},
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::Value;
use uuid::Uuid;

/// Creates a task owned by the caller. An `owner` in the body is ignored.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: missing, blank or overlong `description`.
/// - `401 Unauthorized`: no live session.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
    body: web::Json<NewTask>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.create(session.user.id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves the caller's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` or `false`.
/// - `limit` (optional): maximum number of tasks; `0` means no limit.
/// - `skip` (optional): number of tasks to skip.
/// - `sortBy` (optional): `field` or `field:asc|desc`, where field is one of
///   `createdAt`, `updatedAt`, `description`, `completed`.
///
/// Without `sortBy` tasks come back in creation order.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task`.
/// - `400 Bad Request`: a malformed query value.
/// - `401 Unauthorized`: no live session.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
    query: web::Query<TaskListQuery>,
) -> Result<impl Responder, AppError> {
    let filter = query.into_inner().into_filter()?;
    let tasks = state.tasks.list_tasks_for(session.user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// A task owned by someone else is a `404`, same as a missing one.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.get(session.user.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task. Only `description` and `completed` may be sent.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<Value>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .update(session.user.id, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.delete(session.user.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}
