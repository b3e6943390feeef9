use crate::{
    auth::{AuthMiddleware, AuthResponse, AuthenticatedUser, LoginRequest},
    avatar,
    email::{self, Email},
    error::AppError,
    models::NewUser,
    state::AppState,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::Value;
use uuid::Uuid;

/// Register a new user
///
/// Creates the account, opens its first session and sends a welcome email.
///
/// ## Responses:
/// - `201 Created`: `{ "user": PublicUser, "token": "..." }`.
/// - `400 Bad Request`: validation failure or email already registered.
#[post("")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<NewUser>,
) -> Result<impl Responder, AppError> {
    let user = state.users.register(body.into_inner()).await?;
    let token = state.users.add_session(&user).await?;

    email::dispatch(state.mailer.clone(), Email::welcome(&user.email, &user.name));

    Ok(HttpResponse::Created().json(AuthResponse {
        user: user.redact(),
        token,
    }))
}

/// Login user
///
/// Opens a new session next to any existing ones.
///
/// ## Responses:
/// - `200 OK`: `{ "user": PublicUser, "token": "..." }`.
/// - `401 Unauthorized`: `Unable to login`, whatever the reason.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let user = state.users.authenticate(&body.email, &body.password).await?;
    let token = state.users.add_session(&user).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: user.redact(),
        token,
    }))
}

/// Ends the session that made this request.
#[post("/logout", wrap = "AuthMiddleware")]
pub async fn logout(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state
        .users
        .revoke_session(&session.user, &session.token)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Ends every session of the caller, on every device.
#[post("/logoutAll", wrap = "AuthMiddleware")]
pub async fn logout_all(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.users.revoke_all_sessions(&session.user).await?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/me", wrap = "AuthMiddleware")]
pub async fn get_me(session: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(session.user.redact())
}

/// Update own profile
///
/// Accepts any subset of `name`, `email`, `password` and `age`. Any other key
/// rejects the whole update with `400 Invalid updates!`.
#[patch("/me", wrap = "AuthMiddleware")]
pub async fn update_me(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
    body: web::Json<Value>,
) -> Result<impl Responder, AppError> {
    let user = state
        .users
        .update_profile(&session.user, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(user.redact()))
}

/// Delete own account
///
/// Removes the user together with all of its tasks and answers with the
/// profile as it was.
#[delete("/me", wrap = "AuthMiddleware")]
pub async fn delete_me(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = session.user;
    state.users.delete(&user).await?;

    email::dispatch(state.mailer.clone(), Email::cancellation(&user.email, &user.name));

    Ok(HttpResponse::Ok().json(user.redact()))
}

/// Upload avatar
///
/// `multipart/form-data` with one `avatar` file (jpg, jpeg or png, at most
/// 1,000,000 bytes). Stored as a 250x250 PNG.
#[post("/me/avatar", wrap = "AuthMiddleware")]
pub async fn upload_avatar(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let raw = avatar::read_upload(payload).await?;
    let png = web::block(move || avatar::normalize(&raw))
        .await
        .map_err(|e| AppError::InternalServerError(format!("avatar worker failed: {}", e)))??;

    state.users.set_avatar(&session.user, png).await?;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/me/avatar", wrap = "AuthMiddleware")]
pub async fn delete_avatar(
    state: web::Data<AppState>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.users.clear_avatar(&session.user).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Public avatar lookup. `404` when the user is unknown or has no avatar.
#[get("/{id}/avatar")]
pub async fn get_avatar(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let png = state.users.avatar_of(path.into_inner()).await?;
    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}
