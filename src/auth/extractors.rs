use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// The resolved session of a request that passed `AuthMiddleware`: the
/// user as loaded for this request, and the exact token it presented.
///
/// Missing from extensions means the middleware did not run; that is
/// answered the same way as a failed authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(session) => ready(Ok(session)),
            None => {
                log::warn!("no session in extensions for {}", req.path());
                ready(Err(AppError::unauthenticated().into()))
            }
        }
    }
}
