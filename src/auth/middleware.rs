//! Access guard for protected routes.
//!
//! Each request moves through
//! `Unauthenticated -> TokenExtracted -> TokenVerified -> UserResolved -> Authorized`.
//! A request that stops early is answered with one uniform 401; the stage it
//! stopped at is only logged.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::auth::extractors::AuthenticatedUser;
use crate::error::AppError;
use crate::services::UserDirectory;
use crate::state::AppState;

/// Where a protected request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingHeader,
    MalformedHeader,
    InvalidToken,
    /// Signature is fine but the user is gone or no longer holds this token.
    NoLiveSession,
    StoreUnavailable,
    Misconfigured,
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, Rejection> {
    let value = headers.get(AUTHORIZATION).ok_or(Rejection::MissingHeader)?;
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Rejection::MalformedHeader)?;
    Ok(token.to_string())
}

/// Verifies `token` and resolves it to a user whose token list still contains it.
/// A valid signature alone is not enough: revoked tokens stop here.
pub async fn authorize(directory: &UserDirectory, token: String) -> Result<AuthenticatedUser, Rejection> {
    let claims = directory
        .issuer()
        .verify(&token)
        .map_err(|_| Rejection::InvalidToken)?;

    match directory.find_live_session(claims.sub, &token).await {
        Ok(Some(user)) => Ok(AuthenticatedUser { user, token }),
        Ok(None) => Err(Rejection::NoLiveSession),
        Err(e) => {
            log::error!("session lookup failed: {}", e);
            Err(Rejection::StoreUnavailable)
        }
    }
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let state = req.app_data::<web::Data<AppState>>().cloned();
            let outcome = match (state, bearer_token(req.headers())) {
                (None, _) => Err(Rejection::Misconfigured),
                (_, Err(rejection)) => Err(rejection),
                (Some(state), Ok(token)) => authorize(&state.users, token).await,
            };

            match outcome {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                    service.call(req).await
                }
                Err(rejection) => {
                    log::debug!("rejected {} {}: {:?}", req.method(), req.path(), rejection);
                    Err(AppError::unauthenticated().into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::state::test_support::test_state;
    use actix_web::http::header::HeaderValue;
    use actix_web::{test as actix_test, App, HttpResponse};

    async fn whoami(session: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(session.user.email)
    }

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(Rejection::MissingHeader));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(Rejection::MalformedHeader));
        assert_eq!(bearer_token(&headers("Bearer ")), Err(Rejection::MalformedHeader));
        assert_eq!(bearer_token(&headers("abc.def.ghi")), Err(Rejection::MalformedHeader));
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi".to_string()));
    }

    #[actix_rt::test]
    async fn test_authorize_stages() {
        let state = test_state();
        let user = state
            .users
            .register(NewUser {
                name: "Guard".into(),
                age: 1,
                email: "guard@example.com".into(),
                password: "sentinel9".into(),
            })
            .await
            .unwrap();
        let token = state.users.add_session(&user).await.unwrap();

        let session = authorize(&state.users, token.clone()).await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(session.token, token);

        assert_eq!(
            authorize(&state.users, "garbage".into()).await.unwrap_err(),
            Rejection::InvalidToken
        );

        // signed correctly but never stored
        let unstored = state.users.issuer().issue(user.id).unwrap();
        assert_eq!(
            authorize(&state.users, unstored).await.unwrap_err(),
            Rejection::NoLiveSession
        );

        state.users.revoke_session(&user, &token).await.unwrap();
        assert_eq!(
            authorize(&state.users, token).await.unwrap_err(),
            Rejection::NoLiveSession
        );
    }

    #[actix_rt::test]
    async fn test_every_rejection_looks_the_same() {
        let state = web::Data::new(test_state());
        let app = actix_test::init_service(
            App::new().app_data(state.clone()).service(
                web::resource("/whoami")
                    .wrap(AuthMiddleware)
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let user = state
            .users
            .register(NewUser {
                name: "Guard".into(),
                age: 1,
                email: "guard@example.com".into(),
                password: "sentinel9".into(),
            })
            .await
            .unwrap();
        let revoked = state.users.add_session(&user).await.unwrap();
        state.users.revoke_all_sessions(&user).await.unwrap();

        let mut bodies = Vec::new();
        for header in [None, Some("Token x".to_string()), Some("Bearer nope".to_string()), Some(format!("Bearer {}", revoked))] {
            let mut req = actix_test::TestRequest::get().uri("/whoami");
            if let Some(value) = header {
                req = req.insert_header((AUTHORIZATION, value));
            }
            let response = match actix_test::try_call_service(&app, req.to_request()).await {
                Ok(resp) => resp.map_into_boxed_body().into_parts().1,
                Err(err) => err.error_response(),
            };
            assert_eq!(response.status(), 401);
            let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
            bodies.push(body);
        }
        assert!(bodies.windows(2).all(|w| w[0] == w[1]));

        let fresh = state.users.add_session(&user).await.unwrap();
        let req = actix_test::TestRequest::get()
            .uri("/whoami")
            .insert_header((AUTHORIZATION, format!("Bearer {}", fresh)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(actix_test::read_body(resp).await, "guard@example.com");
    }
}
