#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskkeeper::auth::TokenIssuer;
use taskkeeper::email::{Email, Mailer};
use taskkeeper::store::{MemoryStore, Store};
use taskkeeper::{AppError, AppState};

/// Keeps every email instead of sending it.
#[derive(Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<Email>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryStore>,
    pub mailer: RecordingMailer,
}

pub fn context() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let mailer = RecordingMailer::default();
    let state = AppState::new(
        store.clone() as Arc<dyn Store>,
        TokenIssuer::new("integration-secret", 1).expect("issuer"),
        Arc::new(mailer.clone()),
        4,
    )
    .expect("state");
    TestContext {
        state: web::Data::new(state),
        store,
        mailer,
    }
}

/// Calls the app and returns status and body, whether the response came from
/// a handler or from an error raised in middleware.
pub async fn send<S, B>(app: &S, req: actix_http::Request) -> (StatusCode, web::Bytes)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match app.call(req).await {
        Ok(resp) => {
            let status = resp.status();
            (status, test::read_body(resp).await)
        }
        Err(err) => {
            let resp = err.error_response();
            let status = resp.status();
            let body = actix_web::body::to_bytes(resp.into_body())
                .await
                .unwrap_or_default();
            (status, body)
        }
    }
}

pub fn json_body(body: &web::Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| {
        panic!("expected JSON, got {:?}", String::from_utf8_lossy(body))
    })
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Registers a user and returns `(user json, token)`.
pub async fn register<S, B>(app: &S, name: &str, email: &str, password: &str) -> (Value, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "name": name, "email": email, "password": password }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "register failed: {}",
        String::from_utf8_lossy(&body)
    );
    let json = json_body(&body);
    let token = json["token"].as_str().expect("token").to_string();
    (json["user"].clone(), token)
}

/// Lets fire-and-forget tasks spawned by handlers run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
