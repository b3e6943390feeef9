#![doc = "The `taskkeeper` library crate."]
#![doc = ""]
#![doc = "Users, token sessions and owner-scoped tasks behind an actix-web API."]
#![doc = "Storage sits behind the `store::Store` trait (Postgres or in-memory); the"]
#![doc = "binary (`main.rs`) wires a store, the mailer and `routes::config` together."]

pub mod auth;
pub mod avatar;
pub mod config;
pub mod email;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use error::AppError;
pub use state::AppState;
