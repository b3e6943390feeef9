pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{error, web, HttpRequest};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid query string: {}", err)).into()
}

// ids that are not UUIDs cannot name anything
fn path_error(_err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::NotFound("Not found".into()).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(health::health)
        .service(
            web::scope("/users")
                .service(users::register)
                .service(users::login)
                .service(users::logout)
                .service(users::logout_all)
                .service(users::get_me)
                .service(users::update_me)
                .service(users::delete_me)
                .service(users::upload_avatar)
                .service(users::delete_avatar)
                .service(users::get_avatar),
        )
        .service(
            web::scope("/tasks")
                .wrap(AuthMiddleware)
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
