use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use taskkeeper::config::Config;
use taskkeeper::store::{MemoryStore, PgStore, Store};
use taskkeeper::{email, routes, AppState};

fn startup_error<E: std::fmt::Display>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

async fn open_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await.map_err(startup_error)?;
            store.migrate().await.map_err(startup_error)?;
            log::info!("using Postgres store");
            Ok(Arc::new(store))
        }
        None => {
            log::warn!("DATABASE_URL not set; data lives in memory and is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(startup_error)?;
    let store = open_store(&config).await?;
    let mailer = email::from_config(&config);
    let state = web::Data::new(AppState::from_config(&config, store, mailer).map_err(startup_error)?);

    log::info!("starting taskkeeper at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header().max_age(3600))
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .client_request_timeout(Duration::from_secs(config.request_timeout_secs))
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
