use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::{io, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::{
    config::AppConfig,
    models::{
        detector::{Detector, ScriptDetector},
        session::{SessionKeys, SessionMiddlewareFactory},
        user::User,
        work_permit::WorkPermit,
    },
};

mod config;
mod database;
mod error;
mod models;
mod routes;

fn startup_error(error: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config: AppConfig = AppConfig::load().map_err(startup_error)?;

    database::connect(&config.db).await.map_err(startup_error)?;
    WorkPermit::create_indexes().await.map_err(startup_error)?;
    WorkPermit::sync_sequences().await.map_err(startup_error)?;
    User::create_indexes().await.map_err(startup_error)?;

    if config.session.uses_default_secret() {
        tracing::warn!("session secret is the built-in default, set PERMIT__SESSION__SECRET");
    }
    let keys = SessionKeys::new(&config.session);
    let detector: Arc<dyn Detector> = Arc::new(ScriptDetector::new(&config.detector));
    let bind = (config.host.bind_address.clone(), config.host.bind_port);
    let config = web::Data::new(config);

    tracing::info!(address = %bind.0, port = bind.1, "starting work permit server");

    HttpServer::new(move || {
        App::new()
            .wrap(SessionMiddlewareFactory::new(keys.clone()))
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(routes::json_config())
            .app_data(config.clone())
            .app_data(web::Data::new(keys.clone()))
            .app_data(web::Data::from(detector.clone()))
            .service(routes::user::login)
            .service(routes::user::get_workers)
            .service(routes::get_images)
            .service(routes::get_captured_image)
            .service(routes::real_time::trigger_detector)
            .service(routes::work_permit::get_work_permits)
            .service(routes::work_permit::get_work_permit_pages)
            .service(routes::work_permit::get_work_permit_counts)
            .service(routes::work_permit::get_latest_work_permits)
            .service(routes::work_permit::get_work_permit)
            .service(routes::work_permit::create_work_permit)
            .service(routes::work_permit::update_work_permit)
    })
    .bind(bind)?
    .run()
    .await
}
