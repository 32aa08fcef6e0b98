use actix_web::{get, web, HttpResponse};
use mime_guess::from_path;
use serde_json::json;
use std::fs;

use crate::{
    config::AppConfig,
    error::AppError,
    models::captured_image::{list_captured_images, resolve_captured_image},
};

pub mod real_time;
pub mod user;
pub mod work_permit;

/// Body extractor settings shared by every JSON route. Serde detail is logged,
/// the client only sees `INVALID_INPUT`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|error, _req| {
        tracing::warn!(%error, "rejected request body");
        AppError::Validation(error.to_string()).into()
    })
}

#[get("/api/get-images")]
pub async fn get_images(config: web::Data<AppConfig>) -> HttpResponse {
    match list_captured_images(&config.images.directory, &config.images.public_prefix) {
        Ok(images) => HttpResponse::Ok().json(images),
        Err(error) => {
            tracing::error!(%error, directory = ?config.images.directory, "reading images failed");
            HttpResponse::InternalServerError().json(json!({ "error": "Failed to load images" }))
        }
    }
}
#[get("/captured_images/{name}")]
pub async fn get_captured_image(
    name: web::Path<String>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let path = match resolve_captured_image(&config.images.directory, &name) {
        Some(path) => path,
        None => return HttpResponse::NotFound().body("IMAGE_NOT_FOUND"),
    };
    if let Ok(file) = fs::read(&path) {
        let mime = from_path(&path).first_or_octet_stream();
        HttpResponse::Ok().content_type(mime).body(file)
    } else {
        HttpResponse::NotFound().body("IMAGE_NOT_FOUND")
    }
}
