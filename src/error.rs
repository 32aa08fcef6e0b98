use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("INVALID_INPUT: {0}")]
    Validation(String),
    #[error("{0}_NOT_FOUND")]
    NotFound(&'static str),
    #[error("INVALID_STATUS_TRANSITION: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("UNAUTHORIZED")]
    Unauthorized,
    #[error("DATABASE_FAILURE: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("DECODING_FAILURE: {0}")]
    Decoding(#[from] mongodb::bson::de::Error),
    #[error("DATABASE_UNAVAILABLE")]
    DatabaseUnavailable,
    #[error("IO_FAILURE: {0}")]
    Io(#[from] std::io::Error),
    #[error("DETECTOR_FAILURE: {0}")]
    Detector(String),
    #[error("SESSION_INVALID: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Code sent to clients. Internal failures never carry their cause.
    pub fn code(&self) -> String {
        match self {
            Self::Validation(_) => "INVALID_INPUT".to_string(),
            Self::NotFound(_) | Self::InvalidTransition { .. } | Self::Unauthorized => {
                self.to_string()
            }
            Self::Session(_) => "UNAUTHORIZED".to_string(),
            Self::Database(_) | Self::Decoding(_) | Self::DatabaseUnavailable => {
                "DATABASE_FAILURE".to_string()
            }
            Self::Io(_) => "IO_FAILURE".to_string(),
            Self::Detector(_) => "DETECTOR_FAILURE".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(value: validator::ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Unauthorized | Self::Session(_) => StatusCode::UNAUTHORIZED,
            Self::Database(_)
            | Self::Decoding(_)
            | Self::DatabaseUnavailable
            | Self::Io(_)
            | Self::Detector(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.code() }))
    }
}
