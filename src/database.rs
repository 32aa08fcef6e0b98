use mongodb::{Client, Database};
use std::sync::OnceLock;

use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};

static DB: OnceLock<Database> = OnceLock::new();

pub async fn connect(config: &DatabaseConfig) -> AppResult<()> {
    let client = Client::with_uri_str(&config.uri).await?;
    if DB.set(client.database(&config.name)).is_err() {
        tracing::warn!("database handle was already set, keeping the first one");
    }
    Ok(())
}

pub fn get_db() -> AppResult<Database> {
    DB.get().cloned().ok_or(AppError::DatabaseUnavailable)
}
