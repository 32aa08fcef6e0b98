use chrono::{FixedOffset, Offset, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Default, Deserialize, Clone, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub db: DatabaseConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct HostConfig {
    #[serde(default = "HostConfig::default_address")]
    pub bind_address: String,
    #[serde(default = "HostConfig::default_port")]
    pub bind_port: u16,
}
impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_address: Self::default_address(),
            bind_port: Self::default_port(),
        }
    }
}
impl HostConfig {
    fn default_address() -> String {
        "127.0.0.1".to_string()
    }
    fn default_port() -> u16 {
        8000
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseConfig::default_name")]
    pub name: String,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            name: Self::default_name(),
        }
    }
}
impl DatabaseConfig {
    fn default_uri() -> String {
        "mongodb://localhost:27017".to_string()
    }
    fn default_name() -> String {
        "work-permit".to_string()
    }
}

/// Where the detector drops its captures and how they are exposed over HTTP.
#[derive(Deserialize, Clone, Debug)]
pub struct ImageConfig {
    #[serde(default = "ImageConfig::default_directory")]
    pub directory: PathBuf,
    #[serde(default = "ImageConfig::default_public_prefix")]
    pub public_prefix: String,
}
impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            public_prefix: Self::default_public_prefix(),
        }
    }
}
impl ImageConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("./public/captured_images")
    }
    fn default_public_prefix() -> String {
        "/captured_images".to_string()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct DetectorConfig {
    #[serde(default = "DetectorConfig::default_program")]
    pub program: String,
    #[serde(default = "DetectorConfig::default_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}
impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            args: Self::default_args(),
            working_dir: None,
        }
    }
}
impl DetectorConfig {
    fn default_program() -> String {
        "python".to_string()
    }
    fn default_args() -> Vec<String> {
        vec!["detect_capture.py".to_string()]
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_secret")]
    pub secret: String,
    #[serde(default = "SessionConfig::default_ttl_seconds")]
    pub ttl_seconds: i64,
    #[serde(default = "SessionConfig::default_issuer")]
    pub issuer: String,
}
impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: Self::default_secret(),
            ttl_seconds: Self::default_ttl_seconds(),
            issuer: Self::default_issuer(),
        }
    }
}
impl SessionConfig {
    const DEFAULT_SECRET: &'static str = "change-me";

    fn default_secret() -> String {
        Self::DEFAULT_SECRET.to_string()
    }
    pub fn uses_default_secret(&self) -> bool {
        self.secret == Self::DEFAULT_SECRET
    }
    fn default_ttl_seconds() -> i64 {
        86400
    }
    fn default_issuer() -> String {
        "work-permit".to_string()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SiteConfig {
    /// Offset applied to wall-clock dates that arrive without one.
    #[serde(default = "SiteConfig::default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}
impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: Self::default_utc_offset_hours(),
        }
    }
}
impl SiteConfig {
    fn default_utc_offset_hours() -> i32 {
        7
    }
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("PERMIT_CONFIG").unwrap_or_else(|_| String::from("config"));

        Config::builder()
            .add_source(File::with_name(&file).required(false))
            .add_source(Environment::with_prefix("PERMIT").separator("__"))
            .build()?
            .try_deserialize()
    }
}
