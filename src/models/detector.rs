use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio::process::Command;

use crate::{
    config::DetectorConfig,
    error::{AppError, AppResult},
};

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DetectorOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Something that runs one capture pass of the mask detector.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn run(&self) -> AppResult<DetectorOutcome>;
}

/// Runs the detector as an external program.
#[derive(Clone, Debug)]
pub struct ScriptDetector {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ScriptDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
        }
    }
}

#[async_trait]
impl Detector for ScriptDetector {
    async fn run(&self) -> AppResult<DetectorOutcome> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|error| AppError::Detector(format!("{}: {error}", self.program)))?;

        Ok(DetectorOutcome {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
