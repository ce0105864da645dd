use crate::error::{Result, StoreError};
use crate::service::RefreshTrigger;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Runs an external ingestion command and waits for it to exit.
#[derive(Debug, Clone)]
pub struct CommandRefresh {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandRefresh {
    /// `None` when `argv` is empty.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.first().map_or(true, |program| program.trim().is_empty()) {
            return None;
        }
        Some(Self { argv, cwd: None })
    }

    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

#[async_trait]
impl RefreshTrigger for CommandRefresh {
    async fn refresh(&self) -> Result<()> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| StoreError::RefreshFailed("empty refresh command".to_string()))?;

        let mut command = Command::new(program);
        command.args(args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        log::info!("Running refresh command: {}", self.argv.join(" "));
        let output = command
            .output()
            .await
            .map_err(|e| StoreError::RefreshFailed(format!("{program}: {e}")))?;

        if output.status.success() {
            log::debug!("Refresh command finished");
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(StoreError::RefreshFailed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}
