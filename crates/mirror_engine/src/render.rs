use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use mirror_logging::mirror_debug;
use tokio::process::Command;

use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput, PageFetcher};

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Chrome or Chromium executable, looked up on `PATH` when relative.
    pub binary: PathBuf,
    /// Upper bound for the whole browser process.
    pub timeout: Duration,
    /// Lets page scripts run for this long before the DOM is dumped.
    pub virtual_time_budget: Option<Duration>,
    pub extra_args: Vec<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("chromium"),
            timeout: Duration::from_secs(60),
            virtual_time_budget: Some(Duration::from_secs(5)),
            extra_args: Vec::new(),
        }
    }
}

/// Renders pages with a headless browser and returns the serialized DOM,
/// so tables built by scripts are present in the output.
#[derive(Debug, Clone)]
pub struct HeadlessChromeRenderer {
    settings: RenderSettings,
}

impl HeadlessChromeRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.settings.binary);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--dump-dom");
        if let Some(budget) = self.settings.virtual_time_budget {
            cmd.arg(format!("--virtual-time-budget={}", budget.as_millis()));
        }
        cmd.args(&self.settings.extra_args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait::async_trait]
impl PageFetcher for HeadlessChromeRenderer {
    async fn render(&self, url: &str) -> Result<FetchOutput, FetchError> {
        url::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        mirror_debug!("Rendering {} with {:?}", url, self.settings.binary);
        let child = self.command(url).spawn().map_err(|err| {
            FetchError::new(
                FailureKind::Renderer { exit_code: None },
                format!("failed to start {:?}: {err}", self.settings.binary),
            )
        })?;

        // Dropping the future on timeout kills the browser via kill_on_drop.
        let output = tokio::time::timeout(self.settings.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                FetchError::new(
                    FailureKind::Timeout,
                    format!("renderer did not finish within {:?}", self.settings.timeout),
                )
            })?
            .map_err(|err| FetchError::new(FailureKind::Renderer { exit_code: None }, err.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::new(
                FailureKind::Renderer {
                    exit_code: output.status.code(),
                },
                stderr.trim().to_string(),
            ));
        }
        if !output.stderr.is_empty() {
            mirror_debug!(
                "Renderer stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let byte_len = output.stdout.len() as u64;
        Ok(FetchOutput {
            bytes: output.stdout,
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                redirect_count: 0,
                // --dump-dom always serializes as UTF-8.
                content_type: Some("text/html; charset=utf-8".to_string()),
                byte_len,
            },
        })
    }
}
