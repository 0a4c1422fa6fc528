//! Configuration for capture and replay

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RetraceError, Result};
use crate::replay::RunMode;

/// Top-level configuration, loadable from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetraceConfig {
    /// Remote WebDriver endpoint used for replay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

impl RetraceConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RetraceError::InvalidConfig {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| RetraceError::InvalidConfig {
            reason: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RETRACE_ENDPOINT`, `RETRACE_OUTPUT_DIR` and `RETRACE_SETTLE_MS`
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an explicit variable source
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("RETRACE_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(dir) = lookup("RETRACE_OUTPUT_DIR") {
            self.replay.output_root = PathBuf::from(dir);
        }
        if let Some(ms) = lookup("RETRACE_SETTLE_MS") {
            self.replay.settle_delay_ms =
                ms.trim().parse().map_err(|_| RetraceError::InvalidConfig {
                    reason: format!("RETRACE_SETTLE_MS must be an integer, got '{}'", ms),
                })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.artifact_file_name.trim().is_empty() {
            return Err(RetraceError::InvalidConfig {
                reason: "artifact_file_name must not be empty".to_string(),
            });
        }
        if self.replay.browser_name.trim().is_empty() {
            return Err(RetraceError::InvalidConfig {
                reason: "browser_name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Capture-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Minimum vertical scroll distance (pixels, exclusive) worth recording
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: u32,

    /// Window within which an identical input from the second source is a duplicate
    #[serde(default = "default_dedup_window")]
    pub input_dedup_window_ms: u64,

    /// Directory for the file-backed event log; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Name of the exported artifact
    #[serde(default = "default_artifact_file_name")]
    pub artifact_file_name: String,

    /// Command queue depth of the capture controller
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_scroll_threshold() -> u32 { 50 }
fn default_dedup_window() -> u64 { 250 }
fn default_artifact_file_name() -> String { "recorded-events.json".to_string() }
fn default_queue_capacity() -> usize { 256 }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: default_scroll_threshold(),
            input_dedup_window_ms: default_dedup_window(),
            storage_dir: None,
            artifact_file_name: default_artifact_file_name(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl CaptureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_threshold(mut self, pixels: u32) -> Self {
        self.scroll_threshold = pixels;
        self
    }

    pub fn input_dedup_window(mut self, window: Duration) -> Self {
        self.input_dedup_window_ms = window.as_millis() as u64;
        self
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn artifact_file_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_file_name = name.into();
        self
    }
}

/// What the replay engine does after a recoverable step failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Log, screenshot and move on to the next record
    #[default]
    Continue,
    /// Screenshot, then stop the run as failed
    Abort,
}

/// Replay-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub run_mode: RunMode,

    /// Root of the `{baseline|current}` screenshot partitions
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Pause between steps so the page can settle
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    #[serde(default)]
    pub strictness: Strictness,

    #[serde(default = "default_browser_name")]
    pub browser_name: String,

    /// Timeout for establishing the remote session
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_ms: u64,

    /// Timeout for each driver command
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_output_root() -> PathBuf { PathBuf::from("screenshots") }
fn default_settle_delay() -> u64 { 1000 }
fn default_browser_name() -> String { "chrome".to_string() }
fn default_connection_timeout() -> u64 { 180_000 }
fn default_request_timeout() -> u64 { 60_000 }

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            output_root: default_output_root(),
            settle_delay_ms: default_settle_delay(),
            strictness: Strictness::default(),
            browser_name: default_browser_name(),
            connection_timeout_ms: default_connection_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl ReplayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_mode(mut self, mode: RunMode) -> Self {
        self.run_mode = mode;
        self
    }

    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn browser_name(mut self, name: impl Into<String>) -> Self {
        self.browser_name = name.into();
        self
    }

    pub fn settle_delay_duration(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `<output_root>/<mode>`
    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_root.join(self.run_mode.dir_name())
    }
}
