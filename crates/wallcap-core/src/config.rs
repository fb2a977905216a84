use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convert::{ConversionStrategy, ImageEncoding};
use crate::select::{default_image_size, SelectionPolicy};

/// How the browser is obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome/Chromium binary; when unset the usual names are tried on PATH.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Extra command-line switches passed to the browser.
    pub extra_args: Vec<String>,
    /// Attach to an already running browser instead of launching one:
    /// `http://host:port` (resolved via /json/version) or a `ws://` URL.
    pub endpoint: Option<String>,
    /// Seconds to wait for a launched browser to announce its endpoint.
    pub launch_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            extra_args: Vec::new(),
            endpoint: None,
            launch_timeout_secs: 30,
        }
    }
}

/// Connection retry parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Attempts before giving up (including the first).
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds.
    pub retry_interval_ms: u64,
    /// Longest a single attempt (endpoint discovery, handshake, page attach)
    /// may take, in milliseconds.
    pub attempt_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_interval_ms: 1000,
            attempt_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Page navigated to; its photo API request is intercepted.
    pub source_url: String,
    /// Endpoint whose requests are intercepted and rewritten.
    pub api_endpoint: String,
    /// Image size requested from the API; derived from min width/height when unset.
    pub image_size: Option<u32>,
    /// Photo stream (`feature=`) forced onto the API request.
    pub feature: Option<String>,
    /// Category filter (`only=`) forced onto the API request.
    pub category: Option<String>,
    pub output_format: ImageEncoding,
    pub conversion: ConversionStrategy,
    /// Longest wait for any single awaited protocol event, in seconds.
    pub step_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_url: "https://500px.com/popular".to_string(),
            api_endpoint: "https://api.500px.com/v1/photos".to_string(),
            image_size: None,
            feature: None,
            category: None,
            output_format: ImageEncoding::Jpeg,
            conversion: ConversionStrategy::Native,
            step_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub landscape_required: bool,
    pub min_width: u32,
    pub min_height: u32,
    /// Photos must score strictly above this.
    pub min_score: Option<f64>,
}

/// Global configuration loaded from `~/.config/wallcap/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WallcapConfig {
    pub browser: BrowserConfig,
    pub connection: ConnectionConfig,
    pub capture: CaptureConfig,
    pub selection: SelectionConfig,
}

impl WallcapConfig {
    pub fn image_size(&self) -> u32 {
        self.capture
            .image_size
            .unwrap_or_else(|| default_image_size(self.selection.min_width, self.selection.min_height))
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            landscape_required: self.selection.landscape_required,
            min_width: self.selection.min_width,
            min_height: self.selection.min_height,
            min_score: self.selection.min_score,
        }
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.capture.step_timeout_secs.max(1))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wallcap")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WallcapConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = WallcapConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file; missing keys take defaults.
pub fn load_from(path: &Path) -> Result<WallcapConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: WallcapConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
