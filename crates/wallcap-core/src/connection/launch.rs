//! Spawning a Chrome/Chromium process with remote debugging enabled.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};

use crate::config::BrowserConfig;
use crate::error::CaptureError;

/// Binaries tried, in order, when no executable is configured.
pub const BROWSER_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const LISTENING_PREFIX: &str = "DevTools listening on ";

/// A running browser. Killed when dropped; the profile directory is
/// removed with it.
pub struct BrowserProcess {
    child: Child,
    ws_url: String,
    _profile: TempDir,
}

impl BrowserProcess {
    /// Starts the browser and waits for it to announce its DevTools endpoint.
    pub async fn launch(cfg: &BrowserConfig) -> Result<Self, CaptureError> {
        let profile = tempfile::Builder::new()
            .prefix("wallcap-profile-")
            .tempdir()
            .map_err(|e| CaptureError::Launch(format!("create profile dir: {}", e)))?;
        let args = browser_args(cfg, &profile);

        let mut last_error = None;
        let mut spawned = None;
        for candidate in candidates(cfg) {
            let mut cmd = Command::new(&candidate);
            cmd.args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            match cmd.spawn() {
                Ok(child) => {
                    tracing::debug!(browser = %candidate.display(), "browser spawned");
                    spawned = Some(child);
                    break;
                }
                Err(e) => last_error = Some(format!("{}: {}", candidate.display(), e)),
            }
        }
        let mut child = spawned.ok_or_else(|| {
            CaptureError::Launch(
                last_error.unwrap_or_else(|| "no browser executable candidates".to_string()),
            )
        })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CaptureError::Launch("browser stderr not captured".to_string()))?;
        let mut lines = BufReader::new(stderr).lines();
        let timeout = Duration::from_secs(cfg.launch_timeout_secs.max(1));

        let ws_url = match tokio::time::timeout(timeout, wait_for_endpoint(&mut lines)).await {
            Ok(Ok(url)) => url,
            Ok(Err(reason)) => {
                stop(&mut child).await;
                return Err(CaptureError::Launch(reason));
            }
            Err(_) => {
                stop(&mut child).await;
                return Err(CaptureError::Launch(format!(
                    "browser did not announce a DevTools endpoint within {:?}",
                    timeout
                )));
            }
        };

        // Keep draining stderr so the browser never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::trace!(target: "wallcap_core::browser", "{}", line);
            }
        });

        tracing::info!(endpoint = %ws_url, "browser ready");
        Ok(Self {
            child,
            ws_url,
            _profile: profile,
        })
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Terminates the browser and reaps it.
    pub async fn close(mut self) {
        stop(&mut self.child).await;
        tracing::debug!("browser terminated");
    }
}

fn candidates(cfg: &BrowserConfig) -> Vec<PathBuf> {
    match &cfg.executable {
        Some(path) => vec![path.clone()],
        None => BROWSER_CANDIDATES.iter().map(PathBuf::from).collect(),
    }
}

fn browser_args(cfg: &BrowserConfig, profile: &TempDir) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--remote-debugging-port=0".into(),
        format!("--user-data-dir={}", profile.path().display()).into(),
        "--no-first-run".into(),
        "--no-default-browser-check".into(),
    ];
    if cfg.headless {
        args.push("--headless=new".into());
    }
    args.extend(
        cfg.extra_args
            .iter()
            .filter(|a| !a.trim().is_empty())
            .map(OsString::from),
    );
    args.push("about:blank".into());
    args
}

async fn wait_for_endpoint(lines: &mut Lines<BufReader<ChildStderr>>) -> Result<String, String> {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(url) = parse_listening_line(&line) {
                    return Ok(url);
                }
                tracing::trace!(target: "wallcap_core::browser", "{}", line);
            }
            Ok(None) => return Err("browser exited before announcing a DevTools endpoint".to_string()),
            Err(e) => return Err(format!("read browser stderr: {}", e)),
        }
    }
}

/// Extracts the WebSocket URL from `DevTools listening on ws://...`.
pub fn parse_listening_line(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(LISTENING_PREFIX)?;
    let url = rest.split_whitespace().next()?;
    url.starts_with("ws://").then(|| url.to_string())
}

async fn stop(child: &mut Child) {
    if let Err(err) = child.kill().await {
        tracing::debug!("failed to kill browser process: {}", err);
    }
    let _ = child.wait().await;
}
