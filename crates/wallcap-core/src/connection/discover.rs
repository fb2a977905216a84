//! Resolve a remote debugging endpoint to its browser WebSocket URL.
//!
//! Uses the curl crate (libcurl) to fetch `/json/version` from a browser
//! started with `--remote-debugging-port`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
    #[serde(rename = "Browser", default)]
    browser: Option<String>,
}

/// True for endpoints that are already a WebSocket URL.
pub fn is_websocket_url(endpoint: &str) -> bool {
    endpoint.starts_with("ws://") || endpoint.starts_with("wss://")
}

/// `http://host:port` (trailing slash optional) → `http://host:port/json/version`.
pub fn version_url(endpoint: &str) -> String {
    format!("{}/json/version", endpoint.trim_end_matches('/'))
}

/// Performs `GET /json/version` and returns the body.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn fetch_version(endpoint: &str) -> Result<Vec<u8>> {
    let url = version_url(endpoint);
    let mut body = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&url).context("invalid endpoint URL")?;
    easy.connect_timeout(Duration::from_secs(5))?;
    easy.timeout(Duration::from_secs(10))?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer
            .perform()
            .with_context(|| format!("GET {} failed", url))?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    Ok(body)
}

pub(crate) fn parse_version(body: &[u8]) -> Result<String> {
    let info: VersionInfo =
        serde_json::from_slice(body).context("parse /json/version response")?;
    if let Some(browser) = &info.browser {
        tracing::debug!(browser = %browser, "remote browser found");
    }
    Ok(info.web_socket_debugger_url)
}

/// WebSocket URL for `endpoint`: used as is when it already is one,
/// otherwise discovered over HTTP.
pub async fn resolve_websocket_url(endpoint: &str) -> Result<String> {
    if is_websocket_url(endpoint) {
        return Ok(endpoint.to_string());
    }
    let body = tokio::task::spawn_blocking({
        let endpoint = endpoint.to_string();
        move || fetch_version(&endpoint)
    })
    .await
    .context("discovery task join")??;
    parse_version(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_url_joins_path() {
        assert_eq!(
            version_url("http://127.0.0.1:9222/"),
            "http://127.0.0.1:9222/json/version"
        );
        assert_eq!(
            version_url("http://localhost:9222"),
            "http://localhost:9222/json/version"
        );
    }

    #[test]
    fn parses_version_payload() {
        let body = br#"{
            "Browser": "Chrome/126.0.6478.126",
            "Protocol-Version": "1.3",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
        }"#;
        assert_eq!(
            parse_version(body).unwrap(),
            "ws://127.0.0.1:9222/devtools/browser/abc"
        );
        assert!(parse_version(b"{}").is_err());
    }

    #[tokio::test]
    async fn websocket_endpoint_is_used_directly() {
        let ws = "ws://127.0.0.1:9222/devtools/browser/abc";
        assert!(is_websocket_url(ws));
        assert!(!is_websocket_url("http://127.0.0.1:9222"));
        assert_eq!(resolve_websocket_url(ws).await.unwrap(), ws);
    }
}
