//! Connection manager: one long-lived DevTools connection per run.
//!
//! Either launches a browser or attaches to a configured endpoint, opens the
//! WebSocket with bounded retries, and attaches to a fresh page target.
//! [`Connection::close`] tears down the transport and then the browser.

mod discover;
mod launch;
mod retry;

pub use discover::{is_websocket_url, resolve_websocket_url, version_url};
pub use launch::{parse_listening_line, BrowserProcess, BROWSER_CANDIDATES};
pub use retry::{connect_with_retry, RetryDecision, RetryPolicy};

use crate::cdp::{Transport, WsTransport};
use crate::config::BrowserConfig;
use crate::error::CaptureError;

pub struct Connection {
    transport: WsTransport,
    browser: Option<BrowserProcess>,
}

impl Connection {
    /// Opens the connection described by `cfg`, retrying per `policy`.
    pub async fn open(cfg: &BrowserConfig, policy: &RetryPolicy) -> Result<Self, CaptureError> {
        let (browser, endpoint) = match &cfg.endpoint {
            Some(endpoint) => (None, endpoint.clone()),
            None => {
                let browser = BrowserProcess::launch(cfg).await?;
                let ws_url = browser.ws_url().to_string();
                (Some(browser), ws_url)
            }
        };

        let connected = connect_with_retry(policy, &endpoint, |attempt| {
            let endpoint = endpoint.clone();
            async move {
                tracing::debug!(attempt, endpoint = %endpoint, "connecting");
                let ws_url = resolve_websocket_url(&endpoint).await?;
                let mut transport = WsTransport::connect(&ws_url).await?;
                transport.attach_new_page().await?;
                anyhow::Ok(transport)
            }
        })
        .await;

        match connected {
            Ok(transport) => Ok(Self { transport, browser }),
            Err(e) => {
                if let Some(browser) = browser {
                    browser.close().await;
                }
                Err(e)
            }
        }
    }

    pub fn into_parts(self) -> (WsTransport, Option<BrowserProcess>) {
        (self.transport, self.browser)
    }

    pub fn from_parts(transport: WsTransport, browser: Option<BrowserProcess>) -> Self {
        Self { transport, browser }
    }

    /// Closes the transport, then terminates a launched browser. Both steps
    /// run even if the first fails.
    pub async fn close(mut self) {
        if let Err(e) = self.transport.close().await {
            tracing::warn!(error = %e, "closing devtools connection failed");
        }
        if let Some(browser) = self.browser.take() {
            browser.close().await;
        }
    }
}
