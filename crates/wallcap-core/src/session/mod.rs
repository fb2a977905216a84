//! Download session: drives one browser page through
//! navigate → intercept → select → resolve → convert → write.
//!
//! A session wraps one transport for its whole lifetime. Each
//! [`DownloadSession::download`] call builds a fresh [`DownloadContext`], so
//! nothing from a previous download (canonical API URL, ledger, ids) leaks
//! into the next. `&mut self` makes concurrent downloads on one session
//! impossible.

mod context;
mod handlers;
mod state;

pub use context::DownloadContext;
pub use state::SessionState;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;

use crate::cdp::{protocol, PageEvent, RequestId, Transport};
use crate::config::WallcapConfig;
use crate::convert::PayloadConverter;
use crate::error::CaptureError;
use crate::intercept::{ApiMatcher, InterceptionPolicy, QueryOverrides};
use crate::resolver::ResourceAction;
use crate::select::{Photo, SelectionPolicy};
use crate::storage;
use crate::url_model::Destination;

/// Everything a download needs besides the transport.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub interception: InterceptionPolicy,
    pub selection: SelectionPolicy,
    pub converter: PayloadConverter,
    /// Longest time any single state may last.
    pub step_timeout: Duration,
}

impl CaptureOptions {
    pub fn from_config(cfg: &WallcapConfig) -> anyhow::Result<Self> {
        let matcher = ApiMatcher::new(&cfg.capture.api_endpoint)
            .with_context(|| format!("invalid API endpoint: {}", cfg.capture.api_endpoint))?;
        Ok(Self {
            interception: InterceptionPolicy::new(
                matcher,
                cfg.image_size(),
                QueryOverrides {
                    feature: cfg.capture.feature.clone(),
                    category: cfg.capture.category.clone(),
                },
            ),
            selection: cfg.selection_policy(),
            converter: PayloadConverter::new(cfg.capture.output_format, cfg.capture.conversion),
            step_timeout: cfg.step_timeout(),
        })
    }
}

/// Outcome of a successful download.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub destination: PathBuf,
    /// Canonical API request as the page issued it.
    pub api_request_url: String,
    /// Same request as released to the network.
    pub rewritten_api_url: String,
    pub resource_url: String,
    pub photo: Photo,
    pub resolution: ResourceAction,
    pub bytes_written: u64,
}

pub struct DownloadSession<T: Transport> {
    transport: T,
    options: CaptureOptions,
    /// Domains enabled and interception installed on this transport.
    configured: bool,
}

impl<T: Transport> DownloadSession<T> {
    pub fn new(transport: T, options: CaptureOptions) -> Self {
        Self {
            transport,
            options,
            configured: false,
        }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Captures one image from `source_url` into `destination`.
    pub async fn download(
        &mut self,
        destination: Destination,
        source_url: &str,
    ) -> Result<DownloadReport, CaptureError> {
        let mut ctx = DownloadContext::new(source_url, destination, self.options.step_timeout);
        match self.drive(&mut ctx).await {
            Ok(report) => {
                ctx.transition(SessionState::Done);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(state = %ctx.state(), source = %source_url, error = %e, "download failed");
                ctx.transition(SessionState::Failed);
                self.release_pending().await;
                Err(e)
            }
        }
    }

    async fn drive(&mut self, ctx: &mut DownloadContext) -> Result<DownloadReport, CaptureError> {
        let limit = self.options.step_timeout;

        ctx.transition(SessionState::Configuring);
        self.release_pending().await;
        if !self.configured {
            let pattern = self.options.interception.matcher().fetch_pattern();
            within(ctx.state(), limit, protocol::enable_domains(&mut self.transport, &pattern))
                .await?
                .map_err(CaptureError::protocol("enabling DevTools domains"))?;
            self.configured = true;
            tracing::debug!(pattern = %pattern, "interception installed");
        }

        ctx.transition(SessionState::Navigating);
        let navigation = within(ctx.state(), limit, protocol::navigate(&mut self.transport, &ctx.source_url))
            .await?
            .map_err(CaptureError::protocol("navigating"))?;
        if let Some(reason) = navigation.rejection() {
            return Err(CaptureError::Navigation {
                url: ctx.source_url.clone(),
                reason: reason.to_string(),
            });
        }
        ctx.follow_navigation(&navigation);
        ctx.transition(SessionState::AwaitingApiRequest);

        let resource_id = self.pump(ctx).await?;

        ctx.transition(SessionState::Converting);
        let resource_url = ctx.resource_url.clone().unwrap_or_default();
        let body = within(ctx.state(), limit, protocol::response_body(&mut self.transport, &resource_id))
            .await?
            .map_err(CaptureError::protocol("reading the image response"))?;
        let converter = self.options.converter;
        let bytes = within(ctx.state(), limit, converter.convert(&mut self.transport, &body))
            .await?
            .map_err(|source| CaptureError::Conversion {
                url: resource_url.clone(),
                source,
            })?;

        ctx.transition(SessionState::Writing);
        let photo = ctx.photo.clone().unwrap_or_default();
        let path = ctx.destination.resolve(&photo.display_name(), converter.target);
        let bytes_written = storage::persist(&path, &bytes)
            .await
            .map_err(|source| CaptureError::Persistence {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), bytes = bytes_written, "image saved");

        Ok(DownloadReport {
            destination: path,
            api_request_url: ctx.api_request_url.clone().unwrap_or_default(),
            rewritten_api_url: ctx.rewritten_api_url.clone().unwrap_or_default(),
            resource_url,
            photo,
            resolution: ctx.resolution.clone().unwrap_or(ResourceAction::Fetch),
            bytes_written,
        })
    }

    /// Feeds events to the handlers until the resource body is ready.
    async fn pump(&mut self, ctx: &mut DownloadContext) -> Result<RequestId, CaptureError> {
        let limit = self.options.step_timeout;
        loop {
            let raw = match tokio::time::timeout_at(ctx.deadline(), self.transport.next_event()).await {
                Ok(event) => event.map_err(CaptureError::protocol("reading browser events"))?,
                Err(_) => {
                    return Err(CaptureError::Timeout {
                        state: ctx.state(),
                        after: limit,
                    })
                }
            };
            let event = match PageEvent::parse(&raw) {
                Ok(event) => event,
                Err(e) => {
                    tracing::debug!(method = %raw.method, error = %e, "ignoring malformed event");
                    continue;
                }
            };
            let state = ctx.state();
            if let Some(id) = within(state, limit, self.handle_event(ctx, event)).await?? {
                return Ok(id);
            }
        }
    }

    /// Releases paused requests that were already received and drops every
    /// other buffered event.
    async fn release_pending(&mut self) {
        let limit = self.options.step_timeout;
        while let Some(raw) = self.transport.try_next_event() {
            let Ok(PageEvent::RequestPaused(request)) = PageEvent::parse(&raw) else {
                continue;
            };
            let released = tokio::time::timeout(
                limit,
                protocol::continue_request(&mut self.transport, &request.interception_id, None),
            )
            .await;
            match released {
                Ok(Ok(())) => tracing::warn!(url = %request.url, "released stale interception"),
                Ok(Err(e)) => {
                    tracing::warn!(url = %request.url, error = %e, "could not release interception")
                }
                Err(_) => tracing::warn!(url = %request.url, "releasing interception timed out"),
            }
        }
    }
}

async fn within<F: Future>(
    state: SessionState,
    limit: Duration,
    fut: F,
) -> Result<F::Output, CaptureError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CaptureError::Timeout { state, after: limit })
}
