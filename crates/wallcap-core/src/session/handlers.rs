//! Event handlers. Each one takes the current download's context explicitly
//! and reports failure through its `Result`; the driver turns any error into
//! the download's outcome.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::cdp::{protocol, InterceptedRequest, PageEvent, RequestId, RequestWillBeSent, Transport};
use crate::error::CaptureError;
use crate::resolver::{self, ResourceAction};
use crate::select::PhotoPage;

use super::{DownloadContext, DownloadSession, SessionState};

impl<T: Transport> DownloadSession<T> {
    /// Applies one event. Resolves with the resource request id once its body
    /// can be read.
    pub(crate) async fn handle_event(
        &mut self,
        ctx: &mut DownloadContext,
        event: PageEvent,
    ) -> Result<Option<RequestId>, CaptureError> {
        match event {
            PageEvent::RequestPaused(request) => {
                self.on_request_paused(ctx, request).await?;
                Ok(None)
            }
            PageEvent::RequestWillBeSent(request) => {
                on_request_will_be_sent(ctx, request);
                Ok(None)
            }
            PageEvent::LoadingFinished { request_id } => {
                self.on_loading_finished(ctx, request_id).await
            }
            PageEvent::LoadingFailed {
                request_id,
                error_text,
            } => {
                on_loading_failed(ctx, &request_id, &error_text)?;
                Ok(None)
            }
            PageEvent::LoadEventFired => {
                tracing::debug!(state = %ctx.state(), "page load event");
                Ok(None)
            }
            PageEvent::Other(_) => Ok(None),
        }
    }

    async fn on_request_paused(
        &mut self,
        ctx: &mut DownloadContext,
        request: InterceptedRequest,
    ) -> Result<(), CaptureError> {
        if request.network_id.as_deref().is_some_and(|id| ctx.is_foreign(id)) {
            tracing::debug!(url = %request.url, "releasing request from a previous document");
            return protocol::continue_request(&mut self.transport, &request.interception_id, None)
                .await
                .map_err(|source| CaptureError::Interception {
                    url: request.url.clone(),
                    source,
                });
        }
        let decision = self
            .options
            .interception
            .on_intercepted(&mut ctx.api_request_url, &request);
        let rewrite = decision
            .is_rewrite(&request.url)
            .then_some(decision.url.as_str());

        // Every paused request is released, matched or not.
        protocol::continue_request(&mut self.transport, &request.interception_id, rewrite)
            .await
            .map_err(|source| CaptureError::Interception {
                url: request.url.clone(),
                source,
            })?;

        if !decision.canonical {
            tracing::trace!(url = %request.url, "released paused request");
            return Ok(());
        }
        ctx.rewritten_api_url = Some(decision.url.clone());
        let id = request
            .network_id
            .clone()
            .or_else(|| ctx.ledger.lookup(&request.url).cloned());
        if let Some(id) = id {
            tracing::debug!(request_id = %id, "API request identified");
            ctx.api_request_id = Some(id);
            ctx.transition(SessionState::AwaitingApiResponse);
        }
        Ok(())
    }

    async fn on_loading_finished(
        &mut self,
        ctx: &mut DownloadContext,
        request_id: RequestId,
    ) -> Result<Option<RequestId>, CaptureError> {
        if ctx.ledger.on_loading_finished(&request_id) {
            tracing::trace!(request_id = %request_id, "request finished");
        }
        match ctx.state() {
            SessionState::AwaitingApiResponse if ctx.is_api_request(&request_id) => {
                self.on_api_response(ctx, &request_id).await
            }
            SessionState::AwaitingResourceResponse if ctx.is_resource_request(&request_id) => {
                Ok(Some(request_id))
            }
            _ => Ok(None),
        }
    }

    /// Parses the API response, selects a photo and decides how its binary
    /// is obtained.
    async fn on_api_response(
        &mut self,
        ctx: &mut DownloadContext,
        request_id: &str,
    ) -> Result<Option<RequestId>, CaptureError> {
        ctx.transition(SessionState::Selecting);
        let api_url = ctx
            .rewritten_api_url
            .clone()
            .or_else(|| ctx.api_request_url.clone())
            .unwrap_or_default();

        let body = protocol::response_body(&mut self.transport, request_id)
            .await
            .map_err(CaptureError::protocol("reading the API response"))?;
        let raw = if body.base64_encoded {
            STANDARD
                .decode(body.body.trim())
                .map_err(|e| CaptureError::InvalidApiResponse {
                    url: api_url.clone(),
                    reason: e.to_string(),
                })?
        } else {
            body.body.into_bytes()
        };
        let page: PhotoPage =
            serde_json::from_slice(&raw).map_err(|e| CaptureError::InvalidApiResponse {
                url: api_url.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(photos = page.photos.len(), "API response parsed");

        let photo = self.options.selection.select(&page.photos)?.clone();
        let image_size = self.options.interception.image_size();
        let resource_url = photo
            .resource_url(image_size)
            .map(str::to_string)
            .ok_or_else(|| CaptureError::InvalidApiResponse {
                url: api_url.clone(),
                reason: format!("photo {} has no image URL", photo.display_name()),
            })?;
        tracing::info!(
            photo = %photo.display_name(),
            width = photo.width,
            height = photo.height,
            score = photo.score(),
            "selected"
        );

        ctx.transition(SessionState::ResolvingResource);
        let action = resolver::resolve(&ctx.ledger, &resource_url);
        tracing::debug!(url = %resource_url, action = action.label(), "resource resolved");
        ctx.photo = Some(photo);
        ctx.resource_url = Some(resource_url.clone());
        ctx.resolution = Some(action.clone());

        match action {
            ResourceAction::AlreadyComplete(id) => {
                ctx.resource_request_id = Some(id.clone());
                Ok(Some(id))
            }
            ResourceAction::AwaitInFlight(id) => {
                ctx.resource_request_id = Some(id);
                ctx.transition(SessionState::AwaitingResourceResponse);
                Ok(None)
            }
            ResourceAction::Fetch => {
                ctx.transition(SessionState::AwaitingResourceResponse);
                let navigation = protocol::navigate(&mut self.transport, &resource_url)
                    .await
                    .map_err(CaptureError::protocol("requesting the image"))?;
                if let Some(reason) = navigation.rejection() {
                    return Err(CaptureError::Navigation {
                        url: resource_url,
                        reason: reason.to_string(),
                    });
                }
                ctx.follow_navigation(&navigation);
                Ok(None)
            }
        }
    }
}

fn on_request_will_be_sent(ctx: &mut DownloadContext, request: RequestWillBeSent) {
    if !ctx.is_current_document(request.loader_id.as_deref()) {
        tracing::debug!(
            request_id = %request.request_id,
            url = %request.url,
            "ignoring request from a previous document"
        );
        ctx.mark_foreign(request.request_id);
        return;
    }
    if !ctx
        .ledger
        .on_request_will_be_sent(&request.request_id, &request.method, &request.url)
    {
        return;
    }
    tracing::trace!(request_id = %request.request_id, url = %request.url, "tracking request");

    if ctx.api_request_id.is_none()
        && ctx.state() == SessionState::AwaitingApiRequest
        && ctx.is_api_url(&request.url)
    {
        tracing::debug!(request_id = %request.request_id, "API request identified");
        ctx.api_request_id = Some(request.request_id);
        ctx.transition(SessionState::AwaitingApiResponse);
        return;
    }
    if ctx.resource_request_id.is_none()
        && ctx.state() == SessionState::AwaitingResourceResponse
        && ctx.resource_url.as_deref() == Some(request.url.as_str())
    {
        tracing::debug!(request_id = %request.request_id, "image request identified");
        ctx.resource_request_id = Some(request.request_id);
    }
}

fn on_loading_failed(
    ctx: &DownloadContext,
    request_id: &str,
    error_text: &str,
) -> Result<(), CaptureError> {
    let url = if ctx.is_api_request(request_id) {
        ctx.rewritten_api_url.clone()
    } else if ctx.is_resource_request(request_id) {
        ctx.resource_url.clone()
    } else {
        return Ok(());
    };
    Err(CaptureError::RequestFailed {
        request_id: request_id.to_string(),
        url: url.unwrap_or_default(),
        reason: error_text.to_string(),
    })
}
