//! Per-download state. A fresh context is built for every download and
//! dropped when it finishes; nothing in it outlives one call.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::cdp::{Navigation, RequestId};
use crate::ledger::RequestLedger;
use crate::resolver::ResourceAction;
use crate::select::Photo;
use crate::url_model::Destination;

use super::SessionState;

#[derive(Debug)]
pub struct DownloadContext {
    state: SessionState,
    pub(crate) ledger: RequestLedger,
    pub(crate) source_url: String,
    pub(crate) destination: Destination,
    /// Loader of the document this download navigated to. Requests from any
    /// other loader belong to an earlier page and are not tracked.
    loader_id: Option<String>,
    /// Requests dropped because they came from another document.
    foreign_requests: HashSet<RequestId>,
    /// Original URL of the canonical API request; `None` until intercepted.
    pub(crate) api_request_url: Option<String>,
    /// URL the canonical API request was released with.
    pub(crate) rewritten_api_url: Option<String>,
    pub(crate) api_request_id: Option<RequestId>,
    pub(crate) photo: Option<Photo>,
    pub(crate) resource_url: Option<String>,
    pub(crate) resource_request_id: Option<RequestId>,
    pub(crate) resolution: Option<ResourceAction>,
    step_timeout: Duration,
    deadline: Instant,
}

impl DownloadContext {
    pub fn new(source_url: &str, destination: Destination, step_timeout: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            ledger: RequestLedger::new(),
            source_url: source_url.to_string(),
            destination,
            loader_id: None,
            foreign_requests: HashSet::new(),
            api_request_url: None,
            rewritten_api_url: None,
            api_request_id: None,
            photo: None,
            resource_url: None,
            resource_request_id: None,
            resolution: None,
            step_timeout,
            deadline: Instant::now() + step_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Instant by which the current state must be left.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Moves to `next` and re-arms the deadline.
    pub(crate) fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?next, source = %self.source_url, "session transition");
        self.state = next;
        self.deadline = Instant::now() + self.step_timeout;
    }

    /// Adopts the document a navigation started.
    pub(crate) fn follow_navigation(&mut self, navigation: &Navigation) {
        if let Some(loader) = &navigation.loader_id {
            tracing::debug!(loader = %loader, frame = %navigation.frame_id, "following document");
            self.loader_id = Some(loader.clone());
        }
    }

    /// False when `loader` is known to differ from the followed document.
    pub(crate) fn is_current_document(&self, loader: Option<&str>) -> bool {
        match (self.loader_id.as_deref(), loader) {
            (Some(current), Some(loader)) => current == loader,
            _ => true,
        }
    }

    pub(crate) fn mark_foreign(&mut self, request_id: RequestId) {
        self.foreign_requests.insert(request_id);
    }

    pub(crate) fn is_foreign(&self, request_id: &str) -> bool {
        self.foreign_requests.contains(request_id)
    }

    /// API request id known and its response not yet consumed.
    pub(crate) fn is_api_request(&self, request_id: &str) -> bool {
        self.api_request_id.as_deref() == Some(request_id)
    }

    pub(crate) fn is_resource_request(&self, request_id: &str) -> bool {
        self.resource_request_id.as_deref() == Some(request_id)
    }

    /// True when `url` is the canonical API request, before or after rewriting.
    pub(crate) fn is_api_url(&self, url: &str) -> bool {
        self.api_request_url.as_deref() == Some(url) || self.rewritten_api_url.as_deref() == Some(url)
    }
}
