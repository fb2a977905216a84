//! Resource resolver: decides how the selected photo's binary is obtained.
//!
//! The page may already have requested the same URL (e.g. as a thumbnail)
//! before selection finished, so the ledger is consulted first to avoid
//! fetching twice or waiting for a load that already completed.

use crate::cdp::RequestId;
use crate::ledger::{LoadState, RequestLedger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAction {
    /// Finished load in the ledger; the body can be read now.
    AlreadyComplete(RequestId),
    /// Tracked but unfinished; wait for its completion event.
    AwaitInFlight(RequestId),
    /// Not requested yet; the caller must trigger the load and then wait.
    Fetch,
}

impl ResourceAction {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceAction::AlreadyComplete(_) => "already-complete",
            ResourceAction::AwaitInFlight(_) => "in-flight",
            ResourceAction::Fetch => "fetch",
        }
    }
}

pub fn resolve(ledger: &RequestLedger, resource_url: &str) -> ResourceAction {
    let Some(id) = ledger.lookup(resource_url) else {
        return ResourceAction::Fetch;
    };
    match ledger.is_finished(id) {
        LoadState::Finished => ResourceAction::AlreadyComplete(id.clone()),
        LoadState::InFlight => ResourceAction::AwaitInFlight(id.clone()),
        LoadState::Unknown => ResourceAction::Fetch,
    }
}
