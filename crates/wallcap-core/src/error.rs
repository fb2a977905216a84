//! Error taxonomy for a capture run.
//!
//! Every fatal condition carries the step and the url/id it concerns so the
//! CLI can report it without extra context.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cdp::CdpError;
use crate::convert::ConversionError;
use crate::select::NoMatchError;
use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Transport unreachable after the bounded number of attempts.
    #[error("could not establish connection to {endpoint} after {attempts} attempt(s): {last_error}")]
    Connection {
        endpoint: String,
        attempts: u32,
        last_error: String,
    },

    /// The browser process could not be started or never announced its endpoint.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Releasing an intercepted request back to the network failed.
    #[error("failed to continue intercepted request {url}: {source}")]
    Interception {
        url: String,
        #[source]
        source: CdpError,
    },

    #[error(transparent)]
    NoMatch(#[from] NoMatchError),

    #[error("converting {url} failed: {source}")]
    Conversion {
        url: String,
        #[source]
        source: ConversionError,
    },

    #[error("could not write {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A protocol command needed by a step failed.
    #[error("{step} failed: {source}")]
    Protocol {
        step: &'static str,
        #[source]
        source: CdpError,
    },

    #[error("invalid API response from {url}: {reason}")]
    InvalidApiResponse { url: String, reason: String },

    #[error("request {request_id} for {url} failed: {reason}")]
    RequestFailed {
        request_id: String,
        url: String,
        reason: String,
    },

    #[error("timed out after {after:?} while {state}")]
    Timeout { state: SessionState, after: Duration },
}

impl CaptureError {
    pub(crate) fn protocol(step: &'static str) -> impl FnOnce(CdpError) -> CaptureError {
        move |source| CaptureError::Protocol { step, source }
    }
}
