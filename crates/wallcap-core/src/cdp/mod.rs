//! DevTools protocol plumbing.
//!
//! The session only talks to the browser through [`Transport`]: send a
//! command and await its result, or await the next event. [`WsTransport`]
//! is the real implementation; tests drive the session with a scripted one.

pub mod protocol;
mod ws;

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

pub use protocol::{
    InterceptedRequest, Navigation, PageEvent, RequestId, ResponseBody, RequestWillBeSent,
};
pub use ws::WsTransport;

/// A raw protocol event: method name plus its params.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

impl CdpEvent {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed protocol message: {0}")]
    Json(#[from] serde_json::Error),

    /// The browser answered the command with an error object.
    #[error("{method} returned error {code}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },

    #[error("connection closed")]
    Closed,

    #[error("unexpected response to {method}: {detail}")]
    UnexpectedShape { method: String, detail: String },
}

/// Duplex command/event channel to one page of the remote browser.
pub trait Transport: Send {
    /// Sends `method` with `params` and resolves with the command's `result` object.
    fn command(
        &mut self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, CdpError>> + Send;

    /// Resolves with the next event, in arrival order.
    fn next_event(&mut self) -> impl Future<Output = Result<CdpEvent, CdpError>> + Send;

    /// Pops an event that has already been received, without waiting.
    fn try_next_event(&mut self) -> Option<CdpEvent>;

    fn close(&mut self) -> impl Future<Output = Result<(), CdpError>> + Send;
}
