//! DevTools protocol over a WebSocket.
//!
//! Single-task and cooperative: a command writes its frame and then reads
//! frames until its response arrives, queueing every event seen meanwhile.

use std::collections::VecDeque;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{CdpError, CdpEvent, Transport};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsTransport {
    socket: Socket,
    next_id: u64,
    /// Flattened target session all page commands are routed to.
    session_id: Option<String>,
    events: VecDeque<CdpEvent>,
}

/// A decoded incoming frame.
enum Incoming {
    Response { id: u64, outcome: Result<Value, (i64, String)> },
    Event(CdpEvent),
    Ignored,
}

impl WsTransport {
    /// Opens the WebSocket to a browser (or page) debugger URL.
    pub async fn connect(ws_url: &str) -> Result<Self, CdpError> {
        let (socket, _) = connect_async(ws_url).await?;
        tracing::debug!(url = ws_url, "devtools websocket connected");
        Ok(Self {
            socket,
            next_id: 1,
            session_id: None,
            events: VecDeque::new(),
        })
    }

    /// Creates a blank page target and attaches to it in flattened mode;
    /// afterwards all commands go to that page.
    pub async fn attach_new_page(&mut self) -> Result<String, CdpError> {
        let created = self
            .command("Target.createTarget", json!({ "url": "about:blank" }))
            .await?;
        let target_id = string_field(&created, "targetId", "Target.createTarget")?;
        let attached = self
            .command(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session_id = string_field(&attached, "sessionId", "Target.attachToTarget")?;
        tracing::debug!(target = %target_id, session = %session_id, "attached to page target");
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    async fn read_frame(&mut self) -> Result<Incoming, CdpError> {
        loop {
            let frame = match self.socket.next().await {
                Some(frame) => frame?,
                None => return Err(CdpError::Closed),
            };
            match frame {
                Message::Text(text) => return self.decode(text.as_str()),
                Message::Close(_) => return Err(CdpError::Closed),
                _ => continue,
            }
        }
    }

    fn decode(&self, text: &str) -> Result<Incoming, CdpError> {
        let value: Value = serde_json::from_str(text)?;
        if let Some(id) = value.get("id").and_then(Value::as_u64) {
            let outcome = match value.get("error") {
                Some(err) => Err((
                    err.get("code").and_then(Value::as_i64).unwrap_or(0),
                    err.get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                )),
                None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
            };
            return Ok(Incoming::Response { id, outcome });
        }
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return Ok(Incoming::Ignored);
        };
        let event_session = value.get("sessionId").and_then(Value::as_str);
        if self.session_id.is_some() && event_session != self.session_id.as_deref() {
            return Ok(Incoming::Ignored);
        }
        Ok(Incoming::Event(CdpEvent::new(
            method,
            value.get("params").cloned().unwrap_or(Value::Null),
        )))
    }
}

impl Transport for WsTransport {
    async fn command(&mut self, method: &str, params: Value) -> Result<Value, CdpError> {
        let id = self.next_id;
        self.next_id += 1;

        let mut frame = json!({ "id": id, "method": method, "params": params });
        if let Some(session_id) = &self.session_id {
            frame["sessionId"] = Value::String(session_id.clone());
        }
        self.socket
            .send(Message::Text(frame.to_string().into()))
            .await?;

        loop {
            match self.read_frame().await? {
                Incoming::Response { id: got, outcome } if got == id => {
                    return outcome.map_err(|(code, message)| CdpError::Remote {
                        method: method.to_string(),
                        code,
                        message,
                    });
                }
                Incoming::Response { id: stale, .. } => {
                    tracing::trace!(id = stale, "dropping response to an abandoned command");
                }
                Incoming::Event(event) => self.events.push_back(event),
                Incoming::Ignored => {}
            }
        }
    }

    async fn next_event(&mut self) -> Result<CdpEvent, CdpError> {
        if let Some(event) = self.events.pop_front() {
            return Ok(event);
        }
        loop {
            if let Incoming::Event(event) = self.read_frame().await? {
                return Ok(event);
            }
        }
    }

    fn try_next_event(&mut self) -> Option<CdpEvent> {
        self.events.pop_front()
    }

    async fn close(&mut self) -> Result<(), CdpError> {
        match self.socket.close(None).await {
            Ok(()) | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn string_field(value: &Value, field: &str, method: &str) -> Result<String, CdpError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CdpError::UnexpectedShape {
            method: method.to_string(),
            detail: format!("missing `{}`", field),
        })
}
