//! Scripted in-memory browser for driving a `DownloadSession` in tests.
//!
//! Navigating to a URL enqueues the next event batch scripted for that URL.
//! Each navigation starts a new document (`L1`, `L2`, ...); requests in its
//! batch that name no loader are stamped with it.
//! `Network.getResponseBody` answers from a table of bodies keyed by request
//! id. Once the queue is empty `next_event` never resolves, the way a quiet
//! page behaves.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use wallcap_core::cdp::{CdpError, CdpEvent, Transport};

#[derive(Default)]
pub struct MockBrowser {
    queue: VecDeque<CdpEvent>,
    scripts: HashMap<String, VecDeque<Vec<CdpEvent>>>,
    bodies: HashMap<String, (String, bool)>,
    loaders: u32,
    /// Every command sent, in order.
    pub sent: Vec<(String, Value)>,
    /// Fail `Fetch.continueRequest` with a remote error.
    pub fail_continue: bool,
    /// Value returned by `Runtime.evaluate`.
    pub evaluate_result: Value,
    pub closed: bool,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted the next time the page navigates to `url`.
    pub fn on_navigate(&mut self, url: &str, events: Vec<CdpEvent>) -> &mut Self {
        self.scripts
            .entry(url.to_string())
            .or_default()
            .push_back(events);
        self
    }

    /// Events already buffered before the next download starts.
    pub fn preload(&mut self, events: Vec<CdpEvent>) -> &mut Self {
        self.queue.extend(events);
        self
    }

    pub fn text_body(&mut self, request_id: &str, body: &str) -> &mut Self {
        self.bodies
            .insert(request_id.to_string(), (body.to_string(), false));
        self
    }

    pub fn binary_body(&mut self, request_id: &str, bytes: &[u8]) -> &mut Self {
        self.bodies
            .insert(request_id.to_string(), (STANDARD.encode(bytes), true));
        self
    }

    pub fn commands(&self, method: &str) -> Vec<&Value> {
        self.sent
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p)
            .collect()
    }

    /// URLs the page was navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.commands("Page.navigate")
            .into_iter()
            .filter_map(|p| p["url"].as_str().map(str::to_string))
            .collect()
    }

    fn respond(&mut self, method: &str, params: &Value) -> Result<Value, CdpError> {
        match method {
            "Page.navigate" => {
                self.loaders += 1;
                let loader = format!("L{}", self.loaders);
                let url = params["url"].as_str().unwrap_or_default();
                if let Some(batch) = self.scripts.get_mut(url).and_then(VecDeque::pop_front) {
                    self.queue.extend(batch.into_iter().map(|mut event| {
                        if event.method == "Network.requestWillBeSent"
                            && event.params.get("loaderId").is_none()
                        {
                            event.params["loaderId"] = Value::String(loader.clone());
                        }
                        event
                    }));
                }
                Ok(json!({ "frameId": "F1", "loaderId": loader }))
            }
            "Network.getResponseBody" => {
                let id = params["requestId"].as_str().unwrap_or_default();
                match self.bodies.get(id) {
                    Some((body, encoded)) => Ok(json!({ "body": body, "base64Encoded": encoded })),
                    None => Err(CdpError::Remote {
                        method: method.to_string(),
                        code: -32000,
                        message: "No resource with given identifier found".to_string(),
                    }),
                }
            }
            "Fetch.continueRequest" if self.fail_continue => Err(CdpError::Remote {
                method: method.to_string(),
                code: -32602,
                message: "Invalid InterceptionId.".to_string(),
            }),
            "Runtime.evaluate" => Ok(json!({
                "result": { "type": "string", "value": self.evaluate_result.clone() }
            })),
            _ => Ok(json!({})),
        }
    }
}

impl Transport for MockBrowser {
    async fn command(&mut self, method: &str, params: Value) -> Result<Value, CdpError> {
        let result = self.respond(method, &params);
        self.sent.push((method.to_string(), params));
        result
    }

    async fn next_event(&mut self) -> Result<CdpEvent, CdpError> {
        match self.queue.pop_front() {
            Some(event) => Ok(event),
            None => futures::future::pending().await,
        }
    }

    fn try_next_event(&mut self) -> Option<CdpEvent> {
        self.queue.pop_front()
    }

    async fn close(&mut self) -> Result<(), CdpError> {
        self.closed = true;
        Ok(())
    }
}

pub fn request_will_be_sent(request_id: &str, method: &str, url: &str) -> CdpEvent {
    CdpEvent::new(
        "Network.requestWillBeSent",
        json!({
            "requestId": request_id,
            "request": { "url": url, "method": method, "headers": {} },
            "type": "Fetch"
        }),
    )
}

/// A request issued by the document of an earlier navigation.
pub fn request_will_be_sent_by(loader: &str, request_id: &str, url: &str) -> CdpEvent {
    let mut event = request_will_be_sent(request_id, "GET", url);
    event.params["loaderId"] = Value::String(loader.to_string());
    event
}

pub fn request_paused(interception_id: &str, network_id: Option<&str>, url: &str) -> CdpEvent {
    let mut params = json!({
        "requestId": interception_id,
        "request": { "url": url, "method": "GET", "headers": {} },
        "frameId": "F1",
        "resourceType": "XHR"
    });
    if let Some(id) = network_id {
        params["networkId"] = Value::String(id.to_string());
    }
    CdpEvent::new("Fetch.requestPaused", params)
}

pub fn loading_finished(request_id: &str) -> CdpEvent {
    CdpEvent::new(
        "Network.loadingFinished",
        json!({ "requestId": request_id, "timestamp": 1.0, "encodedDataLength": 100 }),
    )
}

pub fn loading_failed(request_id: &str, error_text: &str) -> CdpEvent {
    CdpEvent::new(
        "Network.loadingFailed",
        json!({ "requestId": request_id, "errorText": error_text, "type": "Image" }),
    )
}

pub fn load_event() -> CdpEvent {
    CdpEvent::new("Page.loadEventFired", json!({ "timestamp": 2.0 }))
}
