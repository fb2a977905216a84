//! Typed view of the handful of DevTools events and commands a capture uses.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{CdpError, CdpEvent, Transport};

/// Network-domain request identifier (opaque, assigned by the browser).
pub type RequestId = String;

/// A request paused by `Fetch` before it reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    /// Token used to release the request (`Fetch.continueRequest`).
    pub interception_id: String,
    /// The `Network` request id of the same request, when the browser reports it.
    pub network_id: Option<RequestId>,
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestWillBeSent {
    pub request_id: RequestId,
    /// Document load the request belongs to; `None` when the browser left it empty.
    pub loader_id: Option<String>,
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    RequestPaused(InterceptedRequest),
    RequestWillBeSent(RequestWillBeSent),
    LoadingFinished { request_id: RequestId },
    LoadingFailed { request_id: RequestId, error_text: String },
    LoadEventFired,
    Other(String),
}

#[derive(Debug, Deserialize)]
struct RequestInfo {
    url: String,
    method: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestPausedParams {
    request_id: String,
    request: RequestInfo,
    #[serde(default)]
    network_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestWillBeSentParams {
    request_id: String,
    #[serde(default)]
    loader_id: Option<String>,
    request: RequestInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingFinishedParams {
    request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingFailedParams {
    request_id: String,
    #[serde(default)]
    error_text: String,
}

impl PageEvent {
    /// Decodes the events the session reacts to; anything else is `Other`.
    pub fn parse(event: &CdpEvent) -> Result<PageEvent, serde_json::Error> {
        let params = &event.params;
        let parsed = match event.method.as_str() {
            "Fetch.requestPaused" => {
                let p = RequestPausedParams::deserialize(params)?;
                PageEvent::RequestPaused(InterceptedRequest {
                    interception_id: p.request_id,
                    network_id: p.network_id,
                    method: p.request.method,
                    url: p.request.url,
                })
            }
            "Network.requestWillBeSent" => {
                let p = RequestWillBeSentParams::deserialize(params)?;
                PageEvent::RequestWillBeSent(RequestWillBeSent {
                    request_id: p.request_id,
                    loader_id: p.loader_id.filter(|id| !id.is_empty()),
                    method: p.request.method,
                    url: p.request.url,
                })
            }
            "Network.loadingFinished" => {
                let p = LoadingFinishedParams::deserialize(params)?;
                PageEvent::LoadingFinished {
                    request_id: p.request_id,
                }
            }
            "Network.loadingFailed" => {
                let p = LoadingFailedParams::deserialize(params)?;
                PageEvent::LoadingFailed {
                    request_id: p.request_id,
                    error_text: p.error_text,
                }
            }
            "Page.loadEventFired" => PageEvent::LoadEventFired,
            other => PageEvent::Other(other.to_string()),
        };
        Ok(parsed)
    }
}

/// Body of a finished response as returned by `Network.getResponseBody`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub body: String,
    #[serde(default)]
    pub base64_encoded: bool,
}

/// Result of `Page.navigate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    #[serde(default)]
    pub frame_id: String,
    /// Loader of the new document; absent for same-document navigations.
    #[serde(default)]
    pub loader_id: Option<String>,
    #[serde(default)]
    pub error_text: Option<String>,
}

impl Navigation {
    /// The browser's error text when the navigation itself was rejected
    /// (e.g. DNS failure).
    pub fn rejection(&self) -> Option<&str> {
        self.error_text.as_deref().filter(|s| !s.is_empty())
    }
}

/// Turns on network/page observation and pauses requests matching `url_pattern`.
pub async fn enable_domains<T: Transport>(
    transport: &mut T,
    url_pattern: &str,
) -> Result<(), CdpError> {
    transport.command("Network.enable", json!({})).await?;
    transport.command("Page.enable", json!({})).await?;
    transport
        .command(
            "Fetch.enable",
            json!({
                "patterns": [{ "urlPattern": url_pattern, "requestStage": "Request" }]
            }),
        )
        .await?;
    Ok(())
}

/// Releases a paused request, optionally with a rewritten URL.
pub async fn continue_request<T: Transport>(
    transport: &mut T,
    interception_id: &str,
    url: Option<&str>,
) -> Result<(), CdpError> {
    let mut params = json!({ "requestId": interception_id });
    if let Some(url) = url {
        params["url"] = Value::String(url.to_string());
    }
    transport.command("Fetch.continueRequest", params).await?;
    Ok(())
}

pub async fn response_body<T: Transport>(
    transport: &mut T,
    request_id: &str,
) -> Result<ResponseBody, CdpError> {
    let result = transport
        .command("Network.getResponseBody", json!({ "requestId": request_id }))
        .await?;
    ResponseBody::deserialize(&result).map_err(|e| CdpError::UnexpectedShape {
        method: "Network.getResponseBody".to_string(),
        detail: e.to_string(),
    })
}

pub async fn navigate<T: Transport>(transport: &mut T, url: &str) -> Result<Navigation, CdpError> {
    let result = transport
        .command("Page.navigate", json!({ "url": url }))
        .await?;
    Navigation::deserialize(&result).map_err(|e| CdpError::UnexpectedShape {
        method: "Page.navigate".to_string(),
        detail: e.to_string(),
    })
}

/// Evaluates `expression` in the page, awaiting a returned promise, and
/// returns the resulting value. A thrown exception becomes an error.
pub async fn evaluate<T: Transport>(transport: &mut T, expression: &str) -> Result<Value, CdpError> {
    let result = transport
        .command(
            "Runtime.evaluate",
            json!({
                "expression": expression,
                "awaitPromise": true,
                "returnByValue": true,
            }),
        )
        .await?;
    if let Some(details) = result.get("exceptionDetails") {
        let message = details
            .pointer("/exception/description")
            .or_else(|| details.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("exception thrown")
            .to_string();
        return Err(CdpError::Remote {
            method: "Runtime.evaluate".to_string(),
            code: 0,
            message,
        });
    }
    Ok(result
        .pointer("/result/value")
        .cloned()
        .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_paused_with_network_id() {
        let event = CdpEvent::new(
            "Fetch.requestPaused",
            json!({
                "requestId": "interception-job-1.0",
                "networkId": "1000.7",
                "resourceType": "XHR",
                "request": { "url": "https://api.500px.com/v1/photos?feature=popular", "method": "GET", "headers": {} }
            }),
        );
        match PageEvent::parse(&event).unwrap() {
            PageEvent::RequestPaused(p) => {
                assert_eq!(p.interception_id, "interception-job-1.0");
                assert_eq!(p.network_id.as_deref(), Some("1000.7"));
                assert_eq!(p.method, "GET");
                assert!(p.url.starts_with("https://api.500px.com/v1/photos"));
            }
            other => panic!("expected RequestPaused, got {:?}", other),
        }
    }

    #[test]
    fn parses_loading_events() {
        let finished = CdpEvent::new("Network.loadingFinished", json!({ "requestId": "42", "encodedDataLength": 10 }));
        assert_eq!(
            PageEvent::parse(&finished).unwrap(),
            PageEvent::LoadingFinished { request_id: "42".to_string() }
        );
        let failed = CdpEvent::new(
            "Network.loadingFailed",
            json!({ "requestId": "43", "errorText": "net::ERR_FAILED" }),
        );
        assert_eq!(
            PageEvent::parse(&failed).unwrap(),
            PageEvent::LoadingFailed {
                request_id: "43".to_string(),
                error_text: "net::ERR_FAILED".to_string()
            }
        );
    }

    #[test]
    fn request_will_be_sent_carries_loader() {
        let event = CdpEvent::new(
            "Network.requestWillBeSent",
            json!({
                "requestId": "7",
                "loaderId": "AB12",
                "request": { "url": "https://500px.com/app.css", "method": "GET" }
            }),
        );
        match PageEvent::parse(&event).unwrap() {
            PageEvent::RequestWillBeSent(r) => assert_eq!(r.loader_id.as_deref(), Some("AB12")),
            other => panic!("expected RequestWillBeSent, got {:?}", other),
        }

        let worker = CdpEvent::new(
            "Network.requestWillBeSent",
            json!({
                "requestId": "8",
                "loaderId": "",
                "request": { "url": "https://500px.com/sw.js", "method": "GET" }
            }),
        );
        match PageEvent::parse(&worker).unwrap() {
            PageEvent::RequestWillBeSent(r) => assert!(r.loader_id.is_none()),
            other => panic!("expected RequestWillBeSent, got {:?}", other),
        }
    }

    #[test]
    fn navigation_result() {
        let ok: Navigation =
            serde_json::from_value(json!({ "frameId": "F1", "loaderId": "L2" })).unwrap();
        assert_eq!(ok.loader_id.as_deref(), Some("L2"));
        assert!(ok.rejection().is_none());

        let rejected: Navigation = serde_json::from_value(
            json!({ "frameId": "F1", "loaderId": "L3", "errorText": "net::ERR_NAME_NOT_RESOLVED" }),
        )
        .unwrap();
        assert_eq!(rejected.rejection(), Some("net::ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn unknown_methods_are_other() {
        let event = CdpEvent::new("Network.dataReceived", json!({ "requestId": "1" }));
        assert_eq!(
            PageEvent::parse(&event).unwrap(),
            PageEvent::Other("Network.dataReceived".to_string())
        );
    }

    #[test]
    fn malformed_known_event_is_an_error() {
        let event = CdpEvent::new("Network.requestWillBeSent", json!({ "requestId": "1" }));
        assert!(PageEvent::parse(&event).is_err());
    }
}
