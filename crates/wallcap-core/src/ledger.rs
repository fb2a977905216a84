//! Per-download table of outbound GET requests keyed by request id.
//!
//! Only GET requests are tracked. Completion of an id that was never tracked
//! (non-GET, or sent before the ledger was created) is ignored.

use std::collections::HashMap;

use crate::cdp::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub url: String,
    pub finished: bool,
}

/// Answer of [`RequestLedger::is_finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Finished,
    InFlight,
    Unknown,
}

#[derive(Debug, Default)]
pub struct RequestLedger {
    records: HashMap<RequestId, RequestRecord>,
    /// Ids in the order they were first seen.
    order: Vec<RequestId>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request about to be sent. Returns false for non-GET requests,
    /// which are not tracked. A repeated id (redirect) replaces the URL and
    /// clears the finished flag.
    pub fn on_request_will_be_sent(&mut self, request_id: &str, method: &str, url: &str) -> bool {
        if !method.eq_ignore_ascii_case("GET") {
            return false;
        }
        let record = RequestRecord {
            request_id: request_id.to_string(),
            url: url.to_string(),
            finished: false,
        };
        if self.records.insert(request_id.to_string(), record).is_none() {
            self.order.push(request_id.to_string());
        }
        tracing::trace!(request_id, url, "ledger: request tracked");
        true
    }

    /// Marks `request_id` finished. Unknown ids are a no-op; returns whether
    /// an entry was updated.
    pub fn on_loading_finished(&mut self, request_id: &str) -> bool {
        match self.records.get_mut(request_id) {
            Some(record) => {
                record.finished = true;
                true
            }
            None => false,
        }
    }

    /// Id of a request for `url`. A finished entry wins over an in-flight one;
    /// among equals the most recent wins.
    pub fn lookup(&self, url: &str) -> Option<&RequestId> {
        let mut in_flight = None;
        for id in self.order.iter().rev() {
            let record = &self.records[id];
            if record.url != url {
                continue;
            }
            if record.finished {
                return Some(id);
            }
            in_flight.get_or_insert(id);
        }
        in_flight
    }

    pub fn is_finished(&self, request_id: &str) -> LoadState {
        match self.records.get(request_id) {
            Some(r) if r.finished => LoadState::Finished,
            Some(_) => LoadState::InFlight,
            None => LoadState::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
