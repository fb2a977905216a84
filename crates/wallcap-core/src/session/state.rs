use std::fmt;

/// Download session states, in the order a successful download visits them.
/// `Failed` is reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Configuring,
    Navigating,
    AwaitingApiRequest,
    AwaitingApiResponse,
    Selecting,
    ResolvingResource,
    AwaitingResourceResponse,
    Converting,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Configuring => "configuring the page",
            SessionState::Navigating => "navigating",
            SessionState::AwaitingApiRequest => "awaiting the API request",
            SessionState::AwaitingApiResponse => "awaiting the API response",
            SessionState::Selecting => "selecting a photo",
            SessionState::ResolvingResource => "resolving the image resource",
            SessionState::AwaitingResourceResponse => "awaiting the image response",
            SessionState::Converting => "converting the image",
            SessionState::Writing => "writing the image",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reads_as_a_phrase() {
        assert_eq!(SessionState::AwaitingApiRequest.to_string(), "awaiting the API request");
        assert_eq!(
            format!("timed out while {}", SessionState::AwaitingResourceResponse),
            "timed out while awaiting the image response"
        );
    }
}
