//! Interception policy for the photo API request.
//!
//! The first GET to the API endpoint in a download becomes the canonical API
//! request and is released with a canonical query. Later matches within the
//! same download, and every other paused request, are released unchanged.

mod rewrite;

use url::Url;

use crate::cdp::InterceptedRequest;

pub use rewrite::{canonicalize_query, is_size_param, QueryOverrides, SIZE_PARAM};

/// Matches requests to one API endpoint (same host and path).
#[derive(Debug, Clone)]
pub struct ApiMatcher {
    host: String,
    path: String,
}

impl ApiMatcher {
    pub fn new(endpoint: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(endpoint)?;
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        Ok(Self {
            host: host.to_ascii_lowercase(),
            path: url.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn matches(&self, method: &str, url: &str) -> bool {
        if !method.eq_ignore_ascii_case("GET") {
            return false;
        }
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        url.host_str()
            .map(|h| h.eq_ignore_ascii_case(&self.host))
            .unwrap_or(false)
            && url.path().trim_end_matches('/') == self.path
    }

    /// `Fetch.enable` URL pattern that pauses only requests to this endpoint.
    pub fn fetch_pattern(&self) -> String {
        format!("*://{}{}*", self.host, self.path)
    }
}

/// What to do with one paused request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptDecision {
    /// URL to release the request with.
    pub url: String,
    /// True when this request was recorded as the download's canonical API request.
    pub canonical: bool,
}

impl InterceptDecision {
    pub fn is_rewrite(&self, original: &str) -> bool {
        self.url != original
    }
}

#[derive(Debug, Clone)]
pub struct InterceptionPolicy {
    matcher: ApiMatcher,
    image_size: u32,
    overrides: QueryOverrides,
}

impl InterceptionPolicy {
    pub fn new(matcher: ApiMatcher, image_size: u32, overrides: QueryOverrides) -> Self {
        Self {
            matcher,
            image_size,
            overrides,
        }
    }

    pub fn matcher(&self) -> &ApiMatcher {
        &self.matcher
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Decides the release URL for `request`. Records the original URL in
    /// `canonical_url` when this is the first match of the download.
    pub fn on_intercepted(
        &self,
        canonical_url: &mut Option<String>,
        request: &InterceptedRequest,
    ) -> InterceptDecision {
        let unchanged = InterceptDecision {
            url: request.url.clone(),
            canonical: false,
        };
        if canonical_url.is_some() || !self.matcher.matches(&request.method, &request.url) {
            return unchanged;
        }
        let Ok(parsed) = Url::parse(&request.url) else {
            return unchanged;
        };

        *canonical_url = Some(request.url.clone());
        let rewritten = canonicalize_query(&parsed, self.image_size, &self.overrides);
        if rewritten.as_str() != request.url {
            tracing::info!(original = %request.url, rewritten = %rewritten, "rewrote API request");
        }
        InterceptDecision {
            url: rewritten.into(),
            canonical: true,
        }
    }
}
