//! HTTP fetch adapter: resolves page requests against the reviews endpoint.
//!
//! Maps transport outcomes onto the engine's error taxonomy: non-success
//! statuses become [`FetchError::Upstream`], connection problems become
//! [`FetchError::Network`], and undecodable bodies become
//! [`FetchError::Malformed`]. The engine never retries; neither does this
//! adapter.

use raves_core::config::ResolvedSource;
use raves_core::{FetchError, PageRequest, ReviewPage, ReviewSource, SortOrder};
use std::time::Duration;

/// A [`ReviewSource`] backed by a blocking HTTP client.
pub struct HttpReviewSource {
    agent: ureq::Agent,
    url: String,
    count: u32,
    sort: SortOrder,
}

impl HttpReviewSource {
    /// Build an adapter for a resolved source configuration.
    #[must_use]
    pub fn new(source: &ResolvedSource) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(20))
            .build();
        Self {
            agent,
            url: source.url.clone(),
            count: source.count,
            sort: source.sort,
        }
    }

    /// Query pairs sent for a request, exposed for tests.
    #[must_use]
    pub fn query_for(&self, request: &PageRequest) -> Vec<(String, String)> {
        request
            .filter
            .query_pairs(self.sort, self.count, request.page)
    }
}

impl ReviewSource for HttpReviewSource {
    fn fetch(&self, request: &PageRequest) -> Result<ReviewPage, FetchError> {
        let mut call = self.agent.get(&self.url);
        for (key, value) in self.query_for(request) {
            call = call.query(&key, &value);
        }

        tracing::debug!(url = %self.url, page = request.page, epoch = request.epoch,
            "fetching page");

        match call.call() {
            Ok(response) => response
                .into_json::<ReviewPage>()
                .map_err(|err| FetchError::Malformed(err.to_string())),
            Err(ureq::Error::Status(status, response)) => Err(FetchError::Upstream {
                status,
                message: response.status_text().to_string(),
            }),
            Err(ureq::Error::Transport(transport)) => {
                Err(FetchError::Network(transport.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raves_core::Filter;

    fn source() -> HttpReviewSource {
        HttpReviewSource::new(&ResolvedSource {
            url: "http://127.0.0.1:1/reviews".to_string(),
            count: 25,
            sort: SortOrder::DateDesc,
        })
    }

    #[test]
    fn query_includes_filter_and_paging() {
        let request = PageRequest {
            filter: Filter::new(Some("login"), [4, 5]),
            page: 2,
            epoch: 1,
        };
        let pairs = source().query_for(&request);
        assert!(pairs.contains(&("q".to_string(), "login".to_string())));
        assert!(pairs.contains(&("stars".to_string(), "4,5".to_string())));
        assert!(pairs.contains(&("sort".to_string(), "-date".to_string())));
        assert!(pairs.contains(&("count".to_string(), "25".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn refused_connection_maps_to_network_error() {
        // Port 1 refuses immediately; no retry, no panic.
        let request = PageRequest {
            filter: Filter::default(),
            page: 1,
            epoch: 1,
        };
        let outcome = source().fetch(&request);
        assert!(matches!(outcome, Err(FetchError::Network(_))));
    }
}
