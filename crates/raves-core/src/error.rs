//! Error taxonomy for the feed engine.
//!
//! Two families:
//!
//! - [`FetchError`] — a page fetch resolved unsuccessfully. Always transient:
//!   previously merged reviews are preserved and the caller may re-issue the
//!   identical request. Malformed payloads are folded in here because the
//!   engine cannot distinguish a broken upstream from a broken network.
//! - [`RequestError`] — a load-more intent was rejected before any I/O.
//!
//! Stale responses are deliberately *not* errors; they are silently dropped
//! by the epoch guard in [`crate::feed`].

/// A fetch resolved unsuccessfully. State is never mutated by a failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The upstream answered with a non-success status.
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The request never produced an upstream answer.
    #[error("network error: {0}")]
    Network(String),

    /// The payload arrived but could not be decoded into a review page.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Numeric status code, when the upstream produced one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Network(_) | Self::Malformed(_) => None,
        }
    }
}

/// A load-more intent rejected synchronously by the request builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No response has been recorded for the active epoch yet, so the next
    /// page number cannot be validated.
    #[error("no response recorded for the current filter yet")]
    NoResponseYet,

    /// Every reported page has already been requested.
    #[error("page {page} is the last of {pages} reported pages")]
    NoMorePages { page: u32, pages: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_carries_status() {
        let err = FetchError::Upstream {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "upstream error 503: unavailable");
    }

    #[test]
    fn network_and_malformed_have_no_status() {
        assert_eq!(FetchError::Network("timed out".to_string()).status(), None);
        assert_eq!(
            FetchError::Malformed("reviews not an array".to_string()).status(),
            None
        );
    }

    #[test]
    fn request_error_messages() {
        assert_eq!(
            RequestError::NoResponseYet.to_string(),
            "no response recorded for the current filter yet"
        );
        assert_eq!(
            RequestError::NoMorePages { page: 4, pages: 4 }.to_string(),
            "page 4 is the last of 4 reported pages"
        );
    }
}
